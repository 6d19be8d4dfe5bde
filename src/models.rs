use bluer::{Address, Uuid};

/// One advertisement as seen by the scan engine.
///
/// Only lives for the duration of a single event; nothing downstream keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedBroadcast {
    pub address: Address,
    pub service_uuid: Option<Uuid>,
    /// Manufacturer specific data including the leading little-endian company id
    pub manufacturer_data: Option<Vec<u8>>,
    pub name: Option<String>,
}

/// Decoded environmental reading. `None` means the sensor reported "not measured".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
    /// Pascals
    pub pressure: Option<f64>,
}
