/// Filtering of observed advertisements down to RuuviTag format 5 broadcasts
use bluer::Uuid;

use crate::decoder::DATA_FORMAT;
use crate::models::ObservedBroadcast;

// RuuviTag protocol constants
// Nordic UART service advertised by RuuviTags
pub const RUUVI_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);
pub const RUUVITAG_MANUFACTURER_ID: u16 = 0x0499; // Ruuvi Innovations Ltd. manufacturer ID

/// Manufacturer payload of a broadcast that passed every filter.
///
/// Borrows the complete, unsliced payload from the broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorPayload<'a>(&'a [u8]);

impl<'a> SensorPayload<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// Why a broadcast was not handed to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// Service UUID absent or not the Ruuvi one
    Service,
    /// Manufacturer data absent or from another company
    Manufacturer,
    /// Ruuvi manufacturer data in a format other than 5
    Version(u8),
}

impl Miss {
    /// Only devices rejected by the service filter are evicted from the scan cache.
    pub fn evicts(&self) -> bool {
        matches!(self, Miss::Service)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Sensor(SensorPayload<'a>),
    Miss(Miss),
}

/// Decide whether a broadcast comes from a RuuviTag sending format 5 data
///
/// Filters in order: service UUID, manufacturer id (first two payload bytes,
/// little-endian), format version (third byte). A payload too short to carry a
/// version byte still passes so the decoder can report it as malformed.
///
/// # Arguments
/// * `broadcast` - Advertisement as delivered by the scan engine
///
/// # Returns
/// `Sensor` with the complete manufacturer payload, or `Miss` with the failing stage
pub fn classify(broadcast: &ObservedBroadcast) -> Classification<'_> {
    if broadcast.service_uuid != Some(RUUVI_SERVICE_UUID) {
        return Classification::Miss(Miss::Service);
    }

    let payload = match broadcast.manufacturer_data.as_deref() {
        Some(payload) => payload,
        None => return Classification::Miss(Miss::Manufacturer),
    };

    match payload.first_chunk::<2>() {
        Some(id) if u16::from_le_bytes(*id) == RUUVITAG_MANUFACTURER_ID => {}
        _ => return Classification::Miss(Miss::Manufacturer),
    }

    match payload.get(2) {
        Some(&version) if version != DATA_FORMAT => Classification::Miss(Miss::Version(version)),
        _ => Classification::Sensor(SensorPayload(payload)),
    }
}
