/// Error types for payload decoding and scan engine control

/// Payload could not be decoded as a format 5 measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Payload is shorter than the fixed header.
    #[error("payload too short: {len} bytes, need at least 9")]
    Malformed { len: usize },

    /// Format version byte is not the supported one.
    #[error("unsupported data format version {0}")]
    UnsupportedVersion(u8),
}

/// Failure reported by the scan engine.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),
}
