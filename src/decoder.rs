/// RuuviTag data format 5 decoding
use crate::error::FormatError;
use crate::models::Measurement;

// RuuviTag data format 5 constants
pub const DATA_FORMAT: u8 = 5; // Only supported format version
pub const HEADER_LEN: usize = 9; // Company id, version, temperature, humidity, pressure

const TEMPERATURE_RESOLUTION: f64 = 0.005; // °C per LSB
const HUMIDITY_DIVISOR: f64 = 400.0; // LSB per %
const PRESSURE_OFFSET: f64 = 50_000.0; // Pa

const TEMPERATURE_NOT_MEASURED: [u8; 2] = [0x80, 0x00];
const UNSIGNED_NOT_MEASURED: [u8; 2] = [0xFF, 0xFF];

/// Decode the fixed header of a format 5 manufacturer payload
///
/// Layout of the first nine bytes (anything after them is ignored):
/// - Bytes 0-1: Company id (little-endian, 0x0499)
/// - Byte 2: Data format (5)
/// - Bytes 3-4: Temperature (signed 16-bit big-endian, 0.005°C resolution, 0x8000 = not measured)
/// - Bytes 5-6: Humidity (unsigned 16-bit big-endian, 1/400 % resolution, 0xFFFF = not measured)
/// - Bytes 7-8: Pressure (unsigned 16-bit big-endian, +50000 Pa offset, 0xFFFF = not measured)
///
/// Values are passed through unclamped.
///
/// # Arguments
/// * `payload` - Manufacturer data including the leading company id
///
/// # Returns
/// Measurement with `None` for values the sensor did not measure, or
/// `FormatError` if the payload is too short or not format 5
pub fn decode(payload: &[u8]) -> Result<Measurement, FormatError> {
    let header = payload
        .first_chunk::<HEADER_LEN>()
        .ok_or(FormatError::Malformed { len: payload.len() })?;

    if header[2] != DATA_FORMAT {
        return Err(FormatError::UnsupportedVersion(header[2]));
    }

    Ok(Measurement {
        temperature: temperature([header[3], header[4]]),
        humidity: humidity([header[5], header[6]]),
        pressure: pressure([header[7], header[8]]),
    })
}

fn temperature(raw: [u8; 2]) -> Option<f64> {
    if raw == TEMPERATURE_NOT_MEASURED {
        return None;
    }
    Some(f64::from(i16::from_be_bytes(raw)) * TEMPERATURE_RESOLUTION)
}

fn humidity(raw: [u8; 2]) -> Option<f64> {
    if raw == UNSIGNED_NOT_MEASURED {
        return None;
    }
    Some(f64::from(u16::from_be_bytes(raw)) / HUMIDITY_DIVISOR)
}

fn pressure(raw: [u8; 2]) -> Option<f64> {
    if raw == UNSIGNED_NOT_MEASURED {
        return None;
    }
    Some(f64::from(u16::from_be_bytes(raw)) + PRESSURE_OFFSET)
}
