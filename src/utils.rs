/// Utility functions for formatting readings and log output
use time::{macros::format_description, OffsetDateTime};

use crate::models::Measurement;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// One decimal place with unit, or "not measured"
pub fn format_reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(value) => format!("{:.1} {}", value, unit),
        None => "not measured".to_string(),
    }
}

/// Render a measurement as the body of a report line
pub fn format_measurement(measurement: &Measurement) -> String {
    format!(
        "temperature {}, humidity {}, pressure {}",
        format_reading(measurement.temperature, "°C"),
        format_reading(measurement.humidity, "%"),
        format_reading(measurement.pressure, "Pa"),
    )
}

/// Uppercase hex dump of raw bytes, e.g. `99040501`
pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_datetime() {
        let dt = datetime!(2024-03-07 08:05:09 UTC);
        assert_eq!(format_datetime(&dt), "07.03.2024 - 08:05:09");
    }

    #[test]
    fn formats_present_and_missing_readings() {
        let measurement = Measurement {
            temperature: Some(-2.06),
            humidity: None,
            pressure: Some(90612.0),
        };
        assert_eq!(
            format_measurement(&measurement),
            "temperature -2.1 °C, humidity not measured, pressure 90612.0 Pa"
        );
    }

    #[test]
    fn hex_dump() {
        assert_eq!(to_hex(&[0x99, 0x04, 0x05, 0x0a]), "9904050A");
        assert_eq!(to_hex(&[]), "");
    }
}
