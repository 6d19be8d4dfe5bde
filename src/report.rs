/// Reporting sink for decoded measurements
use bluer::Address;
use log::info;
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::models::{Measurement, ObservedBroadcast};
use crate::utils::{format_datetime, format_measurement};

/// Receives every successfully decoded measurement, one at a time.
pub trait ReportSink {
    fn report(&mut self, broadcast: &ObservedBroadcast, measurement: &Measurement);
}

/// Writes one log line per measurement.
///
/// Devices are labelled with their configured alias, else their advertised name.
pub struct LogReporter {
    tags: HashMap<Address, String>,
}

impl LogReporter {
    pub fn new(tags: HashMap<Address, String>) -> Self {
        LogReporter { tags }
    }

    fn label<'a>(&'a self, broadcast: &'a ObservedBroadcast) -> &'a str {
        self.tags
            .get(&broadcast.address)
            .map(String::as_str)
            .or(broadcast.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn report_line(
        &self,
        broadcast: &ObservedBroadcast,
        measurement: &Measurement,
        received_at: &OffsetDateTime,
    ) -> String {
        format!(
            "{} ({}) at {}: {}",
            self.label(broadcast),
            broadcast.address,
            format_datetime(received_at),
            format_measurement(measurement)
        )
    }
}

impl ReportSink for LogReporter {
    fn report(&mut self, broadcast: &ObservedBroadcast, measurement: &Measurement) {
        let now = OffsetDateTime::now_utc();
        info!("{}", self.report_line(broadcast, measurement, &now));
    }
}
