/// Keeps the scan engine running and feeds its broadcasts through classify, decode and report
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::bluetooth::classifier::{classify, Classification, Miss};
use crate::bluetooth::scanner::{ScanEngine, ScanRequest, ScanSettings};
use crate::decoder::decode;
use crate::models::ObservedBroadcast;
use crate::report::ReportSink;
use crate::utils::to_hex;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(2); // Delay between scan health checks
// Stop (and so restart) scanning above this many cached devices
pub const MAX_CACHED_RESULTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Owns the scan engine and the reporting sink for the lifetime of the service.
pub struct ScanLifecycle<E, S> {
    engine: E,
    sink: S,
    state: ScanState,
}

impl<E: ScanEngine, S: ReportSink> ScanLifecycle<E, S> {
    pub fn new(engine: E, sink: S) -> Self {
        ScanLifecycle {
            engine,
            sink,
            state: ScanState::Idle,
        }
    }

    /// One periodic check: restart scanning if it stopped, stop it if the cache grew too large.
    ///
    /// Never fails; engine errors are logged and retried on the next check.
    pub async fn check(&mut self) {
        if !self.engine.is_scanning().await {
            if self.state == ScanState::Scanning {
                warn!("Scan stopped unexpectedly, restarting");
            }
            self.state = ScanState::Idle;

            match self.engine.start(ScanRequest::unbounded()).await {
                Ok(()) => self.state = ScanState::Scanning,
                Err(e) => warn!("Failed to start scan: {}", e),
            }
        }

        match self.engine.result_cache_count().await {
            Ok(count) if count > MAX_CACHED_RESULTS => {
                debug!(
                    "{} cached devices exceed limit of {}, stopping scan",
                    count, MAX_CACHED_RESULTS
                );
                self.engine.stop().await;
                self.state = ScanState::Idle;
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read scan result cache: {}", e),
        }
    }

    /// Classify one broadcast, decode and report it when it is a sensor reading.
    pub async fn handle(&mut self, broadcast: ObservedBroadcast) {
        let payload = match classify(&broadcast) {
            Classification::Sensor(payload) => payload,
            Classification::Miss(miss) => {
                if miss.evicts() {
                    if let Err(e) = self.engine.evict(broadcast.address).await {
                        debug!("Failed to evict {}: {}", broadcast.address, e);
                    }
                } else if let Miss::Version(version) = miss {
                    debug!("Skipping {}: data format {}", broadcast.address, version);
                } else {
                    debug!("Skipping {}: not Ruuvi manufacturer data", broadcast.address);
                }
                return;
            }
        };

        debug!(
            "Ruuvi data from {}: {}",
            broadcast.address,
            to_hex(payload.as_bytes())
        );

        match decode(payload.as_bytes()) {
            Ok(measurement) => self.sink.report(&broadcast, &measurement),
            Err(e) => warn!("Dropping broadcast from {}: {}", broadcast.address, e),
        }
    }

    /// Run until the engine's broadcast channel closes.
    ///
    /// Checks and broadcasts are handled one at a time in this task.
    pub async fn run(&mut self, mut events: mpsc::Receiver<ObservedBroadcast>) {
        if let Err(e) = self.engine.configure(&ScanSettings::default()).await {
            warn!("Failed to configure scan, using engine defaults: {}", e);
        }

        let mut ticker = interval(CHECK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting RuuviTag monitor");
        loop {
            tokio::select! {
                _ = ticker.tick() => self.check().await,
                received = events.recv() => match received {
                    Some(broadcast) => self.handle(broadcast).await,
                    None => {
                        warn!("Broadcast channel closed, stopping monitor");
                        break;
                    }
                },
            }
        }

        self.engine.stop().await;
    }
}
