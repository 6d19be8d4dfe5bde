/// Scan engine interface and its BlueZ implementation
use bluer::{Adapter, AdapterEvent, Address, Uuid};
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::bluetooth::classifier::{RUUVITAG_MANUFACTURER_ID, RUUVI_SERVICE_UUID};
use crate::error::ScanError;
use crate::models::ObservedBroadcast;

const SCAN_INTERVAL_MS: u64 = 97; // How often the radio switches channels
const SCAN_WINDOW_MS: u64 = 37; // How long the radio listens per interval
const EVENT_QUEUE_LEN: usize = 64;

/// Radio timing and reporting parameters handed to the engine as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub interval: Duration,
    pub window: Duration,
    /// Request scan responses from advertisers
    pub active: bool,
    /// Deliver every advertisement, not only the first per device
    pub report_duplicates: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(SCAN_INTERVAL_MS),
            window: Duration::from_millis(SCAN_WINDOW_MS),
            active: true,
            report_duplicates: true,
        }
    }
}

/// Parameters of a single start request
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest {
    /// `None` scans until stopped
    pub duration: Option<Duration>,
    /// Called once a bounded scan runs out
    pub on_complete: Option<fn()>,
    /// Keep the result cache of the previous scan
    pub continuation: bool,
}

impl ScanRequest {
    /// Scan forever, no completion callback, fresh result cache.
    pub fn unbounded() -> Self {
        Self {
            duration: None,
            on_complete: None,
            continuation: false,
        }
    }
}

/// Control surface of a radio scanner.
///
/// Observed broadcasts are delivered separately through the channel handed out
/// when the engine is created.
pub trait ScanEngine {
    async fn configure(&mut self, settings: &ScanSettings) -> Result<(), ScanError>;
    async fn start(&mut self, request: ScanRequest) -> Result<(), ScanError>;
    /// Advisory; does not wait for the radio to go idle.
    async fn stop(&mut self);
    async fn is_scanning(&mut self) -> bool;
    async fn result_cache_count(&mut self) -> Result<usize, ScanError>;
    async fn evict(&mut self, address: Address) -> Result<(), ScanError>;
}

/// BlueZ backed scan engine
///
/// The result cache is BlueZ's own device list. Paired devices are never
/// counted nor removed.
pub struct BluerScanner {
    adapter: Adapter,
    events: mpsc::Sender<ObservedBroadcast>,
    discovery: Option<JoinHandle<()>>,
}

impl BluerScanner {
    /// Create a scanner on an already powered adapter
    ///
    /// Nothing is scanned until `start` is called.
    ///
    /// # Arguments
    /// * `adapter` - Bluetooth adapter to discover devices with
    ///
    /// # Returns
    /// The scanner and the receiving end of its broadcast channel
    pub fn new(adapter: Adapter) -> (Self, mpsc::Receiver<ObservedBroadcast>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_LEN);
        let scanner = BluerScanner {
            adapter,
            events: tx,
            discovery: None,
        };
        (scanner, rx)
    }

    /// Addresses of cached devices that are not paired
    async fn cached_devices(&self) -> Result<Vec<Address>, ScanError> {
        let mut cached = Vec::new();
        for addr in self.adapter.device_addresses().await? {
            let device = match self.adapter.device(addr) {
                Ok(device) => device,
                Err(_) => continue,
            };
            if !device.is_paired().await.unwrap_or(true) {
                cached.push(addr);
            }
        }
        Ok(cached)
    }

    async fn clear_cache(&self) -> Result<(), ScanError> {
        for addr in self.cached_devices().await? {
            if let Err(e) = self.adapter.remove_device(addr).await {
                debug!("Failed to remove {} from cache: {}", addr, e);
            }
        }
        Ok(())
    }
}

impl ScanEngine for BluerScanner {
    async fn configure(&mut self, settings: &ScanSettings) -> Result<(), ScanError> {
        // BlueZ picks its own interval and window; they are only recorded here
        debug!(
            "Scan settings: interval={:?}, window={:?}, active={}",
            settings.interval, settings.window, settings.active
        );

        let filter = bluer::DiscoveryFilter {
            transport: bluer::DiscoveryTransport::Le, // Bluetooth Low Energy only
            duplicate_data: settings.report_duplicates,
            ..Default::default()
        };
        self.adapter.set_discovery_filter(filter).await?;
        Ok(())
    }

    async fn start(&mut self, request: ScanRequest) -> Result<(), ScanError> {
        self.stop().await;

        if !request.continuation {
            self.clear_cache().await?;
        }

        let discovery = self.adapter.discover_devices_with_changes().await?;
        let adapter = self.adapter.clone();
        let events = self.events.clone();

        self.discovery = Some(tokio::spawn(async move {
            let pump = forward_broadcasts(adapter, discovery, events);
            match request.duration {
                Some(duration) => {
                    let _ = tokio::time::timeout(duration, pump).await;
                    if let Some(on_complete) = request.on_complete {
                        on_complete();
                    }
                }
                None => pump.await,
            }
        }));

        info!("Scan started on {}", self.adapter.name());
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(handle) = self.discovery.take() {
            handle.abort();
        }
    }

    async fn is_scanning(&mut self) -> bool {
        self.discovery
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn result_cache_count(&mut self) -> Result<usize, ScanError> {
        Ok(self.cached_devices().await?.len())
    }

    async fn evict(&mut self, address: Address) -> Result<(), ScanError> {
        let device = self.adapter.device(address)?;
        if device.is_paired().await? {
            return Ok(());
        }
        self.adapter.remove_device(address).await?;
        Ok(())
    }
}

impl Drop for BluerScanner {
    fn drop(&mut self) {
        if let Some(handle) = self.discovery.take() {
            handle.abort();
        }
    }
}

/// Turn discovery events into broadcasts until discovery or the receiver ends
async fn forward_broadcasts(
    adapter: Adapter,
    discovery: impl Stream<Item = AdapterEvent>,
    events: mpsc::Sender<ObservedBroadcast>,
) {
    let mut discovery = Box::pin(discovery);
    while let Some(event) = discovery.next().await {
        let addr = match event {
            AdapterEvent::DeviceAdded(addr) => addr,
            _ => continue,
        };

        match observe(&adapter, addr).await {
            Ok(broadcast) => {
                if events.send(broadcast).await.is_err() {
                    warn!("Broadcast receiver closed, ending discovery");
                    break;
                }
            }
            // Device may already be gone again
            Err(e) => debug!("Failed to read properties of {}: {}", addr, e),
        }
    }
}

async fn observe(adapter: &Adapter, addr: Address) -> bluer::Result<ObservedBroadcast> {
    let device = adapter.device(addr)?;
    let uuids = device.uuids().await?.unwrap_or_default();
    let manufacturer_data = device.manufacturer_data().await?;

    Ok(ObservedBroadcast {
        address: addr,
        service_uuid: advertised_service(&uuids),
        manufacturer_data: manufacturer_data.as_ref().and_then(raw_manufacturer_payload),
        name: device.name().await?,
    })
}

/// Pick the service UUID to classify on: the Ruuvi one when present, else the lowest.
fn advertised_service(uuids: &HashSet<Uuid>) -> Option<Uuid> {
    if uuids.contains(&RUUVI_SERVICE_UUID) {
        return Some(RUUVI_SERVICE_UUID);
    }
    uuids.iter().min().copied()
}

/// Rebuild the raw manufacturer payload
///
/// BlueZ splits the company id off the data; the decoder expects it as the
/// first two bytes (little-endian). Ruuvi data wins if several companies are present.
fn raw_manufacturer_payload(data: &HashMap<u16, Vec<u8>>) -> Option<Vec<u8>> {
    let (id, bytes) = data
        .get_key_value(&RUUVITAG_MANUFACTURER_ID)
        .or_else(|| data.iter().min_by_key(|(id, _)| **id))?;

    let mut payload = Vec::with_capacity(bytes.len() + 2);
    payload.extend_from_slice(&id.to_le_bytes());
    payload.extend_from_slice(bytes);
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_radio_timing() {
        let settings = ScanSettings::default();
        assert_eq!(settings.interval, Duration::from_millis(97));
        assert_eq!(settings.window, Duration::from_millis(37));
        assert!(settings.active);
        assert!(settings.report_duplicates);
    }

    #[test]
    fn unbounded_request_is_fresh_and_endless() {
        let request = ScanRequest::unbounded();
        assert!(request.duration.is_none());
        assert!(request.on_complete.is_none());
        assert!(!request.continuation);
    }

    #[test]
    fn prefers_ruuvi_service_uuid() {
        let battery = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);
        let uuids: HashSet<Uuid> = [battery, RUUVI_SERVICE_UUID].into_iter().collect();
        assert_eq!(advertised_service(&uuids), Some(RUUVI_SERVICE_UUID));

        let uuids: HashSet<Uuid> = [battery].into_iter().collect();
        assert_eq!(advertised_service(&uuids), Some(battery));

        assert_eq!(advertised_service(&HashSet::new()), None);
    }

    #[test]
    fn restores_company_id_prefix() {
        let mut data = HashMap::new();
        data.insert(0x004C, vec![0x02, 0x15]);
        data.insert(RUUVITAG_MANUFACTURER_ID, vec![0x05, 0x01, 0x9C]);

        assert_eq!(
            raw_manufacturer_payload(&data),
            Some(vec![0x99, 0x04, 0x05, 0x01, 0x9C])
        );

        data.remove(&RUUVITAG_MANUFACTURER_ID);
        assert_eq!(
            raw_manufacturer_payload(&data),
            Some(vec![0x4C, 0x00, 0x02, 0x15])
        );

        assert_eq!(raw_manufacturer_payload(&HashMap::new()), None);
    }
}
