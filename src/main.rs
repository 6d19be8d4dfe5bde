mod bluetooth;
mod config;
mod decoder;
mod error;
mod models;
mod report;
mod utils;

use log::{error, info};

use bluetooth::{BluerScanner, ScanLifecycle};
use config::MonitorConfig;
use report::LogReporter;

async fn open_adapter(
    config: &MonitorConfig,
) -> Result<bluer::Adapter, Box<dyn std::error::Error>> {
    // Initialize Bluetooth session
    let session = match bluer::Session::new().await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create Bluetooth session: {}", e);
            return Err(e.into());
        }
    };

    let adapter = match &config.adapter_name {
        Some(name) => session.adapter(name),
        None => session.default_adapter().await,
    };
    let adapter = match adapter {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Failed to get Bluetooth adapter: {}", e);
            return Err(e.into());
        }
    };

    // Ensure Bluetooth adapter is powered on
    if let Err(e) = adapter.set_powered(true).await {
        error!("Failed to power on adapter: {}", e);
        return Err(e.into());
    }

    info!("Using Bluetooth adapter {}", adapter.name());
    Ok(adapter)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let adapter = open_adapter(&config).await?;
    let (scanner, events) = BluerScanner::new(adapter);
    let mut lifecycle = ScanLifecycle::new(scanner, LogReporter::new(config.tags));

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            // Keep the sender alive so the monitor keeps running
            std::future::pending::<()>().await;
        }
        let _ = tx.send(());
    });

    // Run the monitor or wait for shutdown signal
    tokio::select! {
        _ = lifecycle.run(events) => {
            info!("Monitor stopped");
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
