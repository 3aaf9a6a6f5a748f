use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use musiccast_api::{DeviceApi, MusicCastClient};
use musiccast_state::{
    init_logging_with_level, AccessoryBinding, BridgeConfig, ConvergenceWaiter, HostCache,
    LoggingMode, MusicCastDevice, PollScheduler,
};
use tracing::{error, info};

pub mod binding;
pub mod config;

use binding::LoggingBinding;
use config::BridgeFile;

/// MusicCast Bridge
///
/// Polls a MusicCast receiver and its linked speakers, exposing power,
/// volume and input selection as accessories.
#[derive(Parser, Debug)]
#[command(name = "musiccast-bridge")]
#[command(about = "Bridge Yamaha MusicCast devices into home automation")]
#[command(version)]
pub struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Log level (error, warn, info, debug, trace); overrides MUSICCAST_LOG_LEVEL
    #[arg(long)]
    pub log_level: Option<String>,

    /// Logging mode (silent, development, debug)
    #[arg(long, default_value = "development")]
    pub log_mode: LoggingMode,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = &self.log_level {
            match level.to_lowercase().as_str() {
                "error" | "warn" | "info" | "debug" | "trace" => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                        level
                    ));
                }
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;
    init_logging_with_level(args.log_mode, args.log_level.as_deref())
        .context("Failed to initialize logging")?;

    let file = BridgeFile::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let config = file
        .to_bridge_config()
        .context("Configuration rejected")?;
    info!(
        name = %file.name,
        server = %file.server.host,
        clients = file.clients.len(),
        "configuration loaded"
    );

    run(&file, config).await
}

/// Load every device, start polling and run until Ctrl+C
async fn run(file: &BridgeFile, config: BridgeConfig) -> Result<()> {
    let client = MusicCastClient::builder(&file.server.host)
        .preset_pattern(file.server.preset_pattern())
        .build()
        .context("Failed to build HTTP client")?;
    let api: Arc<dyn DeviceApi> = Arc::new(client);
    let binding: Arc<dyn AccessoryBinding> = Arc::new(LoggingBinding::new());

    let cache = HostCache::new();
    let scheduler = PollScheduler::new(cache.clone(), config.tiers);
    let waiter = ConvergenceWaiter::new(config.convergence);

    let mut devices = Vec::new();
    for device_config in config.devices {
        let host = device_config.host.clone();
        let device = Arc::new(MusicCastDevice::new(
            device_config,
            Arc::clone(&api),
            cache.clone(),
            Arc::clone(&binding),
            waiter,
        ));

        if let Err(e) = device.load_initial_status().await {
            error!(%host, error = %e, "initial status failed, device skipped");
            continue;
        }
        if let Err(e) = device.publish().await {
            error!(%host, error = %e, "publishing failed, device skipped");
            continue;
        }
        device.attach(&scheduler);
        devices.push(device);
    }

    if devices.is_empty() {
        anyhow::bail!("No device could be loaded");
    }

    scheduler.start().context("Failed to start scheduler")?;
    info!(devices = devices.len(), "bridge running, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    info!("shutting down");
    scheduler.stop().await.context("Failed to stop scheduler")?;
    Ok(())
}
