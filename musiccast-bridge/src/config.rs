//! JSON configuration file
//!
//! ```json
//! {
//!   "name": "Living Room",
//!   "server": {
//!     "host": "192.168.1.20",
//!     "inputs": [{ "input": "hdmi1", "name": "TV" }],
//!     "presetInfoRegex": "\\s*\\(DAB\\)",
//!     "volumePercentageLow": 20,
//!     "volumePercentageHigh": 60
//!   },
//!   "clients": [{ "host": "192.168.1.21", "volumeMin": 10, "volumeMax": 80 }],
//!   "polling": { "offMs": 60000, "onMs": 20000, "activityMs": 1000 }
//! }
//! ```
//!
//! Setting `volumeMin` or `volumeMax` selects a continuous volume control;
//! otherwise the device gets `volumeSteps` discrete levels. Matches of
//! `presetInfoRegex` are removed from preset names; an invalid pattern is
//! logged and ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use musiccast_state::{
    BridgeConfig, ConvergenceConfig, DeviceConfig, Host, InputConfig, PollTiers, StateError,
    StepConfig, VolumeProfile,
};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] StateError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputEntry {
    pub input: String,
    pub name: String,
}

/// Volume settings shared by the server and its clients
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSettings {
    pub volume_min: Option<u32>,
    pub volume_max: Option<u32>,
    pub volume_percentage_low: Option<f64>,
    pub volume_percentage_high: Option<f64>,
    pub volume_steps: Option<usize>,
}

impl VolumeSettings {
    pub fn profile(&self) -> VolumeProfile {
        if self.volume_min.is_some() || self.volume_max.is_some() {
            return VolumeProfile::Continuous {
                min: self.volume_min.unwrap_or(0),
                max: self.volume_max,
            };
        }
        let defaults = StepConfig::default();
        VolumeProfile::Stepped(StepConfig {
            count: self.volume_steps.unwrap_or(defaults.count),
            low_percent: self.volume_percentage_low,
            high_percent: self.volume_percentage_high,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEntry {
    pub host: String,
    #[serde(default)]
    pub inputs: Vec<InputEntry>,
    #[serde(default)]
    pub preset_info_regex: Option<String>,
    #[serde(flatten)]
    pub volume: VolumeSettings,
}

impl ServerEntry {
    /// Compile `presetInfoRegex`, dropping it with a warning when invalid
    pub fn preset_pattern(&self) -> Option<Regex> {
        let source = self.preset_info_regex.as_deref()?;
        match Regex::new(source) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = source, error = %e, "invalid presetInfoRegex, preset names left as is");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientEntry {
    pub host: String,
    #[serde(flatten)]
    pub volume: VolumeSettings,
}

/// Timing overrides in milliseconds
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingSettings {
    pub off_ms: Option<u64>,
    pub on_ms: Option<u64>,
    pub activity_ms: Option<u64>,
    pub tick_ms: Option<u64>,
    pub convergence_interval_ms: Option<u64>,
    pub convergence_bound_ms: Option<u64>,
}

impl PollingSettings {
    fn tiers(&self) -> PollTiers {
        let defaults = PollTiers::default();
        PollTiers {
            off: millis_or(self.off_ms, defaults.off),
            on: millis_or(self.on_ms, defaults.on),
            activity: millis_or(self.activity_ms, defaults.activity),
            tick: millis_or(self.tick_ms, defaults.tick),
        }
    }

    fn convergence(&self) -> ConvergenceConfig {
        let defaults = ConvergenceConfig::default();
        ConvergenceConfig {
            interval: millis_or(self.convergence_interval_ms, defaults.interval),
            bound: millis_or(self.convergence_bound_ms, defaults.bound),
        }
    }
}

fn millis_or(value: Option<u64>, default: Duration) -> Duration {
    value.map_or(default, Duration::from_millis)
}

/// Top-level configuration document
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeFile {
    #[serde(default = "default_name")]
    pub name: String,
    pub server: ServerEntry,
    #[serde(default)]
    pub clients: Vec<ClientEntry>,
    #[serde(default)]
    pub polling: PollingSettings,
}

fn default_name() -> String {
    "MusicCast".to_string()
}

impl BridgeFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    /// Build and validate the core configuration
    ///
    /// The server comes first, followed by its clients in file order.
    pub fn to_bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        let server = Host::new(self.server.host.as_str());
        let clients: Vec<Host> = self
            .clients
            .iter()
            .map(|client| Host::new(client.host.as_str()))
            .collect();

        let inputs = self
            .server
            .inputs
            .iter()
            .map(|entry| InputConfig {
                input: entry.input.clone(),
                name: entry.name.clone(),
            })
            .collect();

        let mut devices = vec![DeviceConfig::primary(server.clone(), inputs, clients)
            .with_volume(self.server.volume.profile())];
        devices.extend(self.clients.iter().map(|client| {
            DeviceConfig::satellite(client.host.as_str(), server.clone())
                .with_volume(client.volume.profile())
        }));

        let config = BridgeConfig {
            devices,
            tiers: self.polling.tiers(),
            convergence: self.polling.convergence(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl std::str::FromStr for BridgeFile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}
