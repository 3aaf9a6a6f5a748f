//! Plain configuration values handed to the core
//!
//! The core owns no file format. A loader builds these structs and calls
//! `validate()` before anything is scheduled; validation failures are the
//! only fatal errors in the system.

use std::collections::HashSet;
use std::time::Duration;

use crate::activity::PollTiers;
use crate::error::{Result, StateError};
use crate::model::Host;

pub const DEFAULT_VOLUME_STEP_COUNT: usize = 6;
pub const DEFAULT_VOLUME_PERCENT_LOW: f64 = 25.0;
pub const DEFAULT_VOLUME_PERCENT_HIGH: f64 = 65.0;

/// A statically configured input of a primary device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputConfig {
    /// Raw input code as reported by the device, e.g. `hdmi1`
    pub input: String,
    /// Name shown on the control surface
    pub name: String,
}

/// Position of a device in the distribution topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRole {
    /// Distribution server with its own inputs and dependent clients
    Primary {
        inputs: Vec<InputConfig>,
        clients: Vec<Host>,
    },
    /// Client that plays whatever its primary distributes
    Satellite { primary: Host },
}

/// Stepped volume: a few fixed levels between two percentages of max volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepConfig {
    pub count: usize,
    pub low_percent: Option<f64>,
    pub high_percent: Option<f64>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_VOLUME_STEP_COUNT,
            low_percent: None,
            high_percent: None,
        }
    }
}

impl StepConfig {
    /// Effective (low, high) bounds in percent
    ///
    /// A configured low bound that is not strictly below the high bound is
    /// ignored in favour of the default.
    pub fn bounds(&self) -> (f64, f64) {
        let high = self.high_percent.unwrap_or(DEFAULT_VOLUME_PERCENT_HIGH);
        let low = match self.low_percent {
            Some(low) if low < high => low,
            _ => DEFAULT_VOLUME_PERCENT_LOW,
        };
        (low, high)
    }
}

/// How volume is exposed to the control surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeProfile {
    /// Discrete steps, each selectable as an identifier
    Stepped(StepConfig),
    /// Raw device volume clamped to `[min, max]`, plus a mute switch
    ///
    /// A missing `max` means the device's reported maximum.
    Continuous { min: u32, max: Option<u32> },
}

impl Default for VolumeProfile {
    fn default() -> Self {
        VolumeProfile::Stepped(StepConfig::default())
    }
}

/// Configuration of one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub host: Host,
    pub role: DeviceRole,
    pub volume: VolumeProfile,
}

impl DeviceConfig {
    pub fn primary(host: impl Into<Host>, inputs: Vec<InputConfig>, clients: Vec<Host>) -> Self {
        Self {
            host: host.into(),
            role: DeviceRole::Primary { inputs, clients },
            volume: VolumeProfile::default(),
        }
    }

    pub fn satellite(host: impl Into<Host>, primary: impl Into<Host>) -> Self {
        Self {
            host: host.into(),
            role: DeviceRole::Satellite {
                primary: primary.into(),
            },
            volume: VolumeProfile::default(),
        }
    }

    pub fn with_volume(mut self, volume: VolumeProfile) -> Self {
        self.volume = volume;
        self
    }

    pub fn is_primary(&self) -> bool {
        matches!(self.role, DeviceRole::Primary { .. })
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.as_str().is_empty() {
            return Err(StateError::Config("device host must not be empty".to_string()));
        }

        match &self.role {
            DeviceRole::Primary { inputs, clients } => {
                if clients.contains(&self.host) {
                    return Err(StateError::Config(format!(
                        "{} lists itself as a client",
                        self.host
                    )));
                }
                let mut seen = HashSet::new();
                if let Some(dup) = inputs.iter().find(|i| !seen.insert(i.input.as_str())) {
                    return Err(StateError::Config(format!(
                        "input {} configured twice on {}",
                        dup.input, self.host
                    )));
                }
            }
            DeviceRole::Satellite { primary } => {
                if primary == &self.host {
                    return Err(StateError::Config(format!(
                        "{} cannot be its own primary",
                        self.host
                    )));
                }
            }
        }

        match self.volume {
            VolumeProfile::Stepped(steps) => {
                if steps.count < 2 {
                    return Err(StateError::Config(
                        "volume step count must be at least 2".to_string(),
                    ));
                }
                let in_range = |p: Option<f64>| p.map_or(true, |p| (0.0..=100.0).contains(&p));
                if !in_range(steps.low_percent) || !in_range(steps.high_percent) {
                    return Err(StateError::Config(
                        "volume percentages must be within 0..=100".to_string(),
                    ));
                }
            }
            VolumeProfile::Continuous { min, max } => {
                if max.is_some_and(|max| min >= max) {
                    return Err(StateError::Config(format!(
                        "volume min {min} must be below max"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Bounded wait after a state-changing command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceConfig {
    pub interval: Duration,
    pub bound: Duration,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            bound: Duration::from_secs(10),
        }
    }
}

impl ConvergenceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(StateError::Config(
                "convergence interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything the core needs to run a bridge
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BridgeConfig {
    pub devices: Vec<DeviceConfig>,
    pub tiers: PollTiers,
    pub convergence: ConvergenceConfig,
}

impl BridgeConfig {
    /// Check every device and the topology between them
    pub fn validate(&self) -> Result<()> {
        self.tiers.validate()?;
        self.convergence.validate()?;

        let mut hosts = HashSet::new();
        for device in &self.devices {
            device.validate()?;
            if !hosts.insert(&device.host) {
                return Err(StateError::Config(format!(
                    "host {} configured twice",
                    device.host
                )));
            }
        }

        for device in &self.devices {
            match &device.role {
                DeviceRole::Satellite { primary } => {
                    let known = self
                        .devices
                        .iter()
                        .any(|d| &d.host == primary && d.is_primary());
                    if !known {
                        return Err(StateError::Config(format!(
                            "{} refers to unknown primary {}",
                            device.host, primary
                        )));
                    }
                }
                DeviceRole::Primary { clients, .. } => {
                    if let Some(missing) = clients.iter().find(|c| !hosts.contains(c)) {
                        return Err(StateError::Config(format!(
                            "{} lists unknown client {}",
                            device.host, missing
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
