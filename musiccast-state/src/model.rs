//! Host identity and cached state categories

use std::fmt;

use musiccast_api::{DeviceInfo, Features, PlayInfo, PresetInfo, Status};
use serde::{Deserialize, Serialize};

/// Network address of one physical device
///
/// The unit of caching, scheduling and activity tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Host(String);

impl Host {
    /// Creates a new Host, trimming surrounding whitespace
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Host {
    fn from(s: &str) -> Self {
        Host::new(s)
    }
}

impl From<String> for Host {
    fn from(s: String) -> Self {
        Host::new(s)
    }
}

/// The fixed set of state categories cached per host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateCategory {
    DeviceInfo,
    Status,
    PlayInfo,
    PresetInfo,
    Features,
}

impl StateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateCategory::DeviceInfo => "deviceInfo",
            StateCategory::Status => "status",
            StateCategory::PlayInfo => "playInfo",
            StateCategory::PresetInfo => "presetInfo",
            StateCategory::Features => "features",
        }
    }
}

impl fmt::Display for StateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that can occupy one category slot of a host snapshot
pub trait Category: Clone + Send + Sync + 'static {
    const CATEGORY: StateCategory;
}

impl Category for DeviceInfo {
    const CATEGORY: StateCategory = StateCategory::DeviceInfo;
}

impl Category for Status {
    const CATEGORY: StateCategory = StateCategory::Status;
}

impl Category for PlayInfo {
    const CATEGORY: StateCategory = StateCategory::PlayInfo;
}

impl Category for PresetInfo {
    const CATEGORY: StateCategory = StateCategory::PresetInfo;
}

impl Category for Features {
    const CATEGORY: StateCategory = StateCategory::Features;
}
