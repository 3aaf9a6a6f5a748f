//! Boundary to the control surface
//!
//! The core knows nothing about characteristic objects. It describes what a
//! device offers once, via [`AccessoryLayout`], and afterwards only pushes
//! resolved values.

use crate::model::Host;

/// Static accessory information shown by the control surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInfo {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_revision: String,
    pub software_revision: String,
}

/// Kind of accessory to present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryCategory {
    AudioReceiver,
    Speaker,
}

/// One selectable entry of an identifier list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub identifier: u32,
    pub name: String,
}

/// How the volume accessory is presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeLayout {
    Stepped(Vec<SourceEntry>),
    Continuous { min: u32, max: u32 },
}

/// Everything a device exposes, published once after the initial load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryLayout {
    pub info: AccessoryInfo,
    pub category: AccessoryCategory,
    pub volume: VolumeLayout,
    /// Inputs and presets; only primaries have an input accessory
    pub sources: Option<Vec<SourceEntry>>,
    pub lip_sync: bool,
    pub surround_decoder: bool,
}

/// A resolved value for one characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacteristicUpdate {
    Power(bool),
    VolumeStep(u32),
    Volume(u32),
    Mute(bool),
    ActiveSource(u32),
    LipSync(bool),
    SurroundDecoder(bool),
}

/// Sink for accessory layouts and value updates
pub trait AccessoryBinding: Send + Sync {
    fn publish(&self, host: &Host, layout: &AccessoryLayout);

    fn push(&self, host: &Host, update: CharacteristicUpdate);
}
