//! Response models for the MusicCast extended control API
//!
//! Every endpoint answers with a JSON object carrying a `response_code`
//! (zero on success). Unknown fields are tolerated everywhere; `Status` keeps
//! them so that two snapshots can be compared field-for-field.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inputs that play from the network module and can hold presets
pub const NETWORK_INPUTS: [&str; 2] = ["server", "net_radio"];

/// Returns true when `input` is a network source (server or net radio)
pub fn is_network_input(input: &str) -> bool {
    NETWORK_INPUTS.contains(&input)
}

/// Power state reported by `getStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    On,
    #[default]
    Standby,
    #[serde(other)]
    Unknown,
}

impl Power {
    /// Query parameter value used by `setPower`
    pub fn from_on(on: bool) -> Self {
        if on {
            Power::On
        } else {
            Power::Standby
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Power::On => "on",
            Power::Standby => "standby",
            Power::Unknown => "unknown",
        }
    }
}

/// Playback state of the network module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Playback {
    Play,
    #[default]
    Stop,
    Pause,
    FastReverse,
    FastForward,
    #[serde(other)]
    Unknown,
}

impl Playback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Playback::Play => "play",
            Playback::Stop => "stop",
            Playback::Pause => "pause",
            Playback::FastReverse => "fast_reverse",
            Playback::FastForward => "fast_forward",
            Playback::Unknown => "unknown",
        }
    }
}

/// `system/getDeviceInfo`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub response_code: i64,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub system_version: f64,
    #[serde(default)]
    pub api_version: f64,
    #[serde(default)]
    pub serial_number: String,
}

/// Capabilities of a single zone from `system/getFeatures`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneFeatures {
    pub id: String,
    #[serde(default)]
    pub sound_program_list: Vec<String>,
    #[serde(default)]
    pub link_audio_delay_list: Vec<String>,
}

impl ZoneFeatures {
    pub fn supports_sound_program(&self, program: &str) -> bool {
        self.sound_program_list.iter().any(|p| p == program)
    }

    pub fn supports_link_audio_delay(&self, delay: &str) -> bool {
        self.link_audio_delay_list.iter().any(|d| d == delay)
    }
}

/// `system/getFeatures`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Features {
    #[serde(default)]
    pub response_code: i64,
    #[serde(default)]
    pub zone: Vec<ZoneFeatures>,
}

impl Features {
    /// The `main` zone, which is the only zone this crate controls
    pub fn main_zone(&self) -> Option<&ZoneFeatures> {
        self.zone.iter().find(|zone| zone.id == "main")
    }
}

/// `netusb/getPlayInfo`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayInfo {
    #[serde(default)]
    pub response_code: i64,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub playback: Playback,
    #[serde(default)]
    pub play_time: i64,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub track: String,
}

impl PlayInfo {
    /// True while a server or net radio source is actively playing
    pub fn is_playing_network_source(&self) -> bool {
        self.playback == Playback::Play && is_network_input(&self.input)
    }
}

/// One preset slot as returned by the device
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawPreset {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct RawPresetInfo {
    #[serde(default)]
    pub response_code: i64,
    #[serde(default)]
    pub preset_info: Vec<RawPreset>,
}

/// A stored network preset
///
/// `number` is the 1-based slot on the device (the value `recallPreset`
/// expects); slots are numbered before empty or non-network entries are
/// dropped, so numbers may have gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub number: u32,
    pub input: String,
    pub text: String,
    pub display_text: String,
}

/// `netusb/getPresetInfo`, filtered to usable network presets
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresetInfo {
    pub presets: Vec<Preset>,
}

impl PresetInfo {
    /// Number raw slots, drop unusable ones and clean up display text
    ///
    /// Every match of `strip` is removed from the display text, which is
    /// then trimmed. The raw `text` is kept for matching against the
    /// currently playing track.
    pub fn from_raw(raw: Vec<RawPreset>, strip: Option<&Regex>) -> Self {
        let presets = raw
            .into_iter()
            .enumerate()
            .filter(|(_, preset)| is_network_input(&preset.input) && !preset.text.is_empty())
            .map(|(index, preset)| {
                let display_text = match strip {
                    Some(pattern) => pattern.replace_all(&preset.text, "").into_owned(),
                    None => preset.text.clone(),
                };
                Preset {
                    number: index as u32 + 1,
                    display_text: display_text.trim().to_string(),
                    input: preset.input,
                    text: preset.text,
                }
            })
            .collect();

        Self { presets }
    }
}

/// `main/getStatus`
///
/// Fields the bridge reads are typed; everything else lands in `extra` so
/// that equality covers the whole payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub response_code: i64,
    #[serde(default)]
    pub power: Power,
    #[serde(default)]
    pub volume: u32,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub max_volume: u32,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub input_text: String,
    #[serde(default)]
    pub distribution_enable: bool,
    #[serde(default)]
    pub sound_program: String,
    #[serde(default)]
    pub link_audio_delay: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Status {
    pub fn is_powered_on(&self) -> bool {
        self.power == Power::On
    }
}
