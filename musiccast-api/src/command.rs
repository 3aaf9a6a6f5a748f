//! Outbound device commands
//!
//! A `Command` is a typed description of one control request. It is turned
//! into a concrete path/query/body triple by [`Command::to_request`]; the
//! client only has to prefix the base URL and send it.

use serde_json::{json, Value};

use crate::types::{Playback, Power};

pub const LINK_AUDIO_DELAY_LIP_SYNC: &str = "lip_sync";
pub const LINK_AUDIO_DELAY_AUDIO_SYNC: &str = "audio_sync";
pub const SOUND_PROGRAM_SURROUND_DECODER: &str = "surr_decoder";
pub const SOUND_PROGRAM_STRAIGHT: &str = "straight";

/// Membership change sent to a distribution server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    Add,
    Remove,
}

impl GroupAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupAction::Add => "add",
            GroupAction::Remove => "remove",
        }
    }
}

/// A control request for one device
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetPower(bool),
    SetVolume(u32),
    SetMute(bool),
    SetInput(String),
    SetPlayback(Playback),
    /// Recall the preset stored in the given 1-based slot
    RecallPreset(u32),
    SetLinkAudioDelay(String),
    SetSoundProgram(String),
    /// Sent to a client: follow the given server
    SetClientInfo { server: String },
    /// Sent to a server: add or remove a client from its group
    SetServerInfo { client: String, action: GroupAction },
    StartDistribution,
}

/// The HTTP shape of a command, relative to the API base URL
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    /// JSON body; commands with a body are sent as POST
    pub body: Option<Value>,
}

impl Command {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SetPower(_) => "setPower",
            Command::SetVolume(_) => "setVolume",
            Command::SetMute(_) => "setMute",
            Command::SetInput(_) => "setInput",
            Command::SetPlayback(_) => "setPlayback",
            Command::RecallPreset(_) => "recallPreset",
            Command::SetLinkAudioDelay(_) => "setLinkAudioDelay",
            Command::SetSoundProgram(_) => "setSoundProgram",
            Command::SetClientInfo { .. } => "setClientInfo",
            Command::SetServerInfo { .. } => "setServerInfo",
            Command::StartDistribution => "startDistribution",
        }
    }

    pub fn to_request(&self, zone: &str, group_id: &str) -> CommandRequest {
        let get = |path: String, query: Vec<(&'static str, String)>| CommandRequest {
            path,
            query,
            body: None,
        };

        match self {
            Command::SetPower(on) => get(
                format!("{zone}/setPower"),
                vec![("power", Power::from_on(*on).as_str().to_string())],
            ),
            Command::SetVolume(volume) => {
                get(format!("{zone}/setVolume"), vec![("volume", volume.to_string())])
            }
            Command::SetMute(mute) => {
                get(format!("{zone}/setMute"), vec![("enable", mute.to_string())])
            }
            Command::SetInput(input) => {
                get(format!("{zone}/setInput"), vec![("input", input.clone())])
            }
            Command::SetPlayback(playback) => get(
                "netusb/setPlayback".to_string(),
                vec![("playback", playback.as_str().to_string())],
            ),
            Command::RecallPreset(number) => get(
                "netusb/recallPreset".to_string(),
                vec![("zone", zone.to_string()), ("num", number.to_string())],
            ),
            Command::SetLinkAudioDelay(delay) => get(
                format!("{zone}/setLinkAudioDelay"),
                vec![("delay", delay.clone())],
            ),
            Command::SetSoundProgram(program) => get(
                format!("{zone}/setSoundProgram"),
                vec![("program", program.clone())],
            ),
            Command::SetClientInfo { server } => CommandRequest {
                path: "dist/setClientInfo".to_string(),
                query: Vec::new(),
                body: Some(json!({
                    "group_id": group_id,
                    "zone": [zone],
                    "server_ip_address": server,
                })),
            },
            Command::SetServerInfo { client, action } => CommandRequest {
                path: "dist/setServerInfo".to_string(),
                query: Vec::new(),
                body: Some(json!({
                    "group_id": group_id,
                    "zone": zone,
                    "type": action.as_str(),
                    "client_list": [client],
                })),
            },
            Command::StartDistribution => get(
                "dist/startDistribution".to_string(),
                vec![("num", "0".to_string())],
            ),
        }
    }
}
