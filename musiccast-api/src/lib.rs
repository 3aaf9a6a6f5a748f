//! MusicCast device API
//!
//! A small async client for the Yamaha Extended Control HTTP API, limited to
//! what a home-automation bridge needs: reading device, status, playback and
//! preset information, and issuing power, volume, input and distribution
//! commands.
//!
//! # Example
//!
//! ```rust,ignore
//! use musiccast_api::{Command, DeviceApi, MusicCastClient};
//!
//! let client = MusicCastClient::builder("192.168.1.20").build()?;
//! let status = client.fetch_status("192.168.1.20").await?;
//! if !status.is_powered_on() {
//!     client.send_command("192.168.1.20", Command::SetPower(true)).await?;
//! }
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod types;

pub use client::{group_id_for, DeviceApi, MusicCastClient, MusicCastClientBuilder};
pub use command::{
    Command, CommandRequest, GroupAction, LINK_AUDIO_DELAY_AUDIO_SYNC, LINK_AUDIO_DELAY_LIP_SYNC,
    SOUND_PROGRAM_STRAIGHT, SOUND_PROGRAM_SURROUND_DECODER,
};
pub use error::{ApiError, Result};
pub use types::{
    is_network_input, DeviceInfo, Features, PlayInfo, Playback, Power, Preset, PresetInfo,
    RawPreset, Status, ZoneFeatures,
};
