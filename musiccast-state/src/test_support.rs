//! In-memory doubles for the device API and the accessory binding

use std::collections::HashMap;

use async_trait::async_trait;
use musiccast_api::{
    ApiError, Command, DeviceApi, DeviceInfo, Features, PlayInfo, Playback, Power, Preset,
    PresetInfo, Result, Status, ZoneFeatures, LINK_AUDIO_DELAY_AUDIO_SYNC,
    LINK_AUDIO_DELAY_LIP_SYNC, SOUND_PROGRAM_STRAIGHT, SOUND_PROGRAM_SURROUND_DECODER,
};
use parking_lot::Mutex;

use crate::binding::{AccessoryBinding, AccessoryLayout, CharacteristicUpdate};
use crate::model::Host;

#[derive(Default)]
struct Fixture {
    device_info: Option<DeviceInfo>,
    features: Option<Features>,
    play_info: Option<PlayInfo>,
    preset_info: Option<PresetInfo>,
    status: Option<Status>,
}

/// Fake device fleet
///
/// Every command is recorded. Commands that change status fields are also
/// applied to the stored status, so later fetches observe them like a real
/// device would.
#[derive(Default)]
pub(crate) struct MockApi {
    fixtures: Mutex<HashMap<String, Fixture>>,
    commands: Mutex<Vec<(String, Command)>>,
    failing: Mutex<Vec<(String, Option<&'static str>)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_fixture(&self, host: &str, update: impl FnOnce(&mut Fixture)) {
        update(self.fixtures.lock().entry(host.to_string()).or_default());
    }

    /// Register a receiver with sensible defaults for every category
    pub fn add_receiver(&self, host: &str) {
        self.with_fixture(host, |f| {
            f.device_info = Some(device_info());
            f.features = Some(features(true, true));
            f.play_info = Some(PlayInfo::default());
            f.preset_info = Some(presets());
            f.status = Some(status(false, 60, "hdmi1"));
        });
    }

    pub fn set_status(&self, host: &str, status: Status) {
        self.with_fixture(host, |f| f.status = Some(status));
    }

    pub fn set_play_info(&self, host: &str, play_info: PlayInfo) {
        self.with_fixture(host, |f| f.play_info = Some(play_info));
    }

    pub fn set_features(&self, host: &str, features: Features) {
        self.with_fixture(host, |f| f.features = Some(features));
    }

    /// Drop every fixture of `host`; later fetches fail
    pub fn disconnect(&self, host: &str) {
        self.fixtures.lock().remove(host);
    }

    pub fn status(&self, host: &str) -> Option<Status> {
        self.fixtures.lock().get(host).and_then(|f| f.status.clone())
    }

    /// Make commands to `host` fail, optionally only those of one kind
    pub fn fail_commands(&self, host: &str, kind: Option<&'static str>) {
        self.failing.lock().push((host.to_string(), kind));
    }

    pub fn commands(&self) -> Vec<(String, Command)> {
        self.commands.lock().clone()
    }

    pub fn commands_for(&self, host: &str) -> Vec<Command> {
        self.commands
            .lock()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn fetch<T>(&self, host: &str, pick: impl FnOnce(&Fixture) -> Option<T>) -> Result<T> {
        self.fixtures
            .lock()
            .get(host)
            .and_then(pick)
            .ok_or_else(|| ApiError::NetworkError(format!("{host} unreachable")))
    }

    fn apply(&self, host: &str, command: &Command) {
        let mut fixtures = self.fixtures.lock();
        let Some(status) = fixtures.get_mut(host).and_then(|f| f.status.as_mut()) else {
            return;
        };
        match command {
            Command::SetPower(on) => status.power = Power::from_on(*on),
            Command::SetVolume(volume) => status.volume = *volume,
            Command::SetMute(mute) => status.mute = *mute,
            Command::SetInput(input) => status.input = input.clone(),
            Command::SetLinkAudioDelay(delay) => status.link_audio_delay = delay.clone(),
            Command::SetSoundProgram(program) => status.sound_program = program.clone(),
            _ => {}
        }
    }
}

#[async_trait]
impl DeviceApi for MockApi {
    async fn fetch_device_info(&self, host: &str) -> Result<DeviceInfo> {
        self.fetch(host, |f| f.device_info.clone())
    }

    async fn fetch_features(&self, host: &str) -> Result<Features> {
        self.fetch(host, |f| f.features.clone())
    }

    async fn fetch_play_info(&self, host: &str) -> Result<PlayInfo> {
        self.fetch(host, |f| f.play_info.clone())
    }

    async fn fetch_preset_info(&self, host: &str) -> Result<PresetInfo> {
        self.fetch(host, |f| f.preset_info.clone())
    }

    async fn fetch_status(&self, host: &str) -> Result<Status> {
        self.fetch(host, |f| f.status.clone())
    }

    async fn send_command(&self, host: &str, command: Command) -> Result<()> {
        self.commands.lock().push((host.to_string(), command.clone()));
        let fails = self
            .failing
            .lock()
            .iter()
            .any(|(h, kind)| h == host && kind.map_or(true, |k| k == command.kind()));
        if fails {
            return Err(ApiError::NetworkError(format!("{host} unreachable")));
        }
        self.apply(host, &command);
        Ok(())
    }
}

/// Binding that keeps everything it receives
#[derive(Default)]
pub(crate) struct RecordingBinding {
    published: Mutex<Vec<(Host, AccessoryLayout)>>,
    updates: Mutex<Vec<(Host, CharacteristicUpdate)>>,
}

impl RecordingBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self, host: &Host) -> Option<AccessoryLayout> {
        self.published
            .lock()
            .iter()
            .rev()
            .find(|(h, _)| h == host)
            .map(|(_, layout)| layout.clone())
    }

    pub fn updates(&self, host: &Host) -> Vec<CharacteristicUpdate> {
        self.updates
            .lock()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, update)| *update)
            .collect()
    }

    pub fn clear(&self) {
        self.updates.lock().clear();
    }
}

impl AccessoryBinding for RecordingBinding {
    fn publish(&self, host: &Host, layout: &AccessoryLayout) {
        self.published.lock().push((host.clone(), layout.clone()));
    }

    fn push(&self, host: &Host, update: CharacteristicUpdate) {
        self.updates.lock().push((host.clone(), update));
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub(crate) fn device_info() -> DeviceInfo {
    DeviceInfo {
        response_code: 0,
        model_name: "RX-V685".to_string(),
        system_version: 2.57,
        api_version: 2.09,
        serial_number: "Y123456".to_string(),
    }
}

pub(crate) fn features(lip_sync: bool, surround: bool) -> Features {
    let mut main = ZoneFeatures {
        id: "main".to_string(),
        sound_program_list: vec!["stereo".to_string()],
        link_audio_delay_list: Vec::new(),
    };
    if lip_sync {
        main.link_audio_delay_list = vec![
            LINK_AUDIO_DELAY_AUDIO_SYNC.to_string(),
            LINK_AUDIO_DELAY_LIP_SYNC.to_string(),
        ];
    }
    if surround {
        main.sound_program_list.push(SOUND_PROGRAM_STRAIGHT.to_string());
        main.sound_program_list.push(SOUND_PROGRAM_SURROUND_DECODER.to_string());
    }
    Features {
        response_code: 0,
        zone: vec![main],
    }
}

/// Slots 1 and 3 hold radio stations, slot 2 was dropped by filtering
pub(crate) fn presets() -> PresetInfo {
    let preset = |number: u32, text: &str| Preset {
        number,
        input: "net_radio".to_string(),
        text: text.to_string(),
        display_text: text.to_string(),
    };
    PresetInfo {
        presets: vec![preset(1, "Jazz FM"), preset(3, "News Radio")],
    }
}

pub(crate) fn status(on: bool, volume: u32, input: &str) -> Status {
    Status {
        power: Power::from_on(on),
        volume,
        max_volume: 200,
        input: input.to_string(),
        sound_program: SOUND_PROGRAM_STRAIGHT.to_string(),
        link_audio_delay: LINK_AUDIO_DELAY_AUDIO_SYNC.to_string(),
        ..Default::default()
    }
}

pub(crate) fn playing(track: &str) -> PlayInfo {
    PlayInfo {
        input: "net_radio".to_string(),
        playback: Playback::Play,
        track: track.to_string(),
        artist: "Someone".to_string(),
        ..Default::default()
    }
}
