//! Per-device controller
//!
//! A [`MusicCastDevice`] owns nothing but its configuration and derived
//! volume steps. All device state lives in the shared [`HostCache`]; the
//! device reads it to answer the binding and writes it from its refresh
//! subscription.

use std::sync::Arc;

use async_trait::async_trait;
use musiccast_api::{
    Command, DeviceApi, DeviceInfo, Features, PlayInfo, Playback, PresetInfo, Status,
    LINK_AUDIO_DELAY_AUDIO_SYNC, LINK_AUDIO_DELAY_LIP_SYNC, SOUND_PROGRAM_STRAIGHT,
    SOUND_PROGRAM_SURROUND_DECODER,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::binding::{
    AccessoryBinding, AccessoryCategory, AccessoryInfo, AccessoryLayout, CharacteristicUpdate,
    SourceEntry, VolumeLayout,
};
use crate::choreographer::Choreographer;
use crate::config::{DeviceConfig, DeviceRole, VolumeProfile};
use crate::convergence::ConvergenceWaiter;
use crate::error::{Result, StateError};
use crate::model::Host;
use crate::resolver::{
    clamp_volume, input_sources, preset_identifier, resolve_active_identifier, InputSource,
    VolumeSteps,
};
use crate::scheduler::{PollScheduler, RefreshSubscriber};
use crate::store::HostCache;

const MANUFACTURER: &str = "Yamaha";

pub struct MusicCastDevice {
    config: DeviceConfig,
    api: Arc<dyn DeviceApi>,
    cache: HostCache,
    binding: Arc<dyn AccessoryBinding>,
    waiter: ConvergenceWaiter,
    choreographer: Choreographer,
    inputs: Vec<InputSource>,
    volume_steps: RwLock<VolumeSteps>,
    layout: RwLock<Option<AccessoryLayout>>,
}

impl MusicCastDevice {
    pub fn new(
        config: DeviceConfig,
        api: Arc<dyn DeviceApi>,
        cache: HostCache,
        binding: Arc<dyn AccessoryBinding>,
        waiter: ConvergenceWaiter,
    ) -> Self {
        let inputs = match &config.role {
            DeviceRole::Primary { inputs, .. } => input_sources(inputs),
            DeviceRole::Satellite { .. } => Vec::new(),
        };
        let choreographer = Choreographer::new(Arc::clone(&api), cache.clone(), waiter);

        Self {
            config,
            api,
            cache,
            binding,
            waiter,
            choreographer,
            inputs,
            volume_steps: RwLock::new(VolumeSteps::default()),
            layout: RwLock::new(None),
        }
    }

    pub fn host(&self) -> &Host {
        &self.config.host
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn volume_steps(&self) -> VolumeSteps {
        self.volume_steps.read().clone()
    }

    /// Register this device's refresh with the scheduler
    pub fn attach(self: &Arc<Self>, scheduler: &PollScheduler) {
        let subscriber: Arc<dyn RefreshSubscriber> = Arc::clone(self) as Arc<dyn RefreshSubscriber>;
        scheduler.subscribe(self.host(), subscriber);
    }

    // ==================== Initial load and layout ====================

    /// Fetch every category once and derive the volume steps
    pub async fn load_initial_status(&self) -> Result<()> {
        let host = self.host();
        let address = host.as_str();

        let device_info = self.api.fetch_device_info(address).await?;
        let preset_info = self.api.fetch_preset_info(address).await?;
        let status = self.api.fetch_status(address).await?;
        let play_info = self.api.fetch_play_info(address).await?;
        let features = self.api.fetch_features(address).await?;

        if let VolumeProfile::Stepped(step_config) = self.config.volume {
            let steps = VolumeSteps::compute(status.max_volume, &step_config);
            let volumes: Vec<u32> = steps.iter().map(|step| step.volume).collect();
            debug!(%host, ?volumes, "volume steps");
            *self.volume_steps.write() = steps;
        }

        self.cache.set(host, device_info);
        self.cache.set(host, preset_info);
        self.cache.set(host, status);
        self.cache.set(host, play_info);
        self.cache.set(host, features);
        Ok(())
    }

    /// Describe what this device exposes, from the cached state
    pub fn layout(&self) -> Result<AccessoryLayout> {
        let host = self.host();
        let device_info = self.cache.require::<DeviceInfo>(host)?;

        let info = AccessoryInfo {
            manufacturer: MANUFACTURER.to_string(),
            model: device_info.model_name.clone(),
            serial_number: format!("{} {}", device_info.serial_number, host),
            firmware_revision: device_info.system_version.to_string(),
            software_revision: device_info.api_version.to_string(),
        };

        let volume = match self.config.volume {
            VolumeProfile::Stepped(_) => VolumeLayout::Stepped(
                self.volume_steps
                    .read()
                    .iter()
                    .map(|step| SourceEntry {
                        identifier: step.id,
                        name: step.label.clone(),
                    })
                    .collect(),
            ),
            VolumeProfile::Continuous { .. } => {
                let (min, max) = self.volume_range();
                VolumeLayout::Continuous { min, max }
            }
        };

        if !self.config.is_primary() {
            return Ok(AccessoryLayout {
                info,
                category: AccessoryCategory::Speaker,
                volume,
                sources: None,
                lip_sync: false,
                surround_decoder: false,
            });
        }

        let presets = self.cache.require::<PresetInfo>(host)?;
        let features = self.cache.require::<Features>(host)?;

        let mut sources: Vec<SourceEntry> = self
            .inputs
            .iter()
            .map(|source| SourceEntry {
                identifier: source.identifier,
                name: source.name.clone(),
            })
            .collect();
        sources.extend(presets.presets.iter().map(|preset| SourceEntry {
            identifier: preset_identifier(preset),
            name: preset.display_text.clone(),
        }));

        let main = features.main_zone();
        let lip_sync = main.is_some_and(|zone| {
            zone.supports_link_audio_delay(LINK_AUDIO_DELAY_LIP_SYNC)
                && zone.supports_link_audio_delay(LINK_AUDIO_DELAY_AUDIO_SYNC)
        });
        let surround_decoder = main.is_some_and(|zone| {
            zone.supports_sound_program(SOUND_PROGRAM_SURROUND_DECODER)
                && zone.supports_sound_program(SOUND_PROGRAM_STRAIGHT)
        });

        Ok(AccessoryLayout {
            info,
            category: AccessoryCategory::AudioReceiver,
            volume,
            sources: Some(sources),
            lip_sync,
            surround_decoder,
        })
    }

    /// Hand the layout to the binding, then push the current values
    pub async fn publish(&self) -> Result<()> {
        let layout = self.layout()?;
        self.binding.publish(self.host(), &layout);
        info!(
            host = %self.host(),
            model = %layout.info.model,
            sources = layout.sources.as_ref().map_or(0, Vec::len),
            "accessory published"
        );
        *self.layout.write() = Some(layout);
        self.push_state();
        Ok(())
    }

    // ==================== Resolved state ====================

    /// Continuous volume bounds, falling back to the device maximum
    fn volume_range(&self) -> (u32, u32) {
        let device_max = self
            .cache
            .get::<Status>(self.host())
            .map_or(u32::MAX, |status| status.max_volume);
        match self.config.volume {
            VolumeProfile::Continuous { min, max } => (min, max.unwrap_or(device_max)),
            VolumeProfile::Stepped(_) => (0, device_max),
        }
    }

    /// Identifier of the input or preset currently playing, if any
    pub fn active_identifier(&self) -> Option<u32> {
        let status = self.cache.get::<Status>(self.host())?;
        self.resolve_active(&status)
    }

    fn resolve_active(&self, status: &Status) -> Option<u32> {
        let host = self.host();
        let play_info = self.cache.get::<PlayInfo>(host);
        let presets = self.cache.get::<PresetInfo>(host).unwrap_or_default();
        resolve_active_identifier(status, play_info.as_ref(), &presets.presets, &self.inputs)
    }

    /// Push every resolved value the published layout exposes
    fn push_state(&self) {
        let host = self.host();
        let layout = self.layout.read();
        let Some(layout) = layout.as_ref() else {
            return;
        };
        let Some(status) = self.cache.get::<Status>(host) else {
            return;
        };
        let push = |update| self.binding.push(host, update);

        push(CharacteristicUpdate::Power(status.is_powered_on()));

        match layout.volume {
            VolumeLayout::Stepped(_) => {
                if let Some(step) = self.volume_steps.read().nearest(status.volume) {
                    push(CharacteristicUpdate::VolumeStep(step.id));
                }
            }
            VolumeLayout::Continuous { min, max } => {
                push(CharacteristicUpdate::Volume(clamp_volume(status.volume, min, max)));
                push(CharacteristicUpdate::Mute(status.mute));
            }
        }

        if layout.sources.is_some() {
            // unresolved leaves the surface showing its previous selection
            if let Some(identifier) = self.resolve_active(&status) {
                push(CharacteristicUpdate::ActiveSource(identifier));
            }
        }
        if layout.lip_sync {
            push(CharacteristicUpdate::LipSync(
                status.link_audio_delay == LINK_AUDIO_DELAY_LIP_SYNC,
            ));
        }
        if layout.surround_decoder {
            push(CharacteristicUpdate::SurroundDecoder(
                status.sound_program == SOUND_PROGRAM_SURROUND_DECODER,
            ));
        }
    }

    // ==================== Commands ====================

    async fn send(&self, command: Command) -> Result<()> {
        debug!(host = %self.host(), kind = command.kind(), "sending command");
        self.api.send_command(self.host().as_str(), command).await?;
        Ok(())
    }

    fn ping_activity(&self) {
        self.cache.ping(self.host(), false, true);
    }

    /// Switch power, then run whatever the topology requires
    ///
    /// Powering on a satellite links it to its primary; powering off a
    /// primary powers off its clients. Otherwise the call waits for the
    /// device to report the new power state.
    pub async fn set_power(&self, on: bool) -> Result<()> {
        let host = self.host();
        self.send(Command::SetPower(on)).await?;
        self.cache.ping(host, on, true);

        match &self.config.role {
            DeviceRole::Satellite { primary } if on => {
                self.choreographer.link_satellite(host, primary).await
            }
            DeviceRole::Primary { clients, .. } if !on && !clients.is_empty() => {
                let failures = self.choreographer.power_off_clients(clients).await;
                if !failures.is_empty() {
                    warn!(%host, failed = failures.len(), "not every client powered off");
                }
                Ok(())
            }
            _ => {
                self.waiter.wait_for_power(&self.cache, host, on).await;
                Ok(())
            }
        }
    }

    pub async fn select_volume_step(&self, identifier: u32) -> Result<()> {
        let volume = self
            .volume_steps
            .read()
            .get(identifier)
            .map(|step| step.volume)
            .ok_or(StateError::UnknownIdentifier(identifier))?;
        self.send(Command::SetVolume(volume)).await?;
        self.ping_activity();
        Ok(())
    }

    /// Set a raw volume, clamped into the configured range
    pub async fn set_volume(&self, volume: u32) -> Result<()> {
        let (min, max) = self.volume_range();
        self.send(Command::SetVolume(clamp_volume(volume, min, max)))
            .await?;
        self.ping_activity();
        Ok(())
    }

    pub async fn set_mute(&self, mute: bool) -> Result<()> {
        self.send(Command::SetMute(mute)).await?;
        self.ping_activity();
        Ok(())
    }

    /// Switch to a configured input or recall a preset
    ///
    /// Playback is paused before recalling a preset that is not already
    /// playing. Returns once the selection shows up as the active identifier
    /// or the convergence bound runs out.
    pub async fn select_input(&self, identifier: u32) -> Result<()> {
        if !self.config.is_primary() {
            return Err(StateError::UnknownIdentifier(identifier));
        }

        let input = self
            .inputs
            .iter()
            .find(|source| source.identifier == identifier)
            .map(|source| source.input.clone());

        match input {
            Some(input) => self.send(Command::SetInput(input)).await?,
            None => {
                let preset = self
                    .cache
                    .get::<PresetInfo>(self.host())
                    .and_then(|info| {
                        info.presets
                            .into_iter()
                            .find(|preset| preset_identifier(preset) == identifier)
                    })
                    .ok_or(StateError::UnknownIdentifier(identifier))?;

                if self.active_identifier() != Some(identifier) {
                    self.send(Command::SetPlayback(Playback::Pause)).await?;
                }
                self.send(Command::RecallPreset(preset.number)).await?;
            }
        }
        self.ping_activity();

        let converged = self
            .waiter
            .wait_until(|| self.active_identifier() == Some(identifier))
            .await;
        if !converged {
            debug!(host = %self.host(), identifier, "selection did not converge within bound");
        }
        Ok(())
    }

    pub async fn set_lip_sync(&self, on: bool) -> Result<()> {
        let delay = if on {
            LINK_AUDIO_DELAY_LIP_SYNC
        } else {
            LINK_AUDIO_DELAY_AUDIO_SYNC
        };
        self.send(Command::SetLinkAudioDelay(delay.to_string()))
            .await?;
        self.ping_activity();
        Ok(())
    }

    pub async fn set_surround_decoder(&self, on: bool) -> Result<()> {
        let program = if on {
            SOUND_PROGRAM_SURROUND_DECODER
        } else {
            SOUND_PROGRAM_STRAIGHT
        };
        self.send(Command::SetSoundProgram(program.to_string()))
            .await?;
        self.ping_activity();
        Ok(())
    }
}

#[async_trait]
impl RefreshSubscriber for MusicCastDevice {
    /// Fetch status, record what changed and push the resolved values
    async fn refresh(&self) -> Result<()> {
        let host = self.host();
        let status = self.api.fetch_status(host.as_str()).await?;
        let powered_on = status.is_powered_on();

        let previous = self.cache.replace(host, status.clone());
        let changed = previous.as_ref() != Some(&status);
        if changed {
            debug!(%host, "status changed");
        }
        self.cache.ping(host, powered_on, changed);

        if powered_on && self.config.is_primary() {
            match self.api.fetch_play_info(host.as_str()).await {
                Ok(play_info) => self.cache.set(host, play_info),
                Err(e) => warn!(%host, error = %e, "play info refresh failed"),
            }
        }

        self.push_state();
        Ok(())
    }
}
