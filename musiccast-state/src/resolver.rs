//! Mapping device state onto the small identifier sets a control surface shows
//!
//! Identifiers live in disjoint ranges so a single "active identifier"
//! characteristic can never confuse a volume step with an input or preset:
//!
//! | range        | meaning                         |
//! |--------------|---------------------------------|
//! | `0..100`     | volume steps                    |
//! | `100..200`   | statically configured inputs    |
//! | `200..`      | network presets from the device |

use musiccast_api::{PlayInfo, Preset, Status};

use crate::config::{InputConfig, StepConfig};

pub const INPUT_IDENTIFIER_BASE: u32 = 100;
pub const PRESET_IDENTIFIER_BASE: u32 = 200;

const STEP_ACTIVE: char = '■';
const STEP_INACTIVE: char = '□';

// ============================================================================
// Volume steps
// ============================================================================

/// One selectable volume level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeStep {
    pub id: u32,
    pub label: String,
    pub volume: u32,
}

/// Ordered volume levels for one device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeSteps(Vec<VolumeStep>);

impl VolumeSteps {
    /// Spread `config.count` levels evenly between the low and high
    /// percentages of `max_volume`, both ends included
    pub fn compute(max_volume: u32, config: &StepConfig) -> Self {
        let (low_percent, high_percent) = config.bounds();
        let count = config.count.max(2);
        let low = max_volume as f64 / 100.0 * low_percent;
        let high = max_volume as f64 / 100.0 * high_percent;
        let increment = (high - low) / (count - 1) as f64;

        let steps = (0..count)
            .map(|i| VolumeStep {
                id: i as u32,
                label: step_label(i, count),
                volume: (low + increment * i as f64).round().max(0.0) as u32,
            })
            .collect();

        Self(steps)
    }

    /// The step closest to `volume`
    ///
    /// On a tie the lower-indexed step wins.
    pub fn nearest(&self, volume: u32) -> Option<&VolumeStep> {
        let distance = |step: &VolumeStep| step.volume.abs_diff(volume);
        let mut steps = self.0.iter();
        let first = steps.next()?;
        Some(steps.fold(first, |best, step| {
            if distance(step) < distance(best) {
                step
            } else {
                best
            }
        }))
    }

    pub fn get(&self, id: u32) -> Option<&VolumeStep> {
        self.0.iter().find(|step| step.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VolumeStep> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn step_label(index: usize, count: usize) -> String {
    (0..count)
        .map(|j| if j <= index { STEP_ACTIVE } else { STEP_INACTIVE })
        .collect()
}

/// Clamp a raw device volume into the continuous range
pub fn clamp_volume(volume: u32, min: u32, max: u32) -> u32 {
    volume.clamp(min, max.max(min))
}

// ============================================================================
// Inputs and presets
// ============================================================================

/// A configured input with its assigned identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub identifier: u32,
    pub input: String,
    pub name: String,
}

/// Assign identifiers to configured inputs in order
pub fn input_sources(inputs: &[InputConfig]) -> Vec<InputSource> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| InputSource {
            identifier: INPUT_IDENTIFIER_BASE + i as u32,
            input: input.input.clone(),
            name: input.name.clone(),
        })
        .collect()
}

/// Identifier of a preset, derived from its device slot
pub fn preset_identifier(preset: &Preset) -> u32 {
    PRESET_IDENTIFIER_BASE + preset.number.saturating_sub(1)
}

/// Which identifier should show as active right now
///
/// 1. A preset whose label equals the playing track or artist, while a
///    network source is playing. This wins over a matching input because it
///    is the more specific selection.
/// 2. The configured input matching the device's live input.
/// 3. Otherwise `None`: the surface keeps whatever it showed before.
pub fn resolve_active_identifier(
    status: &Status,
    play_info: Option<&PlayInfo>,
    presets: &[Preset],
    inputs: &[InputSource],
) -> Option<u32> {
    if let Some(play_info) = play_info.filter(|p| p.is_playing_network_source()) {
        let matching = presets
            .iter()
            .find(|preset| preset.text == play_info.track || preset.text == play_info.artist);
        if let Some(preset) = matching {
            return Some(preset_identifier(preset));
        }
    }

    // live status input only; play info may still name the previous source
    inputs
        .iter()
        .find(|source| source.input == status.input)
        .map(|source| source.identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use musiccast_api::Playback;
    use proptest::prelude::*;

    fn steps(max: u32) -> VolumeSteps {
        VolumeSteps::compute(max, &StepConfig::default())
    }

    fn formula(max: u32, low: f64, high: f64, n: usize, i: usize) -> u32 {
        (low * max as f64 / 100.0 + i as f64 * (high - low) * max as f64 / 100.0 / (n - 1) as f64)
            .round() as u32
    }

    #[test]
    fn test_compute_steps_for_max_200() {
        let steps = steps(200);
        let volumes: Vec<u32> = steps.iter().map(|s| s.volume).collect();
        let expected: Vec<u32> = (0..6).map(|i| formula(200, 25.0, 65.0, 6, i)).collect();
        assert_eq!(volumes, expected);
        assert_eq!(volumes, vec![50, 66, 82, 98, 114, 130]);
    }

    #[test]
    fn test_compute_steps_rounds() {
        // 161 * 25% = 40.25, 161 * 65% = 104.65
        let volumes: Vec<u32> = steps(161).iter().map(|s| s.volume).collect();
        assert_eq!(volumes, vec![40, 53, 66, 79, 92, 105]);
    }

    #[test]
    fn test_step_labels() {
        let steps = steps(100);
        assert_eq!(steps.get(0).unwrap().label, "■□□□□□");
        assert_eq!(steps.get(3).unwrap().label, "■■■■□□");
        assert_eq!(steps.get(5).unwrap().label, "■■■■■■");
    }

    #[test]
    fn test_custom_step_count() {
        let config = StepConfig {
            count: 3,
            low_percent: Some(0.0),
            high_percent: Some(100.0),
        };
        let volumes: Vec<u32> = VolumeSteps::compute(100, &config).iter().map(|s| s.volume).collect();
        assert_eq!(volumes, vec![0, 50, 100]);
    }

    #[test]
    fn test_nearest_step() {
        let steps = steps(200);
        assert_eq!(steps.nearest(0).unwrap().id, 0);
        assert_eq!(steps.nearest(200).unwrap().id, 5);
        assert_eq!(steps.nearest(80).unwrap().id, 2);
    }

    #[test]
    fn test_nearest_tie_prefers_lower_step() {
        // 58 is 8 away from both 50 and 66
        assert_eq!(steps(200).nearest(58).unwrap().id, 0);
    }

    #[test]
    fn test_nearest_on_empty() {
        assert!(VolumeSteps::default().nearest(10).is_none());
    }

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(5, 10, 80), 10);
        assert_eq!(clamp_volume(90, 10, 80), 80);
        assert_eq!(clamp_volume(40, 10, 80), 40);
    }

    fn preset(number: u32, text: &str) -> Preset {
        Preset {
            number,
            input: "net_radio".to_string(),
            text: text.to_string(),
            display_text: text.to_string(),
        }
    }

    fn inputs() -> Vec<InputSource> {
        input_sources(&[
            InputConfig { input: "hdmi1".into(), name: "TV".into() },
            InputConfig { input: "net_radio".into(), name: "Radio".into() },
        ])
    }

    fn playing(track: &str, artist: &str) -> PlayInfo {
        PlayInfo {
            input: "net_radio".to_string(),
            playback: Playback::Play,
            track: track.to_string(),
            artist: artist.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_input_identifiers() {
        let sources = inputs();
        assert_eq!(sources[0].identifier, 100);
        assert_eq!(sources[1].identifier, 101);
        assert_eq!(preset_identifier(&preset(1, "a")), 200);
        assert_eq!(preset_identifier(&preset(4, "a")), 203);
    }

    #[test]
    fn test_preset_match_wins_over_input() {
        let status = Status { input: "net_radio".into(), ..Default::default() };
        let presets = vec![preset(1, "Jazz FM"), preset(2, "News")];
        let play_info = playing("News", "");

        let id = resolve_active_identifier(&status, Some(&play_info), &presets, &inputs());
        assert_eq!(id, Some(201));
    }

    #[test]
    fn test_preset_matches_artist() {
        let status = Status { input: "net_radio".into(), ..Default::default() };
        let presets = vec![preset(3, "Jazz FM")];
        let play_info = playing("Some song", "Jazz FM");

        let id = resolve_active_identifier(&status, Some(&play_info), &presets, &inputs());
        assert_eq!(id, Some(202));
    }

    #[test]
    fn test_paused_preset_falls_back_to_input() {
        let status = Status { input: "net_radio".into(), ..Default::default() };
        let presets = vec![preset(1, "News")];
        let play_info = PlayInfo { playback: Playback::Pause, ..playing("News", "") };

        let id = resolve_active_identifier(&status, Some(&play_info), &presets, &inputs());
        assert_eq!(id, Some(101));
    }

    #[test]
    fn test_static_input_match() {
        let status = Status { input: "hdmi1".into(), ..Default::default() };
        assert_eq!(resolve_active_identifier(&status, None, &[], &inputs()), Some(100));
    }

    #[test]
    fn test_input_match_ignores_stale_play_info() {
        let status = Status { input: "hdmi1".into(), ..Default::default() };
        let play_info = playing("Some song", "Someone");
        let presets = vec![preset(1, "News")];

        let id = resolve_active_identifier(&status, Some(&play_info), &presets, &inputs());
        assert_eq!(id, Some(100));
    }

    #[test]
    fn test_unresolved() {
        let status = Status { input: "optical".into(), ..Default::default() };
        let play_info = playing("Unknown", "Nobody");
        let presets = vec![preset(1, "News")];
        assert_eq!(
            resolve_active_identifier(&status, Some(&play_info), &presets, &inputs()),
            None
        );
    }

    proptest! {
        #[test]
        fn prop_exact_step_volume_resolves_to_itself(
            max in 1u32..1000,
            low in 0.0f64..50.0,
            high in 50.0f64..100.0,
            count in 2usize..12,
        ) {
            let config = StepConfig { count, low_percent: Some(low), high_percent: Some(high) };
            let steps = VolumeSteps::compute(max, &config);
            for step in steps.iter() {
                let resolved = steps.nearest(step.volume).unwrap();
                // equal volumes can occur on small ranges; the first one wins
                prop_assert_eq!(resolved.volume, step.volume);
                prop_assert!(resolved.id <= step.id);
            }
        }
    }
}
