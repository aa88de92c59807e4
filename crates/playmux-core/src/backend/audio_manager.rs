//! In-memory audio output backend.

use std::collections::HashMap;

use playmux_types::{AudioOutputState, AudioOutputType};

use crate::error::{PlayerError, PlayerResult};
use crate::plugin::{PluginDescriptor, PluginKind};

use super::{AudioManagerBackend, BackendInstance};

pub const AUDIO_MANAGER_FILENAME: &str = "libplaymux-am-generic.so";

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::builder(PluginKind::AudioManagerBackend, "am-generic")
        .filename(AUDIO_MANAGER_FILENAME)
        .description("Physical audio output volume and power control")
        .factory(|_| Some(BackendInstance::AudioManager(Box::new(GenericAudioManager::default()))))
        .build()
}

#[derive(Default)]
pub struct GenericAudioManager {
    volumes: HashMap<AudioOutputType, i32>,
    states: HashMap<AudioOutputType, AudioOutputState>,
}

impl AudioManagerBackend for GenericAudioManager {
    fn set_volume(&mut self, output: AudioOutputType, volume: i32) -> PlayerResult<()> {
        if !(0..=100).contains(&volume) {
            return Err(PlayerError::invalid_param(format!(
                "volume {volume} outside 0..=100"
            )));
        }
        self.volumes.insert(output, volume);
        Ok(())
    }

    fn volume(&self, output: AudioOutputType) -> PlayerResult<i32> {
        Ok(self.volumes.get(&output).copied().unwrap_or(50))
    }

    fn set_state(&mut self, output: AudioOutputType, state: AudioOutputState) -> PlayerResult<()> {
        tracing::info!(output = ?output, state = ?state, "audio output state changed");
        self.states.insert(output, state);
        Ok(())
    }

    fn state(&self, output: AudioOutputType) -> PlayerResult<AudioOutputState> {
        Ok(self
            .states
            .get(&output)
            .copied()
            .unwrap_or(AudioOutputState::On))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_are_tracked_independently() {
        let mut am = GenericAudioManager::default();
        am.set_volume(AudioOutputType::Hdmi, 30).unwrap();
        am.set_state(AudioOutputType::Spdif, AudioOutputState::Off)
            .unwrap();
        assert_eq!(am.volume(AudioOutputType::Hdmi), Ok(30));
        assert_eq!(am.volume(AudioOutputType::I2s0), Ok(50));
        assert_eq!(am.state(AudioOutputType::Spdif), Ok(AudioOutputState::Off));
        assert_eq!(am.state(AudioOutputType::Hdmi), Ok(AudioOutputState::On));
        assert!(am.set_volume(AudioOutputType::I2s1, -1).is_err());
    }
}
