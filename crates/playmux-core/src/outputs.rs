//! Service-wide display and audio output control.

use playmux_types::{AudioOutputState, AudioOutputType};

use crate::backend::{AudioManagerBackend, VideoOutputBackend};
use crate::error::{PlayerError, PlayerResult};
use crate::factory::BackendFactory;

/// Display output modes, backed by the first registered video-output plugin.
pub struct VideoOutput {
    backend: Option<Box<dyn VideoOutputBackend>>,
}

impl VideoOutput {
    pub fn new(factory: &BackendFactory) -> Self {
        let backend = factory.make_video_output();
        if backend.is_none() {
            tracing::warn!("no video output backend available");
        }
        Self { backend }
    }

    fn backend(&self) -> PlayerResult<&dyn VideoOutputBackend> {
        self.backend.as_deref().ok_or(PlayerError::BackendNotLoaded)
    }

    fn backend_mut(&mut self) -> PlayerResult<&mut (dyn VideoOutputBackend + 'static)> {
        self.backend.as_deref_mut().ok_or(PlayerError::BackendNotLoaded)
    }

    pub fn valid_outputs(&self) -> PlayerResult<Vec<String>> {
        self.backend()?.valid_outputs()
    }

    pub fn valid_modes(&self, output: &str) -> PlayerResult<Vec<String>> {
        self.backend()?.valid_modes(output)
    }

    pub fn set_mode(&mut self, output: &str, mode: &str) -> PlayerResult<()> {
        self.backend_mut()?.set_mode(output, mode)
    }

    pub fn mode(&self, output: &str) -> PlayerResult<String> {
        self.backend()?.mode(output)
    }
}

/// Physical audio outputs, backed by the first registered audio-manager plugin.
pub struct AudioManager {
    backend: Option<Box<dyn AudioManagerBackend>>,
}

impl AudioManager {
    pub fn new(factory: &BackendFactory) -> Self {
        let backend = factory.make_audio_manager();
        if backend.is_none() {
            tracing::warn!("no audio manager backend available");
        }
        Self { backend }
    }

    fn backend(&self) -> PlayerResult<&dyn AudioManagerBackend> {
        self.backend.as_deref().ok_or(PlayerError::BackendNotLoaded)
    }

    fn backend_mut(&mut self) -> PlayerResult<&mut (dyn AudioManagerBackend + 'static)> {
        self.backend.as_deref_mut().ok_or(PlayerError::BackendNotLoaded)
    }

    pub fn set_volume(&mut self, output: AudioOutputType, volume: i32) -> PlayerResult<()> {
        self.backend_mut()?.set_volume(output, volume)
    }

    pub fn volume(&self, output: AudioOutputType) -> PlayerResult<i32> {
        self.backend()?.volume(output)
    }

    pub fn set_state(&mut self, output: AudioOutputType, state: AudioOutputState) -> PlayerResult<()> {
        self.backend_mut()?.set_state(output, state)
    }

    pub fn state(&self, output: AudioOutputType) -> PlayerResult<AudioOutputState> {
        self.backend()?.state(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendInstance;
    use crate::builtin::register_builtin_plugins;
    use crate::config::ServiceConfig;
    use crate::plugin::{PluginDescriptor, PluginKind, PluginRegistry};
    use crate::resource::ResourceArbiter;

    fn factory(registry: PluginRegistry) -> BackendFactory {
        BackendFactory::new(registry, ServiceConfig::default(), ResourceArbiter::default())
    }

    #[test]
    fn builtin_outputs_are_available() {
        let mut registry = PluginRegistry::new();
        register_builtin_plugins(&mut registry).unwrap();
        let factory = factory(registry);

        let mut video = VideoOutput::new(&factory);
        assert!(video.valid_outputs().unwrap().contains(&"hdmi".to_string()));
        video.set_mode("hdmi", "720p60").unwrap();
        assert_eq!(video.mode("hdmi").unwrap(), "720p60");

        let mut audio = AudioManager::new(&factory);
        audio.set_volume(AudioOutputType::Spdif, 20).unwrap();
        assert_eq!(audio.volume(AudioOutputType::Spdif), Ok(20));
    }

    #[test]
    fn missing_backend_is_reported() {
        let factory = factory(PluginRegistry::new());
        let video = VideoOutput::new(&factory);
        assert_eq!(video.valid_outputs(), Err(PlayerError::BackendNotLoaded));
        let audio = AudioManager::new(&factory);
        assert_eq!(
            audio.state(AudioOutputType::Hdmi),
            Err(PlayerError::BackendNotLoaded)
        );
    }

    struct MuteOnly;
    impl AudioManagerBackend for MuteOnly {
        fn set_state(&mut self, _: AudioOutputType, _: AudioOutputState) -> PlayerResult<()> {
            Ok(())
        }
    }

    #[test]
    fn partial_backend_reports_capability_gap() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                PluginDescriptor::builder(PluginKind::AudioManagerBackend, "mute-only")
                    .factory(|_| Some(BackendInstance::AudioManager(Box::new(MuteOnly))))
                    .build(),
            )
            .unwrap();
        let mut audio = AudioManager::new(&factory(registry));
        audio
            .set_state(AudioOutputType::Hdmi, AudioOutputState::Off)
            .unwrap();
        assert_eq!(
            audio.volume(AudioOutputType::Hdmi),
            Err(PlayerError::MethodNotImplemented("volume"))
        );
    }
}
