//! Scripted player backend for session and manager tests.

use std::sync::{Arc, Mutex};

use playmux_types::{PlayerState, Proxy, ResourceType, ScaleMode, Target, VideoRect};

use crate::backend::{BackendCore, BackendInstance, PlayerBackend};
use crate::config::ServiceConfig;
use crate::error::PlayerResult;
use crate::factory::BackendFactory;
use crate::plugin::{PluginDescriptor, PluginKind, PluginRegistry};
use crate::resource::{ResourceArbiter, ResourceCapacity};

/// What the mock backends saw, shared with the test body.
#[derive(Debug, Default)]
pub(crate) struct Observed {
    pub calls: Vec<&'static str>,
    pub created: usize,
    pub volume: Option<i32>,
    pub uri: Option<String>,
    pub proxy: Option<Proxy>,
}

pub(crate) type SharedObserved = Arc<Mutex<Observed>>;

pub(crate) struct MockBackend {
    core: BackendCore,
    observed: SharedObserved,
    volume: i32,
}

impl MockBackend {
    fn record_call(&self, call: &'static str) {
        self.observed.lock().unwrap().calls.push(call);
    }

    fn transition(&mut self, to: PlayerState) -> PlayerResult<()> {
        self.core.acquire(&[(ResourceType::VideoDecoder, None)])?;
        self.core.suspended = false;
        self.core.set_state(to);
        Ok(())
    }
}

impl PlayerBackend for MockBackend {
    fn set_uri(&mut self, uri: &str) -> PlayerResult<()> {
        self.record_call("set_uri");
        self.observed.lock().unwrap().uri = Some(uri.to_string());
        self.core.uri = Some(uri.to_string());
        if self.core.player_state == PlayerState::Null {
            self.core.set_state(PlayerState::Stopped);
        }
        Ok(())
    }

    fn play(&mut self) -> PlayerResult<()> {
        self.record_call("play");
        self.transition(PlayerState::Playing)
    }

    fn pause(&mut self) -> PlayerResult<()> {
        self.record_call("pause");
        self.transition(PlayerState::Paused)
    }

    fn stop(&mut self) -> PlayerResult<()> {
        self.record_call("stop");
        self.core.stop();
        Ok(())
    }

    fn suspend(&mut self) -> PlayerResult<()> {
        if self.core.suspended {
            return Ok(());
        }
        let snapshot = self.core.snapshot_position(0);
        self.core.stop();
        self.core.mark_suspended(snapshot);
        Ok(())
    }

    fn restore(&mut self) -> PlayerResult<()> {
        self.core.check_restorable()?;
        self.transition(PlayerState::Playing)?;
        self.core.mark_restored();
        Ok(())
    }

    fn set_volume(&mut self, volume: i32) -> PlayerResult<()> {
        self.record_call("set_volume");
        self.observed.lock().unwrap().volume = Some(volume);
        self.volume = volume;
        Ok(())
    }

    fn volume(&self) -> PlayerResult<i32> {
        Ok(self.volume)
    }

    fn set_mute(&mut self, _mute: bool) -> PlayerResult<()> {
        self.record_call("set_mute");
        Ok(())
    }

    fn set_scale_mode(&mut self, _mode: ScaleMode) -> PlayerResult<()> {
        self.record_call("set_scale_mode");
        Ok(())
    }

    fn set_video_size(&mut self, _rect: VideoRect) -> PlayerResult<()> {
        self.record_call("set_video_size");
        Ok(())
    }

    fn set_proxy(&mut self, proxy: &Proxy) -> PlayerResult<()> {
        self.record_call("set_proxy");
        self.observed.lock().unwrap().proxy = Some(proxy.clone());
        Ok(())
    }

    fn set_target(&mut self, _target: &Target) -> PlayerResult<()> {
        self.record_call("set_target");
        Ok(())
    }

    fn set_subtitle_uri(&mut self, _uri: &str) -> PlayerResult<()> {
        self.record_call("set_subtitle_uri");
        Ok(())
    }

    fn player_state(&self) -> PlayerResult<PlayerState> {
        Ok(self.core.player_state)
    }

    fn current_uri(&self) -> PlayerResult<String> {
        Ok(self.core.require_uri()?.to_string())
    }

    fn title(&self) -> PlayerResult<String> {
        Ok("Mock Title".to_string())
    }
}

/// Player descriptor whose backends need one video decoder to pause or play.
pub(crate) fn mock_descriptor(
    name: &str,
    supported: &[&str],
    unsupported: &[&str],
    observed: &SharedObserved,
) -> PluginDescriptor {
    let observed = observed.clone();
    PluginDescriptor::builder(PluginKind::PlayerBackend, name)
        .supported_protocols(supported.iter().copied())
        .unsupported_protocols(unsupported.iter().copied())
        .factory(move |ctx| {
            observed.lock().unwrap().created += 1;
            Some(BackendInstance::Player(Box::new(MockBackend {
                core: BackendCore::new(ctx),
                observed: observed.clone(),
                volume: 0,
            })))
        })
        .build()
}

pub(crate) fn factory_with(
    descriptors: Vec<PluginDescriptor>,
    config: &str,
    capacity: ResourceCapacity,
) -> BackendFactory {
    let mut registry = PluginRegistry::new();
    for descriptor in descriptors {
        registry.register(descriptor).unwrap();
    }
    let config: ServiceConfig = toml::from_str(config).unwrap();
    BackendFactory::new(registry, config, ResourceArbiter::new(&capacity))
}
