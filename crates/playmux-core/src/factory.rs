//! Chooses a plugin for a URI and instantiates its backend.

use std::sync::Arc;

use playmux_types::SessionEvent;

use crate::backend::{
    AudioManagerBackend, BackendContext, BackendInstance, PlayerBackend, VideoOutputBackend,
};
use crate::config::ServiceConfig;
use crate::error::{PlayerError, PlayerResult};
use crate::events::EventBus;
use crate::plugin::{PluginDescriptor, PluginKind, PluginRegistry};
use crate::protocol::uri_protocol;
use crate::resource::ResourceArbiter;

/// A player backend together with the descriptor it was built from.
pub struct LoadedBackend {
    pub descriptor: Arc<PluginDescriptor>,
    pub backend: Box<dyn PlayerBackend>,
}

/// Shared dispatcher: registry, configuration and the resource arbiter.
#[derive(Clone)]
pub struct BackendFactory {
    registry: Arc<PluginRegistry>,
    config: Arc<ServiceConfig>,
    arbiter: ResourceArbiter,
}

impl BackendFactory {
    pub fn new(registry: PluginRegistry, config: ServiceConfig, arbiter: ResourceArbiter) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
            arbiter,
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn arbiter(&self) -> &ResourceArbiter {
        &self.arbiter
    }

    /// Descriptor that would serve `protocol`: configured preference first, then
    /// the first registered plugin supporting it.
    pub fn resolve(&self, protocol: &str) -> Option<Arc<PluginDescriptor>> {
        let preferred = self
            .config
            .preferred_plugin_for(protocol)
            .and_then(|filename| {
                let found = self.registry.find_by_filename(filename);
                if found.is_none() {
                    tracing::warn!(protocol, filename, "preferred plugin not registered");
                }
                found
            })
            .filter(|descriptor| descriptor.kind() == PluginKind::PlayerBackend);
        preferred.or_else(|| self.registry.find_by_protocol(protocol))
    }

    /// Build a player backend for `uri`, emitting its events on `events`.
    ///
    /// Fails with `InvalidParam` for a malformed URI; `Ok(None)` means no plugin
    /// could be resolved or its factory declined.
    pub fn make_backend_for_uri(
        &self,
        uri: &str,
        events: &EventBus<SessionEvent>,
    ) -> PlayerResult<Option<LoadedBackend>> {
        let protocol = uri_protocol(uri)
            .ok_or_else(|| PlayerError::invalid_param(format!("invalid uri {uri:?}")))?;
        let Some(descriptor) = self.resolve(&protocol) else {
            tracing::info!(protocol = %protocol, "no plugin for protocol");
            return Ok(None);
        };
        let ctx = BackendContext::new(self.arbiter.clone(), events.clone());
        match descriptor.instantiate(&ctx) {
            Some(BackendInstance::Player(backend)) => {
                tracing::debug!(
                    protocol = %protocol,
                    plugin = descriptor.name(),
                    filename = descriptor.filename(),
                    "player backend created"
                );
                Ok(Some(LoadedBackend {
                    descriptor,
                    backend,
                }))
            }
            Some(_) => {
                tracing::warn!(plugin = descriptor.name(), "factory produced a non-player backend");
                Ok(None)
            }
            None => {
                tracing::warn!(plugin = descriptor.name(), "plugin factory declined");
                Ok(None)
            }
        }
    }

    /// Instantiate the first plugin of `kind`, for backends not routed by URI.
    pub fn make_backend_for_kind(
        &self,
        kind: PluginKind,
        events: &EventBus<SessionEvent>,
    ) -> Option<BackendInstance> {
        let descriptor = self.registry.find_by_kind(kind)?;
        let ctx = BackendContext::new(self.arbiter.clone(), events.clone());
        let instance = descriptor.instantiate(&ctx)?;
        tracing::debug!(plugin = descriptor.name(), kind = kind.name(), "backend created");
        Some(instance)
    }

    pub fn make_video_output(&self) -> Option<Box<dyn VideoOutputBackend>> {
        match self.make_backend_for_kind(PluginKind::VideoOutputBackend, &EventBus::new())? {
            BackendInstance::VideoOutput(backend) => Some(backend),
            _ => None,
        }
    }

    pub fn make_audio_manager(&self) -> Option<Box<dyn AudioManagerBackend>> {
        match self.make_backend_for_kind(PluginKind::AudioManagerBackend, &EventBus::new())? {
            BackendInstance::AudioManager(backend) => Some(backend),
            _ => None,
        }
    }
}
