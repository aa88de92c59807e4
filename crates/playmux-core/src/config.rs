//! Service configuration file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use playmux_types::{Proxy, ResourceType};

use crate::plugin::ALL_PROTOCOLS;
use crate::resource::ResourceCapacity;

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    /// Protocol to preferred plugin filename; `all` applies to any protocol.
    pub player_plugin_preference: Option<toml::Table>,
    pub resource_definition: Option<ResourceDefinition>,
    /// Proxy pushed into every newly loaded backend.
    pub proxy: Option<Proxy>,
    pub watchdog: Option<WatchdogConfig>,
}

/// Units per resource type; omitted entries keep their default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDefinition {
    pub plane: Option<u32>,
    pub hw_clock: Option<u32>,
    pub video_decoder: Option<u32>,
    pub audio_decoder: Option<u32>,
    pub tuner: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_period_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    2_500
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl WatchdogConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ServiceConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<ServiceConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        if let Some(watchdog) = cfg.watchdog.as_ref() {
            anyhow::ensure!(watchdog.period_ms > 0, "watchdog period_ms must be positive");
        }
        Ok(cfg)
    }

    /// Preferred plugin filename for `protocol`.
    ///
    /// The first entry, in file order, whose key is the protocol or `all` and whose
    /// value is a string wins.
    pub fn preferred_plugin_for(&self, protocol: &str) -> Option<&str> {
        let Some(group) = self.player_plugin_preference.as_ref() else {
            tracing::debug!(protocol, "no player plugin preference configured");
            return None;
        };
        group
            .iter()
            .filter(|(key, _)| key.as_str() == protocol || key.as_str() == ALL_PROTOCOLS)
            .find_map(|(_, value)| value.as_str())
    }

    pub fn resource_capacity(&self) -> ResourceCapacity {
        let mut capacity = ResourceCapacity::default();
        if let Some(def) = self.resource_definition.as_ref() {
            let entries = [
                (ResourceType::Plane, def.plane),
                (ResourceType::HwClock, def.hw_clock),
                (ResourceType::VideoDecoder, def.video_decoder),
                (ResourceType::AudioDecoder, def.audio_decoder),
                (ResourceType::Tuner, def.tuner),
            ];
            for (kind, units) in entries {
                if let Some(units) = units {
                    capacity = capacity.with(kind, units);
                }
            }
        }
        capacity
    }

    pub fn watchdog(&self) -> WatchdogConfig {
        self.watchdog.unwrap_or_default()
    }
}
