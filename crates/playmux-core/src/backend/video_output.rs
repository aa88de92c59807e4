//! In-memory display output backend.

use std::collections::BTreeMap;

use crate::error::{PlayerError, PlayerResult};
use crate::plugin::{PluginDescriptor, PluginKind};

use super::{BackendInstance, VideoOutputBackend};

pub const VIDEO_OUTPUT_FILENAME: &str = "libplaymux-vo-generic.so";

const HDMI_MODES: &[&str] = &["720p60", "1080i60", "1080p30", "1080p60"];
const COMPOSITE_MODES: &[&str] = &["ntsc", "pal"];

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::builder(PluginKind::VideoOutputBackend, "vo-generic")
        .filename(VIDEO_OUTPUT_FILENAME)
        .description("Display output mode control")
        .factory(|_| Some(BackendInstance::VideoOutput(Box::new(GenericVideoOutput::new()))))
        .build()
}

pub struct GenericVideoOutput {
    modes: BTreeMap<&'static str, (&'static [&'static str], String)>,
}

impl Default for GenericVideoOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericVideoOutput {
    pub fn new() -> Self {
        let mut modes = BTreeMap::new();
        modes.insert("hdmi", (HDMI_MODES, "1080p60".to_string()));
        modes.insert("composite", (COMPOSITE_MODES, "ntsc".to_string()));
        Self { modes }
    }

    fn output(&self, output: &str) -> PlayerResult<&(&'static [&'static str], String)> {
        self.modes
            .get(output)
            .ok_or_else(|| PlayerError::invalid_param(format!("unknown video output {output}")))
    }
}

impl VideoOutputBackend for GenericVideoOutput {
    fn valid_outputs(&self) -> PlayerResult<Vec<String>> {
        Ok(self.modes.keys().map(|name| name.to_string()).collect())
    }

    fn valid_modes(&self, output: &str) -> PlayerResult<Vec<String>> {
        let (modes, _) = self.output(output)?;
        Ok(modes.iter().map(|mode| mode.to_string()).collect())
    }

    fn set_mode(&mut self, output: &str, mode: &str) -> PlayerResult<()> {
        let (modes, _) = self.output(output)?;
        if !modes.contains(&mode) {
            return Err(PlayerError::invalid_param(format!(
                "mode {mode} not valid for {output}"
            )));
        }
        if let Some((_, current)) = self.modes.get_mut(output) {
            tracing::info!(output, mode, "video output mode changed");
            *current = mode.to_string();
        }
        Ok(())
    }

    fn mode(&self, output: &str) -> PlayerResult<String> {
        Ok(self.output(output)?.1.clone())
    }
}
