//! Plugins shipped with the service.

use crate::backend::{audio_manager, dvb, generic, video_output};
use crate::error::RegistryError;
use crate::plugin::PluginRegistry;

/// Register every builtin plugin.
pub fn register_builtin_plugins(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    registry.register(dvb::descriptor())?;
    registry.register(generic::descriptor())?;
    registry.register(video_output::descriptor())?;
    registry.register(audio_manager::descriptor())?;
    Ok(())
}
