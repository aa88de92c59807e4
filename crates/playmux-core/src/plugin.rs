//! Plugin descriptors and the in-memory registry that routes protocols to them.

use std::fmt;
use std::sync::Arc;

use crate::backend::{BackendContext, BackendInstance};
use crate::error::RegistryError;

/// Wildcard entry in a supported-protocol list.
pub const ALL_PROTOCOLS: &str = "all";

/// Plugin API version this core was built against.
pub const PLUGIN_API_VERSION: PluginVersion = PluginVersion { major: 1, minor: 0 };

/// Which capability interface a plugin implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginKind {
    PlayerBackend,
    VideoOutputBackend,
    AudioManagerBackend,
}

impl PluginKind {
    pub fn name(self) -> &'static str {
        match self {
            PluginKind::PlayerBackend => "player",
            PluginKind::VideoOutputBackend => "video-output",
            PluginKind::AudioManagerBackend => "audio-manager",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Constructor stored in a descriptor. Returning `None` means the backend could not be built.
pub type BackendFactoryFn = dyn Fn(&BackendContext) -> Option<BackendInstance> + Send + Sync;

/// Immutable capability metadata plus constructor for one backend implementation.
pub struct PluginDescriptor {
    kind: PluginKind,
    name: String,
    filename: String,
    description: String,
    version: PluginVersion,
    supported_protocols: Vec<String>,
    unsupported_protocols: Vec<String>,
    factory: Arc<BackendFactoryFn>,
}

impl PluginDescriptor {
    pub fn builder(kind: PluginKind, name: impl Into<String>) -> PluginDescriptorBuilder {
        let name = name.into();
        PluginDescriptorBuilder {
            kind,
            filename: format!("libplaymux-{name}.so"),
            name,
            description: String::new(),
            version: PLUGIN_API_VERSION,
            supported_protocols: Vec::new(),
            unsupported_protocols: Vec::new(),
            factory: Arc::new(|_| None),
        }
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> PluginVersion {
        self.version
    }

    pub fn supported_protocols(&self) -> &[String] {
        &self.supported_protocols
    }

    pub fn unsupported_protocols(&self) -> &[String] {
        &self.unsupported_protocols
    }

    /// Protocol-support predicate.
    ///
    /// A non-empty allow-list wins (with `"all"` as wildcard); an empty allow-list
    /// switches to deny-list mode. Only player backends are protocol-routed.
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        if self.kind != PluginKind::PlayerBackend {
            return false;
        }
        let protocol = protocol.to_ascii_lowercase();
        if !self.supported_protocols.is_empty() {
            return self
                .supported_protocols
                .iter()
                .any(|p| p == ALL_PROTOCOLS || *p == protocol);
        }
        !self.unsupported_protocols.iter().any(|p| *p == protocol)
    }

    /// Run the constructor.
    pub fn instantiate(&self, ctx: &BackendContext) -> Option<BackendInstance> {
        (self.factory)(ctx)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("version", &self.version)
            .field("supported_protocols", &self.supported_protocols)
            .field("unsupported_protocols", &self.unsupported_protocols)
            .finish_non_exhaustive()
    }
}

pub struct PluginDescriptorBuilder {
    kind: PluginKind,
    name: String,
    filename: String,
    description: String,
    version: PluginVersion,
    supported_protocols: Vec<String>,
    unsupported_protocols: Vec<String>,
    factory: Arc<BackendFactoryFn>,
}

impl PluginDescriptorBuilder {
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn version(mut self, major: u32, minor: u32) -> Self {
        self.version = PluginVersion { major, minor };
        self
    }

    pub fn supported_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.supported_protocols = normalize(protocols);
        self
    }

    pub fn unsupported_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.unsupported_protocols = normalize(protocols);
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&BackendContext) -> Option<BackendInstance> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    pub fn build(self) -> PluginDescriptor {
        PluginDescriptor {
            kind: self.kind,
            name: self.name,
            filename: self.filename,
            description: self.description,
            version: self.version,
            supported_protocols: self.supported_protocols,
            unsupported_protocols: self.unsupported_protocols,
            factory: self.factory,
        }
    }
}

fn normalize<I, S>(protocols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for protocol in protocols {
        let protocol = protocol.as_ref().trim().to_ascii_lowercase();
        if !protocol.is_empty() && !out.contains(&protocol) {
            out.push(protocol);
        }
    }
    out
}

/// Insertion-ordered catalog of known plugins.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<PluginDescriptor>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a descriptor.
    pub fn register(
        &mut self,
        descriptor: PluginDescriptor,
    ) -> Result<Arc<PluginDescriptor>, RegistryError> {
        if descriptor.version.major != PLUGIN_API_VERSION.major {
            return Err(RegistryError::VersionMismatch {
                name: descriptor.name.clone(),
                major: descriptor.version.major,
                expected: PLUGIN_API_VERSION.major,
            });
        }
        if descriptor.kind == PluginKind::PlayerBackend
            && descriptor.supported_protocols.is_empty()
            && descriptor.unsupported_protocols.is_empty()
        {
            return Err(RegistryError::NoProtocolPolicy(descriptor.name.clone()));
        }
        if self.find_by_filename(&descriptor.filename).is_some() {
            return Err(RegistryError::DuplicateFilename(descriptor.filename.clone()));
        }
        tracing::debug!(
            name = %descriptor.name,
            filename = %descriptor.filename,
            version = %descriptor.version,
            kind = descriptor.kind.name(),
            supported = ?descriptor.supported_protocols,
            unsupported = ?descriptor.unsupported_protocols,
            "plugin registered"
        );
        let descriptor = Arc::new(descriptor);
        self.plugins.push(descriptor.clone());
        Ok(descriptor)
    }

    pub fn find_by_filename(&self, filename: &str) -> Option<Arc<PluginDescriptor>> {
        self.plugins
            .iter()
            .find(|plugin| plugin.filename == filename)
            .cloned()
    }

    pub fn find_by_kind(&self, kind: PluginKind) -> Option<Arc<PluginDescriptor>> {
        self.plugins.iter().find(|plugin| plugin.kind == kind).cloned()
    }

    /// First registered descriptor that supports `protocol`.
    pub fn find_by_protocol(&self, protocol: &str) -> Option<Arc<PluginDescriptor>> {
        self.plugins
            .iter()
            .find(|plugin| plugin.supports_protocol(protocol))
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginDescriptor>> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> PluginDescriptorBuilder {
        PluginDescriptor::builder(PluginKind::PlayerBackend, name)
    }

    #[test]
    fn allow_list_with_wildcard_supports_anything() {
        let plugin = player("any").supported_protocols(["all"]).build();
        assert!(plugin.supports_protocol("rtsp"));
        assert!(plugin.supports_protocol("dvb"));
    }

    #[test]
    fn allow_list_takes_precedence_over_deny_list() {
        let plugin = player("web")
            .supported_protocols(["http", "HTTPS"])
            .unsupported_protocols(["http"])
            .build();
        assert!(plugin.supports_protocol("http"));
        assert!(plugin.supports_protocol("https"));
        assert!(!plugin.supports_protocol("file"));
    }

    #[test]
    fn empty_allow_list_uses_deny_list() {
        let plugin = player("generic").unsupported_protocols(["dvb"]).build();
        assert!(plugin.supports_protocol("file"));
        assert!(!plugin.supports_protocol("dvb"));
    }

    #[test]
    fn non_player_plugins_never_claim_protocols() {
        let plugin = PluginDescriptor::builder(PluginKind::VideoOutputBackend, "vo")
            .supported_protocols(["all"])
            .build();
        assert!(!plugin.supports_protocol("http"));
    }

    #[test]
    fn registration_rejects_missing_protocol_policy() {
        let mut registry = PluginRegistry::new();
        let err = registry.register(player("empty").build()).unwrap_err();
        assert_eq!(err, RegistryError::NoProtocolPolicy("empty".to_string()));
        assert!(registry.is_empty());
    }

    #[test]
    fn registration_rejects_foreign_major_version() {
        let mut registry = PluginRegistry::new();
        let err = registry
            .register(player("old").supported_protocols(["all"]).version(0, 9).build())
            .unwrap_err();
        assert!(matches!(err, RegistryError::VersionMismatch { major: 0, .. }));
    }

    #[test]
    fn registration_rejects_duplicate_filename() {
        let mut registry = PluginRegistry::new();
        registry
            .register(player("a").filename("lib.so").supported_protocols(["http"]).build())
            .unwrap();
        let err = registry
            .register(player("b").filename("lib.so").supported_protocols(["rtsp"]).build())
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateFilename("lib.so".to_string()));
    }

    #[test]
    fn lookups_follow_insertion_order() {
        let mut registry = PluginRegistry::new();
        registry
            .register(player("first").supported_protocols(["http"]).build())
            .unwrap();
        registry
            .register(player("second").supported_protocols(["all"]).build())
            .unwrap();
        registry
            .register(PluginDescriptor::builder(PluginKind::AudioManagerBackend, "am").build())
            .unwrap();

        assert_eq!(registry.find_by_protocol("http").unwrap().name(), "first");
        assert_eq!(registry.find_by_protocol("rtsp").unwrap().name(), "second");
        assert_eq!(
            registry.find_by_filename("libplaymux-second.so").unwrap().name(),
            "second"
        );
        assert_eq!(
            registry.find_by_kind(PluginKind::AudioManagerBackend).unwrap().name(),
            "am"
        );
        assert!(registry.find_by_kind(PluginKind::VideoOutputBackend).is_none());
    }
}
