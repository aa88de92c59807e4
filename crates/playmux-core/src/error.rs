//! Error types shared by sessions, backends and the dispatcher.

use thiserror::Error;

use playmux_types::ResourceType;

/// Errors surfaced to session clients.
///
/// `InvalidParam` and `BackendNotLoaded` are caller errors, `MethodNotImplemented`
/// is a capability gap of the loaded backend, `NoResource` is transient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// Malformed or missing input, rejected before touching a backend.
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// A property was read or an operation issued with no backend present.
    #[error("Pipeline backend not loaded, possible reason is SetUri failed or not be invoked")]
    BackendNotLoaded,

    /// The loaded backend does not implement this capability.
    #[error("Method not implemented: {0}")]
    MethodNotImplemented(&'static str),

    /// Admission control refused a hardware resource.
    #[error("No resource: {0}")]
    NoResource(String),

    /// Generic backend-reported failure.
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl PlayerError {
    pub fn invalid_param(message: impl Into<String>) -> Self {
        PlayerError::InvalidParam(message.into())
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        PlayerError::OperationFailed(message.into())
    }

    /// Numeric code carried by `SessionEvent::Error`.
    pub fn code(&self) -> u32 {
        match self {
            PlayerError::InvalidParam(_) => 1,
            PlayerError::BackendNotLoaded => 2,
            PlayerError::MethodNotImplemented(_) => 3,
            PlayerError::NoResource(_) => 4,
            PlayerError::OperationFailed(_) => 5,
        }
    }
}

/// Result type for session and backend operations.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Admission failure reported by the resource arbiter.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No {0} resource available")]
pub struct NoResource(pub ResourceType);

impl From<NoResource> for PlayerError {
    fn from(err: NoResource) -> Self {
        PlayerError::NoResource(err.to_string())
    }
}

/// Reasons a plugin descriptor is refused by the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Plugin {0} declares neither supported nor unsupported protocols")]
    NoProtocolPolicy(String),

    #[error("Plugin {name} was built for API {major}.x, core provides {expected}.x")]
    VersionMismatch {
        name: String,
        major: u32,
        expected: u32,
    },

    #[error("Plugin filename {0} is already registered")]
    DuplicateFilename(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_resource_converts_with_type_name() {
        let err: PlayerError = NoResource(ResourceType::VideoDecoder).into();
        assert_eq!(
            err,
            PlayerError::NoResource("No video_decoder resource available".to_string())
        );
        assert_eq!(err.code(), 4);
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            PlayerError::invalid_param("x"),
            PlayerError::BackendNotLoaded,
            PlayerError::MethodNotImplemented("play"),
            PlayerError::NoResource("x".to_string()),
            PlayerError::operation_failed("x"),
        ];
        let mut codes: Vec<u32> = errors.iter().map(PlayerError::code).collect();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
