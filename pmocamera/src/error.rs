//! Error types for the camera client

use pmossdp::SsdpError;

/// Result type alias for camera operations
pub type Result<T> = std::result::Result<T, CameraError>;

/// Errors that can occur when driving a camera
///
/// Connection-phase errors ([`Ssdp`](Self::Ssdp), [`NotConnected`](Self::NotConnected))
/// abort the operation. Device-state errors (see [`CameraError::is_device_state`])
/// are the ones a command entry point turns into a non-fatal
/// [`CallOutcome::Failed`](crate::CallOutcome::Failed).
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// Discovery or device description failure
    #[error(transparent)]
    Ssdp(#[from] SsdpError),

    /// A command was issued before `connect()` completed
    #[error("Camera not yet connected")]
    NotConnected,

    /// Network or serialization failure on the control endpoint
    #[error("RPC transport error on {method}: {message}")]
    RpcTransport { method: String, message: String },

    /// Well-formed response with an unexpected shape
    #[error("Unexpected response to {method}: {reason}")]
    RpcProtocol { method: String, reason: String },

    /// The camera answered with an `error` envelope
    #[error("{method} failed on the camera with error {code}: {message}")]
    Device {
        method: String,
        code: i64,
        message: String,
    },

    /// `getMethodTypes` returned something that is not a method list
    #[error("Invalid capability list: {0}")]
    Capability(String),

    /// Wrong number of arguments for a declared method
    #[error("Too {} parameters provided to {method}. {expected} were expected but {given} were given.", few_or_many(.given, .expected))]
    Arity {
        method: String,
        expected: usize,
        given: usize,
    },

    /// Argument does not match the declared type tag
    #[error("Argument {index} of {method} with value {value} must be of type {expected}")]
    Type {
        method: String,
        index: usize,
        value: serde_json::Value,
        expected: String,
    },

    /// Method not declared by the camera
    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    /// The method is unavailable and nothing is known to make it available
    #[error("The '{method}' call is not currently available: {reason}")]
    UnresolvablePrecondition { method: String, reason: String },

    /// The precondition ran but the method is still not available
    #[error("The '{method}' call is still unavailable after calling '{precondition}'")]
    StillUnavailable { method: String, precondition: String },

    /// Caller-level misuse
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Endpoint URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

fn few_or_many(given: &usize, expected: &usize) -> &'static str {
    if given < expected { "few" } else { "many" }
}

impl CameraError {
    pub fn rpc_transport(method: &str, message: impl ToString) -> Self {
        Self::RpcTransport {
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    pub fn rpc_protocol(method: &str, reason: impl Into<String>) -> Self {
        Self::RpcProtocol {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unresolvable(method: &str, reason: impl Into<String>) -> Self {
        Self::UnresolvablePrecondition {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    /// Failures caused by what the camera is doing right now rather than by
    /// how it was called. These are the only errors a command entry point
    /// reports as a non-fatal outcome.
    pub fn is_device_state(&self) -> bool {
        matches!(
            self,
            Self::RpcTransport { .. } | Self::Device { .. } | Self::StillUnavailable { .. }
        )
    }

    /// Errors raised while connecting
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Ssdp(_) | Self::NotConnected)
    }
}
