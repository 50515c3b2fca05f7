//! Error types for the encoders.

use thiserror::Error;

/// Result type alias for encoder operations.
pub type Result<T> = std::result::Result<T, EncoderError>;

/// Errors that can occur while configuring or calling an encoder.
#[derive(Error, Debug)]
pub enum EncoderError {
    /// A required setting was neither passed explicitly nor found in the
    /// environment.
    #[error("no {field} provided: pass it explicitly or set {env_var}")]
    Configuration {
        field: &'static str,
        env_var: &'static str,
    },

    /// The HTTP transport could not be built.
    #[error("provider client failed to initialize: {source}")]
    ClientInit {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The provider rejected or failed the request.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A provider failure that is not worth retrying.
    #[error("provider call failed: {source}")]
    ProviderCall {
        #[source]
        source: ProviderError,
    },

    /// The provider answered but gave back nothing usable.
    #[error("no embeddings returned: {0}")]
    EmptyResponse(String),

    /// Invalid input from the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EncoderError {
    /// Whether this error happened while building the encoder.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::ClientInit { .. })
    }

    /// Whether the failed call may succeed if attempted again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// A failure reported by, or on the way to, the embedding provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Non-success HTTP status.
    #[error("status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport: {0}")]
    Transport(#[source] reqwest::Error),
}

impl ProviderError {
    /// Rate limits, timeouts, conflicts, server errors and dropped
    /// connections are transient. Everything else is a contract problem.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => matches!(*status, 408 | 409 | 429 | 500..=599),
            Self::Transport(err) => err.is_timeout() || err.is_connect() || err.is_request(),
        }
    }
}
