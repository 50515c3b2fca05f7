//! Error types for the semantic router.

use thiserror::Error;

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors that can occur while adding routes or inspecting sync state.
#[derive(Error, Debug)]
pub enum RouterError {
    /// Encoder error.
    #[error("encoder error: {0}")]
    Encoder(#[from] semroute_encoders::EncoderError),

    /// Index error.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Malformed input, such as batches that do not line up.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reported by a route index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The parallel sequences of a batch have different lengths.
    #[error(
        "batch is not aligned: {embeddings} embeddings, {route_names} route names, \
         {utterances} utterances, {function_schemas} schemas, {metadata} metadata entries"
    )]
    LengthMismatch {
        embeddings: usize,
        route_names: usize,
        utterances: usize,
        function_schemas: usize,
        metadata: usize,
    },

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure inside an external index implementation.
    #[error("index backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
