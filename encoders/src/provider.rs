//! Dense encoder trait and the embeddings wire format.
//!
//! Provider payloads are decoded into typed structs at the boundary. Anything
//! that does not decode, or decodes without usable data, becomes a single
//! [`EncoderError::EmptyResponse`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Embedding;
use crate::error::{EncoderError, ProviderError, Result};

/// Trait for encoders that turn a batch of texts into dense vectors.
///
/// Both call paths return exactly one vector per input, in input order.
#[async_trait]
pub trait DenseEncoder: Send + Sync {
    /// Get the name of this encoder (the deployment or model in use).
    fn name(&self) -> &str;

    /// Default similarity threshold for routes encoded with this encoder.
    fn score_threshold(&self) -> f32;

    /// Encode `docs`, blocking the calling thread during backoff waits.
    fn encode(&self, docs: &[String]) -> Result<Vec<Embedding>>;

    /// Encode `docs`, yielding to the async scheduler during backoff waits.
    async fn aencode(&self, docs: &[String]) -> Result<Vec<Embedding>>;
}

/// Reject inputs the provider would refuse anyway.
pub(crate) fn validate_docs(docs: &[String]) -> Result<()> {
    if let Some(position) = docs.iter().position(|doc| doc.is_empty()) {
        return Err(EncoderError::InvalidInput(format!(
            "document at position {position} is empty"
        )));
    }
    Ok(())
}

/// Request body for the embeddings endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingRequest<'a> {
    pub input: &'a [String],
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}

/// Response body from the embeddings endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl EmbeddingResponse {
    /// Decode a response body.
    pub(crate) fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| EncoderError::EmptyResponse(format!("malformed response: {e}")))
    }

    /// Model reported by the provider, if any.
    pub(crate) fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Tokens billed for the request, if reported.
    pub(crate) fn total_tokens(&self) -> Option<u64> {
        self.usage.as_ref().map(|u| u.total_tokens)
    }

    /// Extract the vectors in input order, checking one per input.
    pub(crate) fn into_embeddings(self, expected: usize) -> Result<Vec<Embedding>> {
        let mut data = self.data;
        if data.is_empty() {
            return Err(EncoderError::EmptyResponse(
                "response contained no data".to_string(),
            ));
        }
        if data.len() != expected {
            return Err(EncoderError::EmptyResponse(format!(
                "expected {expected} embeddings, got {}",
                data.len()
            )));
        }

        data.sort_by_key(|item| item.index);
        if data.iter().enumerate().any(|(i, item)| item.index != i) {
            return Err(EncoderError::EmptyResponse(
                "response indices do not cover the input".to_string(),
            ));
        }

        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

/// Build a provider error from a non-success status and its body.
pub(crate) fn status_error(status: u16, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail {
                code: Some(code),
                message,
            },
        }) => format!("{code}: {message}"),
        Ok(ErrorBody { error }) => error.message,
        Err(_) => body.to_string(),
    };
    ProviderError::Status { status, message }
}
