//! # Encoders
//!
//! This crate turns batches of text into dense embedding vectors for the
//! semantic router.
//!
//! ## Features
//!
//! - **Azure OpenAI**: Embeddings from an Azure OpenAI deployment
//! - **Bounded Retries**: Exponential backoff on transient provider failures
//! - **Two Call Paths**: Blocking and async encoding with identical semantics
//! - **Layered Configuration**: Explicit settings with environment fallback
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Encoders                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  AzureOpenAIConfig ──► AzureOpenAIEncoder ──► Vec<Embedding>    │
//! │         │                     │                                 │
//! │         ▼                     ▼                                 │
//! │  explicit / env          RetryPolicy (sleep | tokio::sleep)     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use semroute_encoders::{AzureOpenAIEncoder, DenseEncoder};
//!
//! let encoder = AzureOpenAIEncoder::from_env()?;
//! let vectors = encoder.aencode(&["hello there".to_string()]).await?;
//! ```

pub mod azure;
pub mod config;
pub mod error;
pub mod provider;
pub mod retry;

pub use azure::AzureOpenAIEncoder;
pub use config::{AzureOpenAIConfig, ResolvedConfig, resolve_setting};
pub use error::{EncoderError, ProviderError, Result};
pub use provider::DenseEncoder;
pub use retry::RetryPolicy;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
