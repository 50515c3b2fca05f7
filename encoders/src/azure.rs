//! Azure OpenAI embedding encoder.

use std::error::Error;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::{debug, error, info};

use crate::Embedding;
use crate::config::{AzureOpenAIConfig, ResolvedConfig};
use crate::error::{EncoderError, ProviderError, Result};
use crate::provider::{
    DenseEncoder, EmbeddingRequest, EmbeddingResponse, status_error, validate_docs,
};
use crate::retry::RetryPolicy;

/// Encoder backed by an Azure OpenAI embeddings deployment.
///
/// Both transports are built up front and reused for every call. Use
/// [`DenseEncoder::encode`] from synchronous code and
/// [`DenseEncoder::aencode`] from async code; the blocking transport must not
/// be driven from inside an async runtime.
#[derive(Debug)]
pub struct AzureOpenAIEncoder {
    config: ResolvedConfig,
    url: Url,
    client: reqwest::blocking::Client,
    async_client: reqwest::Client,
    retry: RetryPolicy,
}

impl AzureOpenAIEncoder {
    /// Create an encoder, resolving missing settings from the environment.
    pub fn new(config: AzureOpenAIConfig) -> Result<Self> {
        let resolved = config
            .resolve()
            .inspect_err(|e| error!("Azure OpenAI encoder misconfigured: {e}"))?;
        Self::from_resolved(resolved)
    }

    /// Create an encoder entirely from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(AzureOpenAIConfig::new())
    }

    /// Create an encoder from an already resolved configuration.
    pub fn from_resolved(config: ResolvedConfig) -> Result<Self> {
        let url = embeddings_url(&config).map_err(client_init)?;
        let client = build_blocking_client().map_err(client_init)?;
        let async_client = reqwest::Client::builder().build().map_err(client_init)?;
        let retry = RetryPolicy::new(config.max_retries, config.backoff_unit);

        info!(
            "Azure OpenAI encoder ready: deployment {}, model {}",
            config.deployment, config.model
        );

        Ok(Self {
            config,
            url,
            client,
            async_client,
            retry,
        })
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Full URL requests are sent to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Retry policy applied to each call.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn request<'a>(&'a self, docs: &'a [String]) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            input: docs,
            model: &self.config.model,
            dimensions: self.config.dimensions,
        }
    }

    fn call_blocking(&self, docs: &[String]) -> Result<Vec<Embedding>> {
        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", self.config.api_key.as_str())
            .json(&self.request(docs))
            .send()
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().map_err(transport)?;
        handle_response(status, &body, docs.len())
    }

    async fn call_async(&self, docs: &[String]) -> Result<Vec<Embedding>> {
        let response = self
            .async_client
            .post(self.url.clone())
            .header("api-key", self.config.api_key.as_str())
            .json(&self.request(docs))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        handle_response(status, &body, docs.len())
    }
}

#[async_trait]
impl DenseEncoder for AzureOpenAIEncoder {
    fn name(&self) -> &str {
        &self.config.deployment
    }

    fn score_threshold(&self) -> f32 {
        self.config.score_threshold
    }

    fn encode(&self, docs: &[String]) -> Result<Vec<Embedding>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        validate_docs(docs)?;

        debug!("Encoding {} documents with deployment {}", docs.len(), self.config.deployment);
        let embeddings = self.retry.run_blocking(|| self.call_blocking(docs))?;
        info!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    async fn aencode(&self, docs: &[String]) -> Result<Vec<Embedding>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        validate_docs(docs)?;

        debug!("Encoding {} documents with deployment {}", docs.len(), self.config.deployment);
        let embeddings = self.retry.run_async(|| self.call_async(docs)).await?;
        info!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}

fn handle_response(status: StatusCode, body: &str, expected: usize) -> Result<Vec<Embedding>> {
    if !status.is_success() {
        return Err(status_error(status.as_u16(), body).into());
    }

    let response = EmbeddingResponse::parse(body)?;
    if let Some(tokens) = response.total_tokens() {
        debug!(
            "Provider reported {tokens} tokens for model {}",
            response.model().unwrap_or("unknown")
        );
    }
    response.into_embeddings(expected)
}

fn embeddings_url(
    config: &ResolvedConfig,
) -> std::result::Result<Url, Box<dyn Error + Send + Sync>> {
    let mut url = Url::parse(&format!(
        "{}/openai/deployments/{}/embeddings",
        config.endpoint, config.deployment
    ))?;
    url.query_pairs_mut()
        .append_pair("api-version", &config.api_version);
    Ok(url)
}

/// reqwest's blocking client starts its own runtime and panics when built
/// from inside another one, so it is always built on a plain thread.
fn build_blocking_client()
-> std::result::Result<reqwest::blocking::Client, Box<dyn Error + Send + Sync>> {
    std::thread::spawn(|| reqwest::blocking::Client::builder().build())
        .join()
        .map_err(|_| "blocking client builder panicked")?
        .map_err(Into::into)
}

fn client_init(source: impl Into<Box<dyn Error + Send + Sync>>) -> EncoderError {
    let source = source.into();
    error!("Azure OpenAI client failed to initialize: {source}");
    EncoderError::ClientInit { source }
}

fn transport(err: reqwest::Error) -> EncoderError {
    EncoderError::Provider(ProviderError::Transport(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> AzureOpenAIConfig {
        AzureOpenAIConfig::new()
            .with_api_key("test-key")
            .with_endpoint("https://example.openai.azure.com/")
            .with_api_version("2024-02-01")
            .with_model("text-embedding-3-small")
            .with_deployment("embed-small")
    }

    #[test]
    fn test_url_includes_deployment_and_version() {
        let encoder = AzureOpenAIEncoder::new(config()).unwrap();
        assert_eq!(
            encoder.url().as_str(),
            "https://example.openai.azure.com/openai/deployments/embed-small/embeddings?api-version=2024-02-01"
        );
        assert_eq!(encoder.name(), "embed-small");
    }

    #[test]
    fn test_retry_policy_follows_config() {
        let encoder = AzureOpenAIEncoder::new(config().with_max_retries(5)).unwrap();
        assert_eq!(encoder.retry_policy().max_retries(), 5);
        assert_eq!(encoder.retry_policy().max_attempts(), 6);
    }

    #[test]
    fn test_invalid_endpoint_fails_construction() {
        let err = AzureOpenAIEncoder::new(config().with_endpoint("not a url")).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, EncoderError::ClientInit { .. }));
    }

    #[test]
    fn test_empty_batch_skips_provider() {
        let encoder = AzureOpenAIEncoder::new(config()).unwrap();
        assert!(encoder.encode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_blank_document_is_invalid_input() {
        let encoder = AzureOpenAIEncoder::new(config()).unwrap();
        let err = encoder
            .encode(&["hi".to_string(), String::new()])
            .unwrap_err();
        assert!(matches!(err, EncoderError::InvalidInput(_)));
    }

    #[test]
    fn test_aencode_empty_batch_skips_provider() {
        let encoder = AzureOpenAIEncoder::new(config()).unwrap();
        let vectors = tokio_test::block_on(encoder.aencode(&[])).unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn test_construction_inside_runtime() {
        let encoder = AzureOpenAIEncoder::new(config()).unwrap();
        assert!(encoder.aencode(&[]).await.unwrap().is_empty());
    }
}
