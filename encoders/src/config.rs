//! Encoder configuration.
//!
//! Every required setting is resolved in a fixed order: the explicit value
//! on the config, then a named environment variable, then failure.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EncoderError, Result};
use crate::retry::DEFAULT_MAX_RETRIES;

/// Environment variable holding the Azure OpenAI API key.
pub const API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";

/// Environment variable holding the Azure OpenAI endpoint.
pub const ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";

/// Environment variable holding the Azure OpenAI API version.
pub const API_VERSION_ENV: &str = "AZURE_OPENAI_API_VERSION";

/// Environment variable holding the embedding model name.
pub const MODEL_ENV: &str = "AZURE_OPENAI_MODEL";

/// Deployment used when none is configured.
pub const DEFAULT_DEPLOYMENT: &str = "text-embedding-3-small";

/// Resolve a required setting from `explicit`, falling back to `env_var`.
///
/// Empty strings are treated as missing.
pub fn resolve_setting(
    field: &'static str,
    explicit: Option<&str>,
    env_var: &'static str,
) -> Result<String> {
    resolve_setting_with(field, explicit, env_var, |key| std::env::var(key).ok())
}

/// Same as [`resolve_setting`] with a caller-provided environment lookup.
pub fn resolve_setting_with<F>(
    field: &'static str,
    explicit: Option<&str>,
    env_var: &'static str,
    lookup: F,
) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| lookup(env_var).filter(|value| !value.is_empty()))
        .ok_or(EncoderError::Configuration { field, env_var })
}

/// Configuration for the Azure OpenAI encoder.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureOpenAIConfig {
    /// API key. Falls back to `AZURE_OPENAI_API_KEY`.
    pub api_key: Option<String>,

    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    /// Falls back to `AZURE_OPENAI_ENDPOINT`.
    pub azure_endpoint: Option<String>,

    /// API version. Falls back to `AZURE_OPENAI_API_VERSION`.
    pub api_version: Option<String>,

    /// Embedding model. Falls back to `AZURE_OPENAI_MODEL`.
    pub model: Option<String>,

    /// Deployment name. Defaults to [`DEFAULT_DEPLOYMENT`].
    pub deployment_name: Option<String>,

    /// Output dimensions, for models that support shortening.
    pub dimensions: Option<u32>,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Similarity threshold routes built on this encoder start from.
    pub score_threshold: f32,

    /// Base backoff in milliseconds; retry `j` waits `backoff_unit_ms * 2^j`.
    pub backoff_unit_ms: u64,
}

impl Default for AzureOpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            azure_endpoint: None,
            api_version: None,
            model: None,
            deployment_name: None,
            dimensions: None,
            max_retries: DEFAULT_MAX_RETRIES,
            score_threshold: 0.82,
            backoff_unit_ms: 1000,
        }
    }
}

impl fmt::Debug for AzureOpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAIConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("azure_endpoint", &self.azure_endpoint)
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("deployment_name", &self.deployment_name)
            .field("dimensions", &self.dimensions)
            .field("max_retries", &self.max_retries)
            .field("score_threshold", &self.score_threshold)
            .field("backoff_unit_ms", &self.backoff_unit_ms)
            .finish()
    }
}

impl AzureOpenAIConfig {
    /// Create a configuration that resolves everything from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.azure_endpoint = Some(endpoint.into());
        self
    }

    /// Set the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the deployment name.
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment_name = Some(deployment.into());
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base backoff.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit_ms = u64::try_from(unit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against a caller-provided environment lookup.
    ///
    /// Settings are checked in order: API key, endpoint, API version, model.
    /// The first missing one is reported.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<ResolvedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key =
            resolve_setting_with("API key", self.api_key.as_deref(), API_KEY_ENV, &lookup)?;
        let endpoint = resolve_setting_with(
            "endpoint",
            self.azure_endpoint.as_deref(),
            ENDPOINT_ENV,
            &lookup,
        )?;
        let api_version = resolve_setting_with(
            "API version",
            self.api_version.as_deref(),
            API_VERSION_ENV,
            &lookup,
        )?;
        let model = resolve_setting_with("model", self.model.as_deref(), MODEL_ENV, &lookup)?;

        let deployment = self
            .deployment_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string());

        Ok(ResolvedConfig {
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version,
            model,
            deployment,
            dimensions: self.dimensions,
            max_retries: self.max_retries,
            score_threshold: self.score_threshold,
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
        })
    }
}

/// A configuration with every required setting present.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub(crate) api_key: String,
    pub(crate) endpoint: String,
    pub(crate) api_version: String,
    pub(crate) model: String,
    pub(crate) deployment: String,
    pub(crate) dimensions: Option<u32>,
    pub(crate) max_retries: u32,
    pub(crate) score_threshold: f32,
    pub(crate) backoff_unit: Duration,
}

impl ResolvedConfig {
    /// Endpoint without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// API version string.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Model name sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Deployment the requests are routed to.
    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("deployment", &self.deployment)
            .field("dimensions", &self.dimensions)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn full_env() -> impl Fn(&str) -> Option<String> {
        env(&[
            (API_KEY_ENV, "env-key"),
            (ENDPOINT_ENV, "https://env.openai.azure.com/"),
            (API_VERSION_ENV, "2024-02-01"),
            (MODEL_ENV, "text-embedding-3-small"),
        ])
    }

    #[test]
    fn test_explicit_value_wins() {
        let value =
            resolve_setting_with("API key", Some("explicit"), API_KEY_ENV, full_env()).unwrap();
        assert_eq!(value, "explicit");
    }

    #[test]
    fn test_env_fallback() {
        let value = resolve_setting_with("API key", None, API_KEY_ENV, full_env()).unwrap();
        assert_eq!(value, "env-key");
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let err = resolve_setting_with("model", Some(""), MODEL_ENV, env(&[(MODEL_ENV, "")]))
            .unwrap_err();
        assert!(matches!(
            err,
            EncoderError::Configuration {
                field: "model",
                env_var: MODEL_ENV
            }
        ));
    }

    #[test]
    fn test_resolve_reports_each_missing_field() {
        let cases = [
            (API_KEY_ENV, "API key"),
            (ENDPOINT_ENV, "endpoint"),
            (API_VERSION_ENV, "API version"),
            (MODEL_ENV, "model"),
        ];

        for (missing, field) in cases {
            let full = full_env();
            let lookup = |key: &str| if key == missing { None } else { full(key) };
            let err = AzureOpenAIConfig::new().resolve_with(lookup).unwrap_err();
            match err {
                EncoderError::Configuration { field: got, env_var } => {
                    assert_eq!(got, field);
                    assert_eq!(env_var, missing);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let resolved = AzureOpenAIConfig::new().resolve_with(full_env()).unwrap();

        assert_eq!(resolved.endpoint(), "https://env.openai.azure.com");
        assert_eq!(resolved.deployment(), DEFAULT_DEPLOYMENT);
        assert_eq!(resolved.max_retries, 3);
        assert_eq!(resolved.backoff_unit, Duration::from_secs(1));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = AzureOpenAIConfig::new().with_api_key("super-secret");
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{"model": "text-embedding-3-large", "max_retries": 5}"#;
        let config: AzureOpenAIConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.model.as_deref(), Some("text-embedding-3-large"));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_unit_ms, 1000);
    }
}
