//! Configuration module for the Dify client.
//!
//! Provides configuration management for the API credential, base URL and
//! request timeout. The API key is optional at construction time: a client
//! built without one still works for offline use, and the missing key is
//! reported through `on_error` on the first request instead of failing
//! construction.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::errors::{DifyError, DifyResult};

/// Default base URL for the Dify API.
pub const DEFAULT_BASE_URL: &str = "https://api.dify.ai";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default user identifier sent with requests when the caller supplies none.
pub const DEFAULT_USER: &str = "web-user";

/// Configuration for the Dify client.
#[derive(Clone)]
pub struct DifyConfig {
    /// API key for authentication (stored securely; may be absent).
    pub(crate) api_key: Option<SecretString>,
    /// Base URL for API requests.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl DifyConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> DifyConfigBuilder {
        DifyConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DIFY_API_KEY` (optional): API key for authentication; when unset,
    ///   a warning is logged and every request reports a configuration error
    /// - `DIFY_BASE_URL` (optional): custom base URL
    /// - `DIFY_TIMEOUT` (optional): request timeout in seconds
    pub fn from_env() -> DifyResult<Self> {
        let mut builder = DifyConfigBuilder::new();

        match std::env::var("DIFY_API_KEY") {
            Ok(api_key) => builder = builder.api_key(api_key),
            Err(_) => {
                tracing::warn!("DIFY_API_KEY not set; chat requests will fail until configured");
            }
        }

        if let Ok(base_url) = std::env::var("DIFY_BASE_URL") {
            builder = builder.base_url(base_url);
        }

        if let Ok(timeout_str) = std::env::var("DIFY_TIMEOUT") {
            if let Ok(timeout_secs) = timeout_str.parse::<u64>() {
                builder = builder.timeout(Duration::from_secs(timeout_secs));
            }
        }

        builder.build()
    }

    /// Returns the API key, if one is configured.
    pub(crate) fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret().as_str())
    }

    /// Returns true when an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Debug for DifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifyConfig")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for `DifyConfig`.
#[derive(Default)]
pub struct DifyConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl DifyConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> DifyResult<DifyConfig> {
        // An empty key and an absent key mean the same thing.
        let api_key = self
            .api_key
            .filter(|key| !key.is_empty())
            .map(SecretString::new);

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(DifyError::Configuration {
                message: "Base URL must start with http:// or https://".to_string(),
            });
        }

        Ok(DifyConfig {
            api_key,
            base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}
