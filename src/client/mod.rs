//! Dify API client.

use std::sync::Arc;
use std::time::Duration;

use crate::config::DifyConfig;
use crate::errors::DifyResult;
use crate::services::{
    ChatHandler, ChatService, DefaultChatService, DefaultHealthService, HealthService,
};
use crate::transport::{ReqwestTransport, TransportConfig};
use crate::types::chat::{ChatOptions, HealthStatus};

/// The main Dify client.
///
/// Construction succeeds without an API key; the missing credential is
/// reported through `on_error` (or an unhealthy status) on first use, so a
/// UI embedding the client can still load.
pub struct DifyClient {
    config: DifyConfig,
    transport: Arc<ReqwestTransport>,
}

impl DifyClient {
    /// Creates a new Dify client with the given configuration.
    pub fn new(config: DifyConfig) -> DifyResult<Self> {
        let transport = Arc::new(ReqwestTransport::with_config(TransportConfig {
            base_url: config.base_url.clone(),
            api_key: config.api_key().unwrap_or_default().to_string(),
            timeout: config.timeout,
        })?);

        Ok(Self { config, transport })
    }

    /// Creates a new client builder.
    pub fn builder() -> DifyClientBuilder {
        DifyClientBuilder::new()
    }

    /// Creates a client from an API key.
    pub fn from_api_key(api_key: impl Into<String>) -> DifyResult<Self> {
        let config = DifyConfig::builder().api_key(api_key).build()?;
        Self::new(config)
    }

    /// Creates a client from the environment (`DIFY_API_KEY`,
    /// `DIFY_BASE_URL`, `DIFY_TIMEOUT`).
    pub fn from_env() -> DifyResult<Self> {
        let config = DifyConfig::from_env()?;
        Self::new(config)
    }

    /// Returns the chat service.
    pub fn chat(&self) -> impl ChatService + '_ {
        DefaultChatService::new(self.transport.clone(), self.config.clone())
    }

    /// Returns the health service.
    pub fn health(&self) -> impl HealthService + '_ {
        DefaultHealthService::new(self.transport.clone(), self.config.clone())
    }

    /// Sends a chat message, reporting all outcomes through `handler`.
    ///
    /// Convenience for `client.chat().send_message(...)`.
    pub async fn send_chat_message(
        &self,
        query: &str,
        options: ChatOptions,
        handler: &mut (dyn ChatHandler + Send),
    ) {
        self.chat().send_message(query, options, handler).await;
    }

    /// Probes the API once and reports the outcome as data.
    ///
    /// Convenience for `client.health().check()`.
    pub async fn check_health(&self) -> HealthStatus {
        self.health().check().await
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &DifyConfig {
        &self.config
    }
}

/// Builder for the Dify client.
#[derive(Default)]
pub struct DifyClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl DifyClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client. The API key falls back to `DIFY_API_KEY` when not
    /// set explicitly; a client without any key is still built.
    pub fn build(self) -> DifyResult<DifyClient> {
        let api_key = self.api_key.or_else(|| std::env::var("DIFY_API_KEY").ok());

        let mut config_builder = DifyConfig::builder();

        if let Some(api_key) = api_key {
            config_builder = config_builder.api_key(api_key);
        }

        if let Some(base_url) = self.base_url {
            config_builder = config_builder.base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config_builder = config_builder.timeout(timeout);
        }

        DifyClient::new(config_builder.build()?)
    }
}
