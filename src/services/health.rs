//! Health-check probe.
//!
//! A single low-cost blocking request that reports reachability as data.
//! One attempt, no retries, and it never fails: every problem becomes an
//! unhealthy status with a human-readable reason.

use async_trait::async_trait;
use serde_json::Map;

use crate::config::DifyConfig;
use crate::errors::DifyError;
use crate::services::chat::CHAT_MESSAGES_PATH;
use crate::transport::HttpTransport;
use crate::types::chat::{BlockingChatResponse, ChatRequest, HealthStatus, ResponseMode};

/// Query text sent by the probe.
const HEALTH_QUERY: &str = "ping";

/// User identifier the probe reports itself as.
const HEALTH_USER: &str = "health-check";

/// Health check service trait.
#[async_trait]
pub trait HealthService: Send + Sync {
    /// Probes the API once. Total: always returns a status.
    async fn check(&self) -> HealthStatus;
}

/// Default implementation of the health service.
pub struct DefaultHealthService<T> {
    transport: T,
    config: DifyConfig,
}

impl<T> DefaultHealthService<T> {
    /// Creates a new health service over a transport.
    pub fn new(transport: T, config: DifyConfig) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl<T> HealthService for DefaultHealthService<T>
where
    T: HttpTransport + Send + Sync,
{
    async fn check(&self) -> HealthStatus {
        if !self.config.has_api_key() {
            return HealthStatus::unhealthy("Dify API key is not configured");
        }

        let request = ChatRequest {
            inputs: Map::new(),
            query: HEALTH_QUERY.to_string(),
            response_mode: ResponseMode::Blocking,
            user: HEALTH_USER.to_string(),
        };
        let body = match serde_json::to_vec(&request) {
            Ok(body) => body,
            Err(e) => return HealthStatus::unhealthy(e.to_string()),
        };

        match self.transport.post(CHAT_MESSAGES_PATH, body).await {
            Ok(bytes) => match serde_json::from_slice::<BlockingChatResponse>(&bytes) {
                Ok(response) => HealthStatus::healthy(response.answer),
                Err(e) => HealthStatus::unhealthy(format!("invalid response body: {}", e)),
            },
            Err(DifyError::Authentication { .. }) => HealthStatus::unhealthy("HTTP 401"),
            Err(DifyError::Api { status, .. }) => {
                HealthStatus::unhealthy(format!("HTTP {}", status))
            }
            Err(e) => HealthStatus::unhealthy(e.to_string()),
        }
    }
}
