//! HTTP transport implementation using reqwest.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;

use super::ByteStream;
use crate::auth::{AuthManager, BearerAuthManager};
use crate::errors::{ApiErrorResponse, DifyError, DifyResult};

/// HTTP transport trait for the Dify client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a JSON POST and returns the full response body.
    async fn post(&self, path: &str, body: Vec<u8>) -> DifyResult<Bytes>;

    /// Sends a JSON POST and returns the response body as a byte stream.
    async fn post_stream(&self, path: &str, body: Vec<u8>) -> DifyResult<ByteStream>;
}

/// Configuration for `ReqwestTransport`.
pub struct TransportConfig {
    /// Base URL for the API.
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Request timeout.
    pub timeout: Duration,
}

/// Reqwest-based HTTP transport implementation.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    auth: BearerAuthManager,
}

impl ReqwestTransport {
    /// Creates a new transport with configuration.
    ///
    /// An absent key is accepted: the services report it per request before
    /// the transport is used. A present key must pass the shape check.
    pub fn with_config(config: TransportConfig) -> DifyResult<Self> {
        let auth = BearerAuthManager::new(config.api_key);
        if auth.has_key() {
            auth.validate_api_key()
                .map_err(|message| DifyError::Configuration { message })?;
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| DifyError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url,
            auth,
        })
    }

    /// Creates a new transport with a custom client.
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            auth: BearerAuthManager::new(api_key),
        }
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_request(&self, url: &str, body: Vec<u8>) -> reqwest::RequestBuilder {
        let mut request = self.client.post(url);
        for (key, value) in self.auth.get_headers() {
            request = request.header(key, value);
        }
        request.body(body)
    }

    /// Maps a non-2xx response to a Dify error.
    fn map_http_error(status: u16, body: &Bytes) -> DifyError {
        let api_error: Option<ApiErrorResponse> = serde_json::from_slice(body).ok();
        let message = api_error
            .map(|e| e.message)
            .unwrap_or_else(|| format!("HTTP {} error", status));

        if status == 401 {
            DifyError::Authentication { message }
        } else {
            DifyError::Api {
                status,
                message,
                body: Some(String::from_utf8_lossy(body).to_string()),
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, path: &str, body: Vec<u8>) -> DifyResult<Bytes> {
        let url = self.build_url(path);
        tracing::debug!(%url, "sending blocking request");

        let response = self.build_request(&url, body).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        if status >= 400 {
            return Err(Self::map_http_error(status, &body));
        }

        Ok(body)
    }

    async fn post_stream(&self, path: &str, body: Vec<u8>) -> DifyResult<ByteStream> {
        let url = self.build_url(path);
        tracing::debug!(%url, "opening streaming request");

        let response = self.build_request(&url, body).send().await?;
        let status = response.status().as_u16();

        if status >= 400 {
            let body = response.bytes().await?;
            return Err(Self::map_http_error(status, &body));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| DifyError::Stream {
                message: e.to_string(),
            })
        });

        Ok(Box::pin(stream))
    }
}
