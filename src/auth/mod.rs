//! Authentication module for the Dify client.
//!
//! Handles bearer-token authentication and header generation. Dify app keys
//! are passed as `Authorization: Bearer <key>` on every request.

use std::collections::HashMap;

/// Trait for authentication managers.
pub trait AuthManager: Send + Sync {
    /// Returns the authentication headers.
    fn get_headers(&self) -> HashMap<String, String>;

    /// Validates the API key format.
    fn validate_api_key(&self) -> Result<(), String>;
}

/// Bearer token authentication manager.
pub struct BearerAuthManager {
    api_key: String,
}

impl BearerAuthManager {
    /// Creates a new bearer auth manager with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Returns true when a key is present at all.
    pub fn has_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl AuthManager for BearerAuthManager {
    fn get_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        headers
    }

    fn validate_api_key(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API key cannot be empty".to_string());
        }

        // Dify app keys are prefixed "app-" but we only check length: other
        // key kinds (dataset keys, self-hosted setups) use different shapes.
        if self.api_key.len() < 8 {
            return Err("API key appears to be too short".to_string());
        }

        Ok(())
    }
}

impl std::fmt::Debug for BearerAuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthManager")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
