//! Chat message types for the Dify `chat-messages` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_USER;

/// Response mode requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Server-sent event stream of incremental answer fragments.
    Streaming,
    /// Single blocking response carrying the full answer.
    Blocking,
}

/// Request body for the `chat-messages` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Caller-supplied context variables for the workflow or agent.
    pub inputs: Map<String, Value>,
    /// The user's query. Expected to be non-empty; enforcement is left to
    /// the server.
    pub query: String,
    /// Streaming or blocking response mode.
    pub response_mode: ResponseMode,
    /// Opaque session identifier, stable for the lifetime of a conversation.
    pub user: String,
}

/// One decoded streaming event, as delivered on a `data:` line.
///
/// Dify emits `{"event":"message","answer":"..."}` fragments plus bookkeeping
/// events (`message_end`, `ping`, ...) that carry no answer text. Unknown
/// fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageChunk {
    /// Event kind, e.g. `message` or `message_end`.
    #[serde(default)]
    pub event: Option<String>,
    /// Incremental answer text, when present.
    #[serde(default)]
    pub answer: Option<String>,
}

/// Response body of a blocking `chat-messages` request.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockingChatResponse {
    /// The full answer text, when the request produced one.
    #[serde(default)]
    pub answer: Option<String>,
}

/// Options controlling a single chat request.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Context variables passed to the workflow or agent.
    pub inputs: Map<String, Value>,
    /// Whether to use the streaming response mode. Defaults to true.
    pub stream: bool,
    /// User identifier for server-side session isolation.
    pub user: String,
    /// Cooperative cancellation token; when it fires the request is aborted
    /// and reported as [`crate::DifyError::Cancelled`].
    pub cancel: Option<CancellationToken>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            inputs: Map::new(),
            stream: true,
            user: DEFAULT_USER.to_string(),
            cancel: None,
        }
    }
}

impl ChatOptions {
    /// Creates options with the defaults: streaming on, empty inputs,
    /// placeholder user, no cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a context variable.
    pub fn input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Replaces the full set of context variables.
    pub fn inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets the response mode.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Sets the user identifier.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Attaches a cancellation token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns true when the attached token, if any, has already fired.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

/// Result of a health-check probe. Never an error: failures are reported in
/// `reason`.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the probe succeeded.
    pub ok: bool,
    /// The answer text returned by the probe, on success.
    pub answer: Option<String>,
    /// Human-readable failure reason, when `ok` is false.
    pub reason: Option<String>,
}

impl HealthStatus {
    /// Creates a healthy status.
    pub fn healthy(answer: Option<String>) -> Self {
        Self {
            ok: true,
            answer,
            reason: None,
        }
    }

    /// Creates an unhealthy status with a reason.
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            answer: None,
            reason: Some(reason.into()),
        }
    }
}
