//! Dify Chat Client Library
//!
//! An async Rust client for the Dify `chat-messages` API. Streamed answers
//! are reassembled incrementally and scanned for embedded GeoJSON-like
//! payloads, which are handed to the caller for map rendering.
//!
//! # Features
//!
//! - **Streaming**: Server-sent event answers, delivered fragment by
//!   fragment in wire order, with a blocking fallback mode
//! - **GeoJSON Detection**: Tolerant extraction of geometry, feature, and
//!   feature-collection payloads embedded anywhere in free-form answers
//! - **Callback Contract**: Exactly one completion or error per request;
//!   detection always lands between the last fragment and completion
//! - **Cancellation**: Cooperative, via a caller-owned token
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dify_client::{ChatHandler, ChatOptions, DifyClient, DifyError, GeoPayload};
//!
//! struct Printer;
//!
//! impl ChatHandler for Printer {
//!     fn on_message(&mut self, delta: &str) {
//!         print!("{}", delta);
//!     }
//!     fn on_geo_json_detected(&mut self, payload: GeoPayload) {
//!         println!("\n[map] {}", payload.geo_type());
//!     }
//!     fn on_error(&mut self, error: DifyError) {
//!         eprintln!("request failed: {}", error);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DifyClient::from_env()?;
//!     let mut handler = Printer;
//!     client
//!         .send_chat_message("泉州市的边界在哪里?", ChatOptions::new(), &mut handler)
//!         .await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod geo;
pub mod services;
pub mod streaming;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{DifyClient, DifyClientBuilder};
pub use config::DifyConfig;
pub use errors::{DifyError, DifyResult};
pub use geo::{extract_geo_payload, GeoPayload, GeoType};
pub use services::{ChatHandler, ChatService, HealthService};
pub use streaming::{SseLineDecoder, StreamEvent};
pub use types::chat::{ChatOptions, ChatRequest, HealthStatus, ResponseMode};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
