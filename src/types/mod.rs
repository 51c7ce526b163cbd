//! Type definitions for the Dify API.

pub mod chat;

pub use chat::{
    BlockingChatResponse, ChatMessageChunk, ChatOptions, ChatRequest, HealthStatus, ResponseMode,
};
