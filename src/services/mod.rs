//! Service layer for the Dify API.

mod chat;
mod health;

pub use chat::{ChatHandler, ChatService, DefaultChatService, CHAT_MESSAGES_PATH};
pub use health::{DefaultHealthService, HealthService};
