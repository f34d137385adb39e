//! HTTP request handlers.

pub mod chats;
pub mod generate;
pub mod health;
pub mod jobs;
pub mod usage;
pub mod webhooks;
