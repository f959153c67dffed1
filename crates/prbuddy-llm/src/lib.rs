//! LLM Client: talks to a locally hosted chat-completion backend.

pub mod client;
pub mod error;

pub use client::{LlmClient, ModelDescriptor};
pub use error::LlmError;
