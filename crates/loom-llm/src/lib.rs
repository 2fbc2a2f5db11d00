//! Chat model abstraction for loom.
//!
//! - [`ChatModel`]: Trait every model-backed graph node calls
//! - [`LlmClient`]: OpenAI-compatible implementation
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use loom_core::Message;
//! use loom_llm::{ChatModel, LlmClient};
//!
//! let client = LlmClient::new("gpt-3.5-turbo", None).with_temperature(0.0);
//! let reply = client.invoke(&[Message::user("Hello!")]).await?;
//! println!("{}", reply.content);
//! ```

mod client;

use async_trait::async_trait;
use loom_core::{AgentError, Message};

pub use client::{LlmClient, LlmMetrics, LlmResponse};

/// A model that answers a conversation with one message.
///
/// Implementations must not mutate or reorder the messages they are given.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends the conversation and returns the generated message.
    async fn invoke(&self, messages: &[Message]) -> Result<Message, AgentError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}
