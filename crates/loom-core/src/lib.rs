//! Core domain types and error definitions for loom.
//!
//! This crate provides the fundamental types shared across the loom workspace:
//!
//! - [`AgentError`]: Error type for graph and LLM operations
//! - [`Message`] and [`MessageRole`]: Conversation message types
//! - [`ModelConfig`]: LLM model configuration
//!
//! # Example
//!
//! ```rust
//! use loom_core::{Message, MessageRole, ModelConfig};
//!
//! let msg = Message::user("Hello!");
//! assert_eq!(msg.role, MessageRole::User);
//!
//! let model = ModelConfig {
//!     id: "default".to_string(),
//!     name: "GPT-3.5 Turbo".to_string(),
//!     model: "gpt-3.5-turbo".to_string(),
//!     api_base: None,
//!     temperature: Some(0.0),
//! };
//! assert_eq!(model.model, "gpt-3.5-turbo");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during graph execution or LLM operations.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM API request failed.
    #[error("LLM request failed: {0}")]
    LlmError(String),

    /// The graph definition could not be compiled.
    #[error("Invalid graph: {0}")]
    Graph(String),

    /// Execution took more steps than the graph allows.
    #[error("Step limit of {0} exceeded")]
    StepLimitExceeded(usize),
}

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions for the model.
    System,
    /// Message from the user.
    User,
    /// Message from the assistant/LLM.
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Optional stable identifier. Updates carrying a known id replace the
    /// earlier message instead of appending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { id: None, role: MessageRole::System, content: content.into() }
    }

    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { id: None, role: MessageRole::User, content: content.into() }
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { id: None, role: MessageRole::Assistant, content: content.into() }
    }

    /// Attaches an identifier to this message.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Merges `updates` into `messages`.
///
/// An update whose id matches an existing message replaces it in place;
/// everything else is appended in order.
pub fn merge_messages(messages: &mut Vec<Message>, updates: Vec<Message>) {
    for update in updates {
        let existing = update
            .id
            .as_deref()
            .and_then(|id| messages.iter().position(|m| m.id.as_deref() == Some(id)));

        match existing {
            Some(idx) => messages[idx] = update,
            None => messages.push(update),
        }
    }
}

/// Configuration for an LLM model.
///
/// Used to specify which model a graph node calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Unique identifier for this model configuration.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// The actual model identifier (e.g., "gpt-3.5-turbo").
    pub model: String,
    /// Optional API base URL for self-hosted or alternative endpoints.
    pub api_base: Option<String>,
    /// Sampling temperature; provider default when unset.
    #[serde(default)]
    pub temperature: Option<f32>,
}
