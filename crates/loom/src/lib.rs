//! # Loom: message-graph agent runtime
//!
//! Loom runs conversations through small directed graphs of model calls.
//! A graph is a single path from [`START`] to [`END`]; each node receives the
//! message history and its reply is merged back in.
//!
//! ## Quick Start: Demo agent
//!
//! ```rust,ignore
//! use loom::prelude::*;
//!
//! let graph = loom::demo::default_graph()?;
//! let messages = graph.invoke(&[Message::user("Hello!")]).await?;
//! println!("{}", messages.last().unwrap().content);
//! ```
//!
//! ## Quick Start: Builder API
//!
//! ```rust,ignore
//! use loom::prelude::*;
//!
//! let config = GraphConfig::builder("support", "Support Agent")
//!     .node("agent", NodeType::Llm)
//!         .prompt("You are a support assistant.")
//!         .done()
//!     .edge(START, "agent")
//!     .edge("agent", END)
//!     .build();
//!
//! let resolver = ModelResolver::new(Arc::new(LlmClient::new("gpt-3.5-turbo", None)));
//! let graph = CompiledGraph::compile(config, resolver)?;
//! ```
//!
//! ## Crate Structure
//!
//! | Crate | Description |
//! |-------|-------------|
//! | [`loom_config`] | Graph schema, builder, validation |
//! | [`loom_core`] | Error types, messages, model config |
//! | [`loom_engine`] | Graph compilation and execution |
//! | [`loom_llm`] | Chat model trait and OpenAI client |

pub mod demo;

// Re-export config types
pub use loom_config::{
    ConfigError, EdgeConfig, GraphBuilder, GraphConfig, NodeBuilder, NodeConfig, NodeType, END,
    START,
};

// Re-export core types
pub use loom_core::{merge_messages, AgentError, Message, MessageRole, ModelConfig};

// Re-export engine
pub use loom_engine::{CompiledGraph, ModelResolver, DEFAULT_STEP_LIMIT};

// Re-export LLM clients
pub use loom_llm::{ChatModel, LlmClient, LlmMetrics, LlmResponse};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use loom::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Core types
    pub use crate::{AgentError, Message, MessageRole, ModelConfig};

    // Config types
    pub use crate::{GraphConfig, NodeType, END, START};

    // Engine
    pub use crate::{CompiledGraph, ModelResolver};

    // LLM
    pub use crate::{ChatModel, LlmClient};
}
