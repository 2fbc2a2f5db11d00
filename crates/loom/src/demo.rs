//! The demo agent: one model call between `START` and `END`.

use std::sync::Arc;

use loom_config::{GraphConfig, NodeType, END, START};
use loom_core::{AgentError, ModelConfig};
use loom_engine::{CompiledGraph, ModelResolver};
use loom_llm::{ChatModel, LlmClient};

/// ID of the single processing node.
pub const AGENT_NODE: &str = "agent";

/// Model used by [`default_graph`].
pub fn default_model() -> ModelConfig {
    ModelConfig {
        id: "openai-gpt35".into(),
        name: "GPT-3.5 Turbo (OpenAI)".into(),
        model: "gpt-3.5-turbo".into(),
        api_base: None,
        temperature: Some(0.0),
    }
}

/// Definition of the demo graph.
pub fn config() -> GraphConfig {
    GraphConfig::builder("agent", "Agent")
        .description("Forwards the conversation to a chat model and appends its reply")
        .node(AGENT_NODE, NodeType::Llm)
        .done()
        .edge(START, AGENT_NODE)
        .edge(AGENT_NODE, END)
        .build()
}

/// Compiles the demo graph around any chat model.
pub fn graph(model: Arc<dyn ChatModel>) -> Result<CompiledGraph, AgentError> {
    CompiledGraph::compile(config(), ModelResolver::new(model))
}

/// Compiles the demo graph against OpenAI (`OPENAI_API_KEY` must be set at call time).
pub fn default_graph() -> Result<CompiledGraph, AgentError> {
    graph(Arc::new(LlmClient::from_config(&default_model())))
}
