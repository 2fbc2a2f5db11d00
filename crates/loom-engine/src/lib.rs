//! Graph execution engine for loom.
//!
//! - [`CompiledGraph`]: A validated graph ready to run over a message history
//! - [`ModelResolver`]: Resolves node model IDs to [`ChatModel`] implementations
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use loom_config::{GraphConfig, NodeType, START, END};
//! use loom_engine::{CompiledGraph, ModelResolver};
//! use loom_llm::LlmClient;
//!
//! let config = GraphConfig::builder("agent", "Agent")
//!     .node("agent", NodeType::Llm).done()
//!     .edge(START, "agent")
//!     .edge("agent", END)
//!     .build();
//!
//! let resolver = ModelResolver::new(Arc::new(LlmClient::new("gpt-3.5-turbo", None)));
//! let graph = CompiledGraph::compile(config, resolver)?;
//! let messages = graph.invoke(&[Message::user("Hello!")]).await?;
//! ```
//!
//! # Execution Model
//!
//! A compiled graph is a single path from `START` to `END`. Each node receives
//! the full message state and returns updates, which are merged with
//! [`merge_messages`]: updates with a known id replace, everything else is
//! appended. Caller-supplied messages are never reordered. Errors from a
//! model abort the run and are returned as-is.

use std::collections::HashMap;
use std::sync::Arc;

use loom_config::{GraphConfig, NodeConfig, NodeType, END, START};
use loom_core::{merge_messages, AgentError, Message};
use loom_llm::ChatModel;
use tracing::{debug, info, warn};

/// Default maximum number of node executions per invocation.
pub const DEFAULT_STEP_LIMIT: usize = 25;

/// Resolves model IDs to chat models.
///
/// Nodes without a model ID, or with an unknown one, get the default model.
#[derive(Clone)]
pub struct ModelResolver {
    models: HashMap<String, Arc<dyn ChatModel>>,
    default_model: Arc<dyn ChatModel>,
}

impl ModelResolver {
    /// Creates a resolver with only a default model.
    pub fn new(default: Arc<dyn ChatModel>) -> Self {
        Self { models: HashMap::new(), default_model: default }
    }

    /// Registers a model under an ID.
    pub fn with_model(mut self, id: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        self.models.insert(id.into(), model);
        self
    }

    /// Returns true if a model is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// Resolves a model ID to its model, or returns the default.
    pub fn resolve(&self, model_id: Option<&str>) -> &Arc<dyn ChatModel> {
        model_id
            .and_then(|id| self.models.get(id))
            .unwrap_or(&self.default_model)
    }
}

/// A validated graph bound to its models.
pub struct CompiledGraph {
    config: GraphConfig,
    resolver: ModelResolver,
    step_limit: usize,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("id", &self.config.id)
            .field("nodes", &self.config.nodes.len())
            .field("step_limit", &self.step_limit)
            .finish()
    }
}

impl CompiledGraph {
    /// Validates `config` and binds it to `resolver`.
    pub fn compile(config: GraphConfig, resolver: ModelResolver) -> Result<Self, AgentError> {
        config.validate().map_err(|e| AgentError::Graph(e.to_string()))?;

        for node in &config.nodes {
            if let Some(id) = node.model.as_deref().filter(|id| !resolver.contains(id)) {
                warn!("Node '{}' model '{}' not registered, using default", node.id, id);
            }
        }

        Ok(Self { config, resolver, step_limit: DEFAULT_STEP_LIMIT })
    }

    /// Overrides the maximum number of node executions per invocation.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// The underlying graph definition.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Runs the graph over `messages` and returns the updated history.
    pub async fn invoke(&self, messages: &[Message]) -> Result<Vec<Message>, AgentError> {
        info!("╔══════════════════════════════════════════════════════════════");
        info!("║ GRAPH: {}", self.config.name);
        info!("║ Messages in: {}", messages.len());
        info!("╠══════════════════════════════════════════════════════════════");

        let mut state = messages.to_vec();
        let mut step = 0usize;
        let mut current = self.successor(START)?;

        while current != END {
            step += 1;
            if step > self.step_limit {
                warn!("║ ⚠ Step limit ({}) reached at '{}'", self.step_limit, current);
                return Err(AgentError::StepLimitExceeded(self.step_limit));
            }

            let node = self
                .config
                .node(current)
                .ok_or_else(|| AgentError::Graph(format!("node '{}' missing", current)))?;

            let updates = self.execute_node(step, node, &state).await?;
            merge_messages(&mut state, updates);
            current = self.successor(current)?;
        }

        info!("║ Graph complete: {} messages", state.len());
        info!("╚══════════════════════════════════════════════════════════════");
        Ok(state)
    }

    fn successor(&self, from: &str) -> Result<&str, AgentError> {
        self.config
            .next(from)
            .ok_or_else(|| AgentError::Graph(format!("no edge leaves '{}'", from)))
    }

    /// Executes a single node and returns its state updates.
    async fn execute_node(
        &self,
        step: usize,
        node: &NodeConfig,
        state: &[Message],
    ) -> Result<Vec<Message>, AgentError> {
        let model = self.resolver.resolve(node.model.as_deref());

        info!("╠──────────────────────────────────────────────────────────────");
        info!("║ [{}] NODE: {} ({})", step, node.id, node.node_type);
        info!("║     Model: {}", model.name());

        let start = std::time::Instant::now();
        info!("║     → {}", node.node_type.action_label());

        let reply = match node.node_type {
            NodeType::Llm => {
                let request = with_prompt(node.prompt.as_deref(), state);
                debug!("║     Sending {} messages", request.len());
                model.invoke(&request).await?
            }
        };

        info!("║     ← Response: {} chars", reply.content.len());
        info!("║     ✓ Completed in {:?}", start.elapsed());

        Ok(vec![reply])
    }
}

/// Prefixes the conversation with the node's system prompt, if any.
fn with_prompt(prompt: Option<&str>, state: &[Message]) -> Vec<Message> {
    let Some(prompt) = prompt.filter(|p| !p.is_empty()) else {
        return state.to_vec();
    };

    let mut request = Vec::with_capacity(state.len() + 1);
    request.push(Message::system(prompt));
    request.extend_from_slice(state);
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use loom_core::MessageRole;

    /// Replies with the number of messages it saw and records each request.
    struct CountingModel {
        label: &'static str,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl CountingModel {
        fn new(label: &'static str) -> Arc<Self> {
            Arc::new(Self { label, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl ChatModel for CountingModel {
        async fn invoke(&self, messages: &[Message]) -> Result<Message, AgentError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(Message::assistant(format!("{} saw {}", self.label, messages.len())))
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn invoke(&self, _messages: &[Message]) -> Result<Message, AgentError> {
            Err(AgentError::LlmError("rate limited".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn agent_config() -> GraphConfig {
        GraphConfig::builder("agent", "Agent")
            .node("agent", NodeType::Llm)
            .done()
            .edge(START, "agent")
            .edge("agent", END)
            .build()
    }

    #[tokio::test]
    async fn empty_history_yields_single_reply() {
        let model = CountingModel::new("m");
        let graph = CompiledGraph::compile(agent_config(), ModelResolver::new(model.clone())).unwrap();

        let out = graph.invoke(&[]).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].role, MessageRole::Assistant);
        assert_eq!(out[0].content, "m saw 0");
    }

    #[tokio::test]
    async fn appends_reply_and_keeps_prefix() {
        let model = CountingModel::new("m");
        let graph = CompiledGraph::compile(agent_config(), ModelResolver::new(model.clone())).unwrap();
        let history = vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("how are you?"),
        ];

        let out = graph.invoke(&history).await.unwrap();

        assert_eq!(out.len(), history.len() + 1);
        assert_eq!(&out[..history.len()], history.as_slice());
        assert_eq!(model.seen.lock().unwrap()[0], history);
    }

    #[tokio::test]
    async fn prompt_is_sent_but_not_stored() {
        let model = CountingModel::new("m");
        let config = GraphConfig::builder("agent", "Agent")
            .node("agent", NodeType::Llm)
            .prompt("Be brief.")
            .done()
            .edge(START, "agent")
            .edge("agent", END)
            .build();
        let graph = CompiledGraph::compile(config, ModelResolver::new(model.clone())).unwrap();

        let out = graph.invoke(&[Message::user("hi")]).await.unwrap();

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|m| m.role != MessageRole::System));
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0][0], Message::system("Be brief."));
        assert_eq!(seen[0].len(), 2);
    }

    #[tokio::test]
    async fn model_error_propagates() {
        let graph = CompiledGraph::compile(agent_config(), ModelResolver::new(Arc::new(FailingModel))).unwrap();

        let err = graph.invoke(&[Message::user("hi")]).await.unwrap_err();

        assert!(matches!(err, AgentError::LlmError(msg) if msg == "rate limited"));
    }

    #[tokio::test]
    async fn nodes_run_in_path_order_with_resolved_models() {
        let default = CountingModel::new("default");
        let special = CountingModel::new("special");
        let config = GraphConfig::builder("chain", "Chain")
            .node("first", NodeType::Llm)
            .done()
            .node("second", NodeType::Llm)
            .model("special")
            .done()
            .edge(START, "first")
            .edge("first", "second")
            .edge("second", END)
            .build();
        let resolver = ModelResolver::new(default.clone()).with_model("special", special.clone());
        let graph = CompiledGraph::compile(config, resolver).unwrap();

        let out = graph.invoke(&[Message::user("hi")]).await.unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[1].content, "default saw 1");
        assert_eq!(out[2].content, "special saw 2");
    }

    #[tokio::test]
    async fn step_limit_aborts_long_paths() {
        let config = GraphConfig::builder("chain", "Chain")
            .node("a", NodeType::Llm)
            .done()
            .node("b", NodeType::Llm)
            .done()
            .edge(START, "a")
            .edge("a", "b")
            .edge("b", END)
            .build();
        let graph = CompiledGraph::compile(config, ModelResolver::new(CountingModel::new("m")))
            .unwrap()
            .with_step_limit(1);

        let err = graph.invoke(&[]).await.unwrap_err();

        assert!(matches!(err, AgentError::StepLimitExceeded(1)));
    }

    #[test]
    fn compile_rejects_invalid_graph() {
        let config = GraphConfig::builder("broken", "Broken")
            .node("agent", NodeType::Llm)
            .done()
            .edge(START, "agent")
            .build();

        let err = CompiledGraph::compile(config, ModelResolver::new(CountingModel::new("m"))).unwrap_err();

        assert!(matches!(err, AgentError::Graph(_)));
    }

    #[test]
    fn resolver_falls_back_to_default() {
        let resolver = ModelResolver::new(CountingModel::new("default"))
            .with_model("special", CountingModel::new("special"));

        assert_eq!(resolver.resolve(None).name(), "default");
        assert_eq!(resolver.resolve(Some("missing")).name(), "default");
        assert_eq!(resolver.resolve(Some("special")).name(), "special");
    }
}
