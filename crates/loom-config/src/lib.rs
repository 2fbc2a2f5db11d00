//! Graph definition schema for loom.
//!
//! This crate defines the data structures for loom graphs:
//!
//! - [`GraphConfig`]: Complete graph definition with nodes and edges
//! - [`GraphBuilder`]: Fluent API for building graphs programmatically
//! - [`NodeConfig`]: Configuration for individual graph nodes
//! - [`EdgeConfig`]: A directed connection between two endpoints
//! - [`START`] and [`END`]: Reserved entry and exit endpoints
//!
//! # Loading from JSON
//!
//! ```rust,ignore
//! use loom_config::GraphConfig;
//!
//! let config = GraphConfig::from_file("agent.json")?;
//! ```
//!
//! # Builder API
//!
//! ```rust
//! use loom_config::{GraphConfig, NodeType, START, END};
//!
//! let config = GraphConfig::builder("agent", "Agent")
//!     .description("Single model call")
//!     .node("agent", NodeType::Llm)
//!         .model("gpt-3.5-turbo")
//!         .done()
//!     .edge(START, "agent")
//!     .edge("agent", END)
//!     .build();
//!
//! assert_eq!(config.nodes.len(), 1);
//! assert_eq!(config.edges.len(), 2);
//! assert!(config.validate().is_ok());
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Entry endpoint of every graph.
pub const START: &str = "input";

/// Exit endpoint of every graph.
pub const END: &str = "output";

/// Errors that can occur when loading or validating a graph definition.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read a definition file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON definition.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Graph validation failed.
    #[error("Invalid graph '{graph_id}': {message}")]
    Validation {
        graph_id: String,
        message: String,
    },

    /// An edge references a node that does not exist.
    #[error("Node '{node_id}' not found in graph '{graph_id}'")]
    NodeNotFound {
        graph_id: String,
        node_id: String,
    },
}

impl ConfigError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Creates a validation error.
    pub fn validation(graph_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            graph_id: graph_id.into(),
            message: message.into(),
        }
    }
}

/// Types of nodes available in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Sends the current messages to a model and appends its reply.
    Llm,
}

impl FromStr for NodeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "llm" => Ok(Self::Llm),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Llm => "llm",
        };
        write!(f, "{}", s)
    }
}

impl NodeType {
    /// Returns a human-readable label for logging.
    #[doc(hidden)]
    pub fn action_label(&self) -> &'static str {
        match self {
            NodeType::Llm => "Calling LLM",
        }
    }
}

/// Configuration for a single node in a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique identifier for this node within the graph.
    pub id: String,
    /// The type of node determining its execution behavior.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Optional model ID to use for this node (overrides default).
    #[serde(default)]
    pub model: Option<String>,
    /// System prompt sent ahead of the conversation. Not stored in the state.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// A directed edge between two endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Source node, or [`START`].
    pub from: String,
    /// Target node, or [`END`].
    pub to: String,
}

/// Complete graph definition with nodes and edges.
///
/// A graph is a single path of nodes from [`START`] to [`END`].
/// Branching and cycles are rejected by [`GraphConfig::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Unique identifier for this graph.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description of what this graph does.
    #[serde(default)]
    pub description: String,
    /// The nodes in this graph.
    pub nodes: Vec<NodeConfig>,
    /// The edges connecting nodes.
    pub edges: Vec<EdgeConfig>,
}

impl GraphConfig {
    /// Creates a new builder for constructing a graph programmatically.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> GraphBuilder {
        GraphBuilder::new(id, name)
    }

    /// Loads a graph definition from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&content)
    }

    /// Parses a graph definition from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes this definition to a JSON string.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Finds a node by ID.
    pub fn node(&self, id: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns the target of the edge leaving `from`, if any.
    pub fn next(&self, from: &str) -> Option<&str> {
        self.edges.iter().find(|e| e.from == from).map(|e| e.to.as_str())
    }

    /// Checks that the graph is a single acyclic path from [`START`] to [`END`]
    /// covering every node.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| ConfigError::validation(&self.id, msg);

        let mut ids = HashSet::new();
        for node in &self.nodes {
            if node.id.is_empty() {
                return Err(invalid("node id must not be empty".into()));
            }
            if node.id == START || node.id == END {
                return Err(invalid(format!("node id '{}' is reserved", node.id)));
            }
            if !ids.insert(node.id.as_str()) {
                return Err(invalid(format!("duplicate node id '{}'", node.id)));
            }
        }

        let mut sources = HashSet::new();
        for edge in &self.edges {
            if edge.to == START {
                return Err(invalid(format!("edge from '{}' points into {}", edge.from, START)));
            }
            if edge.from == END {
                return Err(invalid(format!("edge to '{}' leaves {}", edge.to, END)));
            }
            for endpoint in [&edge.from, &edge.to] {
                if endpoint != START && endpoint != END && !ids.contains(endpoint.as_str()) {
                    return Err(ConfigError::NodeNotFound {
                        graph_id: self.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
            if !sources.insert(edge.from.as_str()) {
                return Err(invalid(format!("'{}' has more than one outgoing edge", edge.from)));
            }
        }

        let mut visited = HashSet::new();
        let mut current = self
            .next(START)
            .ok_or_else(|| invalid(format!("no edge leaves {}", START)))?;

        while current != END {
            if !visited.insert(current) {
                return Err(invalid(format!("cycle through '{}'", current)));
            }
            current = self
                .next(current)
                .ok_or_else(|| invalid(format!("'{}' never reaches {}", current, END)))?;
        }

        if let Some(orphan) = self.nodes.iter().find(|n| !visited.contains(n.id.as_str())) {
            return Err(invalid(format!("'{}' is not reachable from {}", orphan.id, START)));
        }

        Ok(())
    }
}

// ============================================================================
// Builder API
// ============================================================================

/// Builder for constructing [`GraphConfig`] programmatically.
///
/// Use [`GraphConfig::builder()`] to create a new builder.
#[derive(Debug)]
pub struct GraphBuilder {
    id: String,
    name: String,
    description: String,
    nodes: Vec<NodeConfig>,
    edges: Vec<EdgeConfig>,
}

impl GraphBuilder {
    fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Sets the graph description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Starts building a new node with the given ID and type.
    pub fn node(self, id: impl Into<String>, node_type: NodeType) -> NodeBuilder {
        NodeBuilder::new(self, id.into(), node_type)
    }

    /// Adds an edge from one endpoint to another.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(EdgeConfig { from: from.into(), to: to.into() });
        self
    }

    /// Builds the final [`GraphConfig`]. Call [`GraphConfig::validate`] to check it.
    pub fn build(self) -> GraphConfig {
        GraphConfig {
            id: self.id,
            name: self.name,
            description: self.description,
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    fn add_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }
}

/// Builder for constructing a single node within a graph.
///
/// Created via [`GraphBuilder::node()`].
#[derive(Debug)]
pub struct NodeBuilder {
    graph: GraphBuilder,
    id: String,
    node_type: NodeType,
    model: Option<String>,
    prompt: Option<String>,
}

impl NodeBuilder {
    fn new(graph: GraphBuilder, id: String, node_type: NodeType) -> Self {
        Self {
            graph,
            id,
            node_type,
            model: None,
            prompt: None,
        }
    }

    /// Sets the model ID for this node.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system prompt for this node.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Finishes building this node and returns to the graph builder.
    pub fn done(self) -> GraphBuilder {
        let node = NodeConfig {
            id: self.id,
            node_type: self.node_type,
            model: self.model,
            prompt: self.prompt,
        };
        self.graph.add_node(node)
    }
}
