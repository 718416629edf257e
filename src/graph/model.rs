use crate::error::GraphError;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

/// Metadata key holding the schema version a graph was authored against.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Canvas position of a node. Layout only; never affects execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node instance placed in a strategy graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    /// Key into the node catalog.
    pub node_type: String,
    pub position: Position,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            parameters: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn param_f64(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).and_then(|v| v.as_f64())
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(|v| v.as_str())
    }

    pub fn param_bool(&self, name: &str) -> Option<bool> {
        self.parameters.get(name).and_then(|v| v.as_bool())
    }
}

/// A directed connection: the target node consumes the source node's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_node: String,
    pub source_port: String,
    pub target_node: String,
    pub target_port: String,
}

impl GraphEdge {
    pub fn new(source_node: &str, source_port: &str, target_node: &str, target_port: &str) -> Self {
        Self {
            source_node: source_node.to_string(),
            source_port: source_port.to_string(),
            target_node: target_node.to_string(),
            target_port: target_port.to_string(),
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node == node_id || self.target_node == node_id
    }
}

/// A user-authored strategy: typed nodes wired into a (hopefully acyclic) graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyGraph {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl StrategyGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            ..Default::default()
        }
    }

    // --- Portable form ---

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, GraphError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_file(path: &str) -> Result<Self, GraphError> {
        let content = fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, GraphError> {
        Ok(serde_json::to_value(self)?)
    }

    // --- Editing ---

    pub fn add_node(&mut self, node: GraphNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_edge(&mut self, edge: GraphEdge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<GraphNode> {
        let pos = self.nodes.iter().position(|n| n.id == id)?;
        self.edges.retain(|e| !e.touches(id));
        Some(self.nodes.remove(pos))
    }

    // --- Lookup ---

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_touching(&self, id: &str) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.touches(id)).collect()
    }

    pub fn incoming(&self, id: &str) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.target_node == id).collect()
    }

    pub fn outgoing(&self, id: &str) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.source_node == id).collect()
    }

    pub fn schema_version(&self) -> Option<&str> {
        self.metadata.get(SCHEMA_VERSION_KEY).and_then(|v| v.as_str())
    }

    /// Builds the id index and adjacency lists used by the graph algorithms.
    pub fn index(&self) -> GraphIndex<'_> {
        GraphIndex::new(self)
    }

    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        self.index().detect_cycles()
    }

    pub fn connected_components(&self) -> Vec<Vec<String>> {
        self.index().connected_components()
    }
}

/// Id lookup and adjacency for one graph, built in a single pass.
///
/// Edges whose endpoints do not exist are left out of the adjacency lists;
/// reporting them is the validator's job.
pub struct GraphIndex<'a> {
    graph: &'a StrategyGraph,
    positions: AHashMap<&'a str, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl<'a> GraphIndex<'a> {
    pub fn new(graph: &'a StrategyGraph) -> Self {
        let mut positions = AHashMap::with_capacity(graph.nodes.len());
        for (i, node) in graph.nodes.iter().enumerate() {
            // First occurrence wins for duplicated ids.
            positions.entry(node.id.as_str()).or_insert(i);
        }

        let mut successors = vec![Vec::new(); graph.nodes.len()];
        let mut predecessors = vec![Vec::new(); graph.nodes.len()];
        for edge in &graph.edges {
            if let (Some(&s), Some(&t)) = (
                positions.get(edge.source_node.as_str()),
                positions.get(edge.target_node.as_str()),
            ) {
                successors[s].push(t);
                predecessors[t].push(s);
            }
        }

        Self {
            graph,
            positions,
            successors,
            predecessors,
        }
    }

    pub fn graph(&self) -> &'a StrategyGraph {
        self.graph
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&'a GraphNode> {
        self.position(id).map(|i| &self.graph.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        &self.successors[index]
    }

    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.predecessors[index]
    }

    pub fn in_degree(&self, index: usize) -> usize {
        self.predecessors[index].len()
    }

    pub fn out_degree(&self, index: usize) -> usize {
        self.successors[index].len()
    }

    pub(super) fn id(&self, index: usize) -> String {
        self.graph.nodes[index].id.clone()
    }
}
