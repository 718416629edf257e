use crate::runtime::Value;
use crate::validator::ValidationReport;
use thiserror::Error;

/// Errors raised when resolving a node type against the catalog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Node type '{0}' is not registered in the catalog")]
    NotFound(String),
}

/// A single parameter that failed catalog validation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parameter '{name}' is invalid: {reason}")]
pub struct ParamError {
    pub name: String,
    pub reason: String,
}

impl ParamError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced while loading or dumping a graph in its portable form.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Failed to parse graph JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Could not read graph file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced by the schema registry when moving a graph between versions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrationError {
    #[error("Schema version '{0}' is not supported")]
    UnsupportedVersion(String),

    #[error("No migration path from schema '{from}' to '{to}'")]
    NoPath { from: String, to: String },
}

/// Compilation failures. Everything past `Validation` and `Migration` indicates a validation gap.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    #[error("Graph failed validation with {} error(s)", .0.errors.len())]
    Validation(ValidationReport),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("Node '{node_id}' has type '{node_type}' with no execution mapping")]
    UnmappedNodeType { node_id: String, node_type: String },

    #[error("Topological sort visited {visited} of {total} nodes; the graph contains a cycle")]
    CycleDetected { visited: usize, total: usize },

    #[error("Edge references node '{0}', which is not part of the graph")]
    UnknownNode(String),
}

/// A failure isolated to one node within one tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeExecutionError {
    #[error("Required input '{port}' has no value")]
    MissingInput { port: String },

    #[error("Market snapshot has no data for symbol '{0}'")]
    MissingMarketData(String),

    #[error("Indicator '{0}' has not produced a value yet")]
    IndicatorNotReady(String),

    #[error("Input '{port}' expected {expected}, but found '{found}'")]
    InvalidInput {
        port: String,
        expected: String,
        found: Value,
    },

    #[error("Node execution exceeded {0} ms")]
    Timeout(u64),

    #[error("Skipped because upstream node '{0}' did not complete")]
    UpstreamFailed(String),
}

/// Errors from the temporal state store. Never fatal to execution.
#[derive(Error, Debug, Clone)]
pub enum PersistenceError {
    #[error("State store unavailable: {0}")]
    Unavailable(String),

    #[error("Could not encode or decode temporal state: {0}")]
    Codec(String),
}

/// Errors surfaced by the live engine's session table.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Errors raised while loading engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Environment variable '{name}' has invalid value '{value}'")]
    InvalidEnv { name: String, value: String },
}
