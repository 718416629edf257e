//! Prelude module for convenient imports
//!
//! Re-exports the types most callers need to author, compile and run strategies.
//!
//! ```rust,no_run
//! use strategy_graph::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = StrategyGraph::from_file("path/to/strategy.json")?;
//! let report = GraphCompiler::builder().build().validate(&graph);
//! println!("valid: {}", report.is_valid());
//! # Ok(())
//! # }
//! ```

// Authoring
pub use crate::catalog::{DataType, NodeCatalog, NodeCategory, NodeDefinition};
pub use crate::graph::{GraphEdge, GraphNode, Position, StrategyGraph};

// Validation and compilation
pub use crate::compiler::{CompilerBuilder, ExecutionPlan, GraphCompiler, NodeState};
pub use crate::schema::SchemaRegistry;
pub use crate::validator::{GraphValidator, IssueKind, Severity, ValidationIssue, ValidationReport};

// Execution
pub use crate::backend::{InMemoryIndicatorStore, IndicatorBackend, IndicatorKey};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::EngineConfig;
pub use crate::engine::{EngineEvent, IndicatorUpdated, LiveEngine, SignalGenerated};
pub use crate::persistence::{InMemoryStateStore, StatePersistence};
pub use crate::runtime::{ExecutionOutcome, MarketSnapshot, MarketTick, Side, Signal, SignalType, Value};
pub use crate::temporal::TemporalState;

// Error types
pub use crate::error::{CompileError, EngineError, GraphError, NodeExecutionError};
