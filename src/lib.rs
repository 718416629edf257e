//! # strategy-graph - Strategy Graph Compiler and Live Evaluation Engine
//!
//! **strategy-graph** turns visually authored, node-based trading strategies into
//! executable plans and runs them live against incoming market updates. A strategy
//! is a directed acyclic graph of typed nodes (data sources, indicators,
//! conditions, compositions and actions) wired through typed ports.
//!
//! ## Core Workflow
//!
//! 1.  **Author**: Build a [`graph::StrategyGraph`] in code or load its JSON form.
//! 2.  **Validate**: The [`validator::GraphValidator`] reports structural, type,
//!     logical and business-rule problems as errors (blocking) or warnings.
//! 3.  **Compile**: The [`compiler::GraphCompiler`] migrates, hydrates, validates and
//!     sorts the graph into an [`compiler::ExecutionPlan`], recovering temporal
//!     condition state from the state store.
//! 4.  **Run**: Execute the plan tick by tick, or deploy it on the
//!     [`engine::LiveEngine`], which re-evaluates sessions on every
//!     `indicator.updated` event and publishes `signal.generated` events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strategy_graph::prelude::*;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = StrategyGraph::new("breakout");
//! graph
//!     .add_node(GraphNode::new("price", "price_source").with_param("symbol", json!("BTC_USDT")))
//!     .add_node(
//!         GraphNode::new("above", "threshold_condition")
//!             .with_param("operator", json!(">"))
//!             .with_param("threshold", json!(50_000)),
//!     )
//!     .add_node(GraphNode::new("buy", "buy_signal").with_param("size", json!(100)))
//!     .add_edge(GraphEdge::new("price", "price", "above", "value"))
//!     .add_edge(GraphEdge::new("above", "result", "buy", "trigger"));
//!
//! let compiler = GraphCompiler::builder().build();
//! let mut plan = compiler.compile(&graph, "BTC_USDT").await?;
//!
//! let snapshot = MarketSnapshot::single("BTC_USDT", MarketTick::with_price(51_000.0));
//! let outcome = compiler.execute_plan(&mut plan, &snapshot).await;
//! for signal in outcome.signals {
//!     println!("{:?} {} x {}", signal.side, signal.symbol, signal.quantity);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod catalog;
pub mod clock;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod persistence;
pub mod prelude;
pub mod runtime;
pub mod schema;
pub mod temporal;
pub mod validator;
