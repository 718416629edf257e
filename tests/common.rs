//! Common test utilities for building strategy graphs and engines.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use strategy_graph::error::PersistenceError;
use strategy_graph::prelude::*;

pub const SYMBOL: &str = "BTC_USDT";

/// Epoch seconds used as the start of every manual clock.
pub const T0: i64 = 1_700_000_000;

/// Breakout strategy in its portable JSON form.
///
/// Logic: `price(BTC_USDT) > 50000` -> buy 100
pub const BREAKOUT_JSON: &str = r#"{
    "name": "breakout",
    "version": "1.0.0",
    "description": "Buy when price clears 50k",
    "nodes": [
        {"id": "price", "node_type": "price_source", "position": {"x": 0, "y": 0},
         "parameters": {"symbol": "BTC_USDT"}},
        {"id": "above", "node_type": "threshold_condition", "position": {"x": 200, "y": 0},
         "parameters": {"operator": ">", "threshold": 50000}},
        {"id": "buy", "node_type": "buy_signal", "position": {"x": 400, "y": 0},
         "parameters": {"size": 100}}
    ],
    "edges": [
        {"source_node": "price", "source_port": "price", "target_node": "above", "target_port": "value"},
        {"source_node": "above", "source_port": "result", "target_node": "buy", "target_port": "trigger"}
    ],
    "metadata": {"schema_version": "1.0"}
}"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `price_source -> threshold_condition(>, 50000) -> buy_signal(size=100)`
pub fn breakout_graph() -> StrategyGraph {
    let mut graph = StrategyGraph::new("breakout");
    graph
        .add_node(GraphNode::new("price", "price_source").with_param("symbol", json!(SYMBOL)))
        .add_node(
            GraphNode::new("above", "threshold_condition")
                .with_param("operator", json!(">"))
                .with_param("threshold", json!(50_000)),
        )
        .add_node(GraphNode::new("buy", "buy_signal").with_param("size", json!(100)))
        .add_edge(GraphEdge::new("price", "price", "above", "value"))
        .add_edge(GraphEdge::new("above", "result", "buy", "trigger"));
    graph
}

/// Price must hold above `threshold` for `seconds` before buying.
pub fn sustained_breakout_graph(seconds: u64) -> StrategyGraph {
    let mut graph = breakout_graph();
    graph.name = "sustained".to_string();
    graph.edges.retain(|e| e.target_node != "buy");
    graph
        .add_node(
            GraphNode::new("c1", "duration_condition")
                .with_param("duration_seconds", json!(seconds)),
        )
        .add_edge(GraphEdge::new("above", "result", "c1", "condition"))
        .add_edge(GraphEdge::new("c1", "result", "buy", "trigger"));
    graph
}

/// `price -> rsi -> threshold(<, 30) -> buy`, plus an independent price branch to sell.
pub fn two_branch_graph() -> StrategyGraph {
    let mut graph = StrategyGraph::new("two-branch");
    graph
        .add_node(GraphNode::new("price", "price_source"))
        .add_node(GraphNode::new("rsi", "rsi").with_param("period", json!(14)))
        .add_node(
            GraphNode::new("oversold", "threshold_condition")
                .with_param("operator", json!("<"))
                .with_param("threshold", json!(30)),
        )
        .add_node(GraphNode::new("buy", "buy_signal"))
        .add_node(
            GraphNode::new("spike", "threshold_condition")
                .with_param("operator", json!(">"))
                .with_param("threshold", json!(60_000)),
        )
        .add_node(GraphNode::new("sell", "sell_signal").with_param("size", json!(5)))
        .add_edge(GraphEdge::new("price", "price", "rsi", "price"))
        .add_edge(GraphEdge::new("rsi", "value", "oversold", "value"))
        .add_edge(GraphEdge::new("oversold", "result", "buy", "trigger"))
        .add_edge(GraphEdge::new("price", "price", "spike", "value"))
        .add_edge(GraphEdge::new("spike", "result", "sell", "trigger"));
    graph
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_secs(T0))
}

pub fn tick(price: f64) -> MarketSnapshot {
    MarketSnapshot::single(SYMBOL, MarketTick::with_price(price))
}

pub fn compiler_with(
    clock: Arc<ManualClock>,
    store: Arc<InMemoryStateStore>,
) -> GraphCompiler {
    GraphCompiler::builder()
        .with_clock(clock)
        .with_persistence(store)
        .build()
}

/// A state store that answers only after `delay`.
pub struct SlowStateStore {
    pub delay: Duration,
    pub inner: InMemoryStateStore,
}

impl SlowStateStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: InMemoryStateStore::new(),
        }
    }
}

#[async_trait]
impl StatePersistence for SlowStateStore {
    async fn get(
        &self,
        strategy: &str,
        symbol: &str,
        node_id: &str,
    ) -> Result<Option<Vec<u8>>, PersistenceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(strategy, symbol, node_id).await
    }

    async fn set(
        &self,
        strategy: &str,
        symbol: &str,
        node_id: &str,
        blob: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), PersistenceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(strategy, symbol, node_id, blob, ttl).await
    }
}

/// A state store whose server is unreachable.
pub struct DownStateStore;

#[async_trait]
impl StatePersistence for DownStateStore {
    async fn get(&self, _: &str, _: &str, _: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Err(PersistenceError::Unavailable("connection refused".to_string()))
    }

    async fn set(
        &self,
        _: &str,
        _: &str,
        _: &str,
        _: Vec<u8>,
        _: Duration,
    ) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("connection refused".to_string()))
    }
}

/// An indicator backend whose reads take `delay`.
pub struct SlowIndicatorBackend {
    pub delay: Duration,
}

#[async_trait]
impl IndicatorBackend for SlowIndicatorBackend {
    async fn get(&self, _: &IndicatorKey) -> Option<f64> {
        tokio::time::sleep(self.delay).await;
        Some(25.0)
    }

    async fn add(
        &self,
        symbol: &str,
        kind: &str,
        period: u32,
        _: &serde_json::Value,
    ) -> IndicatorKey {
        IndicatorKey::new(symbol, kind, period)
    }
}

/// Config with a short per-node timeout.
pub fn fast_timeout_config() -> EngineConfig {
    EngineConfig {
        node_timeout_ms: 100,
        ..EngineConfig::default()
    }
}
