//! Compiler tests

mod common;
use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use strategy_graph::compiler::{ExecutionType, IndicatorKind};
use strategy_graph::persistence::StatePersistence;
use strategy_graph::prelude::*;
use strategy_graph::temporal::DurationState;

#[cfg(test)]
mod compiler_tests {
    use super::*;

    #[tokio::test]
    async fn test_execution_order_respects_every_edge() {
        init_logging();
        let compiler = GraphCompiler::builder().build();
        let mut graph = two_branch_graph();
        // Scramble authoring order; the plan must not depend on it.
        graph.nodes.reverse();

        let plan = compiler.compile(&graph, SYMBOL).await.expect("graph should compile");
        assert_eq!(plan.execution_order.len(), graph.nodes.len());
        for edge in &graph.edges {
            assert!(
                plan.position_of(&edge.source_node) < plan.position_of(&edge.target_node),
                "{} must run before {}",
                edge.source_node,
                edge.target_node
            );
        }
    }

    #[tokio::test]
    async fn test_plan_contents() {
        let compiler = GraphCompiler::builder().build();
        let plan = compiler.compile(&two_branch_graph(), SYMBOL).await.unwrap();

        assert_eq!(plan.strategy, "two-branch");
        assert_eq!(plan.symbol, SYMBOL);
        assert_eq!(
            plan.node("rsi").unwrap().execution_type,
            ExecutionType::Indicator(IndicatorKind::Rsi)
        );
        assert_eq!(
            plan.node("rsi").unwrap().indicator_key.as_ref().map(|k| k.as_str()),
            Some("BTC_USDT:rsi:14")
        );

        let price = plan.node("price").unwrap();
        assert!(price.dependencies.is_empty());
        assert_eq!(
            price.dependents.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["rsi", "spike"]
        );

        let routes = &plan.data_flow["oversold"];
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].port, "value");
        assert_eq!(routes[0].sources[0].node_id, "rsi");
        assert!(plan.state_machines.is_empty());

        // Defaults were hydrated before compilation.
        assert_eq!(plan.node("buy").unwrap().node.param_f64("size"), Some(100.0));
    }

    #[tokio::test]
    async fn test_invalid_graph_returns_the_report() {
        let compiler = GraphCompiler::builder().build();
        let mut graph = breakout_graph();
        graph.add_edge(GraphEdge::new("buy", "signal", "above", "value"));

        match compiler.compile(&graph, SYMBOL).await {
            Err(CompileError::Validation(report)) => {
                assert!(report.has_error(IssueKind::CycleDetected));
            }
            other => panic!("expected validation failure, got {:?}", other.map(|p| p.id)),
        }
    }

    #[tokio::test]
    async fn test_unsupported_schema_version_fails() {
        let compiler = GraphCompiler::builder().build();
        let mut graph = breakout_graph();
        graph.metadata.insert("schema_version".to_string(), json!("0.1"));
        assert!(matches!(
            compiler.compile(&graph, SYMBOL).await,
            Err(CompileError::Migration(_))
        ));
    }

    #[tokio::test]
    async fn test_isolated_alert_still_compiles() {
        let compiler = GraphCompiler::builder().build();
        let mut graph = breakout_graph();
        graph.add_node(GraphNode::new("alert", "alert_action"));

        let report = compiler.validate(&graph);
        assert!(report.errors.is_empty());
        assert!(report.has_warning(IssueKind::UnreachableSink));

        let plan = compiler.compile(&graph, SYMBOL).await.unwrap();
        assert!(plan.node("alert").is_some());
    }

    #[tokio::test]
    async fn test_temporal_state_is_recovered() {
        let store = Arc::new(InMemoryStateStore::new());
        let seeded = TemporalState::Duration(DurationState {
            active: true,
            start_time: Some(T0 as f64),
            elapsed: 10.0,
        });
        store
            .set("s", SYMBOL, "c1", seeded.to_blob().unwrap(), Duration::from_secs(60))
            .await
            .unwrap();

        let compiler = compiler_with(manual_clock(), Arc::clone(&store));
        let plan = compiler
            .compile_for("s", &sustained_breakout_graph(60), SYMBOL)
            .await
            .unwrap();

        match plan.state_machine("c1") {
            Some(TemporalState::Duration(state)) => {
                assert_eq!(state.elapsed, 10.0);
                assert!(state.active);
            }
            other => panic!("expected duration state, got {:?}", other),
        }
        assert_eq!(plan.state_machine_nodes(), vec!["c1"]);
    }

    #[tokio::test]
    async fn test_state_from_another_namespace_is_ignored() {
        let store = Arc::new(InMemoryStateStore::new());
        let seeded = TemporalState::Duration(DurationState {
            active: true,
            start_time: Some(T0 as f64),
            elapsed: 10.0,
        });
        store
            .set("s", "ETH_USDT", "c1", seeded.to_blob().unwrap(), Duration::from_secs(60))
            .await
            .unwrap();
        // Corrupt blob under the right key falls back to a fresh machine.
        store
            .set("other", SYMBOL, "c1", vec![0xde, 0xad], Duration::from_secs(60))
            .await
            .unwrap();

        let compiler = compiler_with(manual_clock(), Arc::clone(&store));
        let graph = sustained_breakout_graph(60);
        for strategy in ["s", "other"] {
            let plan = compiler.compile_for(strategy, &graph, SYMBOL).await.unwrap();
            assert_eq!(
                plan.state_machine("c1"),
                Some(&TemporalState::Duration(DurationState::default()))
            );
        }
    }

    #[tokio::test]
    async fn test_indicators_are_registered_with_the_backend() {
        let backend = Arc::new(InMemoryIndicatorStore::new());
        let compiler = GraphCompiler::builder()
            .with_indicator_backend(backend.clone())
            .build();
        compiler.compile(&two_branch_graph(), "ETH_USDT").await.unwrap();
        assert!(backend.is_registered(&IndicatorKey::new("ETH_USDT", "rsi", 14)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_state_store_does_not_block_compilation() {
        init_logging();
        let store = Arc::new(SlowStateStore::new(Duration::from_secs(3_600)));
        let compiler = GraphCompiler::builder()
            .with_config(fast_timeout_config())
            .with_persistence(store)
            .build();

        let plan = tokio::time::timeout(
            Duration::from_secs(5),
            compiler.compile(&sustained_breakout_graph(30), SYMBOL),
        )
        .await
        .expect("compilation should not wait on the store")
        .unwrap();
        assert_eq!(
            plan.state_machine("c1"),
            Some(&TemporalState::Duration(DurationState::default()))
        );
    }

    #[tokio::test]
    async fn test_null_period_uses_catalog_default() {
        let mut graph = StrategyGraph::new("ma");
        graph
            .add_node(GraphNode::new("price", "price_source"))
            .add_node(GraphNode::new("ma", "sma").with_param("period", json!(null)))
            .add_node(GraphNode::new("above", "threshold_condition").with_param("threshold", json!(100)))
            .add_node(GraphNode::new("buy", "buy_signal"))
            .add_edge(GraphEdge::new("price", "price", "ma", "price"))
            .add_edge(GraphEdge::new("ma", "value", "above", "value"))
            .add_edge(GraphEdge::new("above", "result", "buy", "trigger"));

        let plan = GraphCompiler::builder().build().compile(&graph, SYMBOL).await.unwrap();
        let ma = plan.node("ma").unwrap();
        assert_eq!(ma.indicator_key, Some(IndicatorKey::new(SYMBOL, "sma", 20)));
        assert_eq!(ma.node.param_f64("period"), Some(20.0));
    }
}
