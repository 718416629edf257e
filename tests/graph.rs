//! Graph model and schema tests

mod common;
use common::*;
use serde_json::json;
use strategy_graph::error::MigrationError;
use strategy_graph::graph::SCHEMA_VERSION_KEY;
use strategy_graph::prelude::*;
use strategy_graph::schema::{CURRENT_SCHEMA_VERSION, MigrationStep};

#[cfg(test)]
mod model_tests {
    use super::*;

    #[test]
    fn test_json_round_trip_is_lossless() {
        let graph = StrategyGraph::from_json(BREAKOUT_JSON).expect("fixture should parse");
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.schema_version(), Some("1.0"));

        let again = StrategyGraph::from_json(&graph.to_json().unwrap()).unwrap();
        assert_eq!(again, graph);
    }

    #[test]
    fn test_missing_position_is_rejected() {
        let json = r#"{"name": "x", "nodes": [{"id": "a", "node_type": "sma"}], "edges": []}"#;
        assert!(StrategyGraph::from_json(json).is_err());
    }

    #[test]
    fn test_remove_node_drops_its_edges() {
        let mut graph = breakout_graph();
        let removed = graph.remove_node("above").unwrap();
        assert_eq!(removed.node_type, "threshold_condition");
        assert!(graph.edges.is_empty());
        assert!(graph.remove_node("above").is_none());
    }

    #[test]
    fn test_cycles_and_components() {
        let mut graph = breakout_graph();
        assert!(graph.detect_cycles().is_empty());
        assert_eq!(graph.connected_components().len(), 1);

        graph.add_node(GraphNode::new("gate", "and_gate"));
        assert_eq!(graph.connected_components().len(), 2);

        graph
            .add_node(GraphNode::new("gate2", "or_gate"))
            .add_edge(GraphEdge::new("gate", "result", "gate2", "inputs"))
            .add_edge(GraphEdge::new("gate2", "result", "gate", "inputs"));
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }
}

#[cfg(test)]
mod schema_tests {
    use super::*;

    #[test]
    fn test_hydration_is_idempotent() {
        let registry = SchemaRegistry::new();
        let once = registry.hydrate_defaults(breakout_graph());
        let twice = registry.hydrate_defaults(once.clone());
        assert_eq!(once, twice);

        let buy = once.node("buy").unwrap();
        assert_eq!(buy.param_f64("confidence"), Some(1.0));
        assert_eq!(buy.param_str("risk_level"), Some("medium"));
        // User-supplied values survive.
        assert_eq!(buy.param_f64("size"), Some(100.0));
    }

    #[test]
    fn test_hydration_replaces_null_with_default() {
        let registry = SchemaRegistry::new();
        let mut graph = breakout_graph();
        graph.nodes[2].parameters.insert("size".to_string(), json!(null));
        graph.nodes[2].parameters.insert("confidence".to_string(), json!(null));

        let once = registry.hydrate_defaults(graph);
        let buy = once.node("buy").unwrap();
        assert_eq!(buy.param_f64("size"), Some(100.0));
        assert_eq!(buy.param_f64("confidence"), Some(1.0));
        assert_eq!(registry.hydrate_defaults(once.clone()), once);
    }

    #[test]
    fn test_unversioned_graph_is_stamped_current() {
        let registry = SchemaRegistry::new();
        let graph = registry.migrate(breakout_graph(), None).unwrap();
        assert_eq!(graph.schema_version(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_migration_steps_apply_in_order() {
        fn rename(mut graph: StrategyGraph) -> StrategyGraph {
            for node in &mut graph.nodes {
                if node.node_type == "moving_average" {
                    node.node_type = "sma".to_string();
                }
            }
            graph
        }
        fn describe(mut graph: StrategyGraph) -> StrategyGraph {
            graph.description = "migrated".to_string();
            graph
        }

        let registry = SchemaRegistry::new()
            .with_step(MigrationStep { from: "1.0", to: "1.1", apply: rename })
            .with_step(MigrationStep { from: "1.1", to: "2.0", apply: describe });
        assert_eq!(registry.current_version(), "2.0");

        let mut old = StrategyGraph::new("legacy");
        old.add_node(GraphNode::new("ma", "moving_average"));
        old.metadata.insert(SCHEMA_VERSION_KEY.to_string(), json!("1.0"));

        let migrated = registry.migrate(old.clone(), None).unwrap();
        assert_eq!(migrated.nodes[0].node_type, "sma");
        assert_eq!(migrated.description, "migrated");
        assert_eq!(migrated.schema_version(), Some("2.0"));

        let partial = registry.migrate(old, Some("1.1")).unwrap();
        assert_eq!(partial.description, "");
        assert_eq!(partial.schema_version(), Some("1.1"));
    }

    #[test]
    fn test_unknown_versions_are_rejected() {
        let registry = SchemaRegistry::new();
        assert_eq!(
            registry.migrate(breakout_graph(), Some("9.9")),
            Err(MigrationError::UnsupportedVersion("9.9".to_string()))
        );

        let mut future = breakout_graph();
        future.metadata.insert(SCHEMA_VERSION_KEY.to_string(), json!("3.0"));
        assert!(registry.migrate(future, None).is_err());
    }

    #[test]
    fn test_raw_shape_checks() {
        let registry = SchemaRegistry::new();
        let raw: serde_json::Value = serde_json::from_str(BREAKOUT_JSON).unwrap();
        assert!(registry.validate_schema(&raw).is_empty());

        let broken = json!({"nodes": [{"id": "a"}], "edges": [{"source_node": "a"}]});
        let problems = registry.validate_schema(&broken);
        assert!(problems.iter().any(|p| p.contains("node_type")));
        assert!(problems.iter().any(|p| p.contains("target_port")));
    }
}
