//! Schema versioning, migration and default hydration for strategy graphs.

use crate::catalog::NodeCatalog;
use crate::error::MigrationError;
use crate::graph::{SCHEMA_VERSION_KEY, StrategyGraph};
use serde_json::Value as JsonValue;

pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

const REQUIRED_NODE_FIELDS: &[&str] = &["id", "node_type", "position"];
const REQUIRED_EDGE_FIELDS: &[&str] = &["source_node", "source_port", "target_node", "target_port"];

/// One upgrade hop between two adjacent schema versions.
#[derive(Clone)]
pub struct MigrationStep {
    pub from: &'static str,
    pub to: &'static str,
    pub apply: fn(StrategyGraph) -> StrategyGraph,
}

/// Knows every schema version in order and how to move graphs forward between them.
pub struct SchemaRegistry {
    catalog: &'static NodeCatalog,
    versions: Vec<&'static str>,
    steps: Vec<MigrationStep>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            catalog: NodeCatalog::global(),
            versions: vec![CURRENT_SCHEMA_VERSION],
            steps: Vec::new(),
        }
    }

    /// Registers an upgrade hop. Its target becomes the newest known version
    /// if it was not known already.
    pub fn with_step(mut self, step: MigrationStep) -> Self {
        if !self.versions.contains(&step.from) {
            self.versions.push(step.from);
        }
        if !self.versions.contains(&step.to) {
            self.versions.push(step.to);
        }
        self.steps.push(step);
        self
    }

    pub fn current_version(&self) -> &str {
        self.versions
            .last()
            .copied()
            .unwrap_or(CURRENT_SCHEMA_VERSION)
    }

    /// Upgrades `graph` to `target` (the current version when `None`) by
    /// applying registered steps in order. Graphs without a version are taken
    /// to be current.
    pub fn migrate(
        &self,
        mut graph: StrategyGraph,
        target: Option<&str>,
    ) -> Result<StrategyGraph, MigrationError> {
        let target = target.unwrap_or(self.current_version()).to_string();
        let target_rank = self
            .rank(&target)
            .ok_or_else(|| MigrationError::UnsupportedVersion(target.clone()))?;

        let mut current = graph
            .schema_version()
            .unwrap_or(self.current_version())
            .to_string();
        let from_rank = self
            .rank(&current)
            .ok_or_else(|| MigrationError::UnsupportedVersion(current.clone()))?;

        if from_rank > target_rank {
            return Err(MigrationError::NoPath {
                from: current,
                to: target,
            });
        }

        while current != target {
            let step = self
                .steps
                .iter()
                .find(|s| s.from == current)
                .ok_or_else(|| MigrationError::NoPath {
                    from: current.clone(),
                    to: target.clone(),
                })?;
            log::debug!(
                "Migrating graph '{}' from schema {} to {}",
                graph.name,
                step.from,
                step.to
            );
            graph = (step.apply)(graph);
            current = step.to.to_string();
        }

        graph
            .metadata
            .insert(SCHEMA_VERSION_KEY.to_string(), JsonValue::from(current));
        Ok(graph)
    }

    /// Fills every parameter a node is missing, or has set to `null`, with its
    /// catalog default. Nodes of unknown type are left untouched.
    pub fn hydrate_defaults(&self, mut graph: StrategyGraph) -> StrategyGraph {
        for node in &mut graph.nodes {
            let Some(definition) = self.catalog.by_type(&node.node_type) else {
                continue;
            };
            for param in &definition.parameters {
                let Some(default) = &param.default else {
                    continue;
                };
                let slot = node
                    .parameters
                    .entry(param.name.to_string())
                    .or_insert(JsonValue::Null);
                if slot.is_null() {
                    *slot = default.clone();
                }
            }
        }
        graph
    }

    /// Checks the raw JSON shape of a graph before it is deserialized.
    pub fn validate_schema(&self, raw: &JsonValue) -> Vec<String> {
        let mut problems = Vec::new();
        let Some(root) = raw.as_object() else {
            return vec!["graph must be a JSON object".to_string()];
        };

        match root.get("nodes").and_then(JsonValue::as_array) {
            Some(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    for field in REQUIRED_NODE_FIELDS {
                        if node.get(field).is_none_or(JsonValue::is_null) {
                            problems.push(format!("node {} is missing '{}'", i, field));
                        }
                    }
                }
            }
            None => problems.push("'nodes' must be an array".to_string()),
        }

        match root.get("edges").and_then(JsonValue::as_array) {
            Some(edges) => {
                for (i, edge) in edges.iter().enumerate() {
                    for field in REQUIRED_EDGE_FIELDS {
                        if !edge.get(field).is_some_and(JsonValue::is_string) {
                            problems.push(format!("edge {} is missing '{}'", i, field));
                        }
                    }
                }
            }
            None => problems.push("'edges' must be an array".to_string()),
        }

        problems
    }

    fn rank(&self, version: &str) -> Option<usize> {
        self.versions.iter().position(|v| *v == version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;
    use serde_json::json;

    fn rename_thresholds(mut graph: StrategyGraph) -> StrategyGraph {
        for node in &mut graph.nodes {
            if let Some(v) = node.parameters.remove("level") {
                node.parameters.insert("threshold".to_string(), v);
            }
        }
        graph
    }

    fn add_tag(mut graph: StrategyGraph) -> StrategyGraph {
        graph.metadata.insert("tagged".to_string(), json!(true));
        graph
    }

    #[test]
    fn unversioned_graph_is_stamped_current() {
        let registry = SchemaRegistry::new();
        let graph = registry.migrate(StrategyGraph::new("g"), None).unwrap();
        assert_eq!(graph.schema_version(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let registry = SchemaRegistry::new();
        let err = registry
            .migrate(StrategyGraph::new("g"), Some("9.9"))
            .unwrap_err();
        assert_eq!(err, MigrationError::UnsupportedVersion("9.9".to_string()));
    }

    #[test]
    fn chained_steps_apply_in_order() {
        let registry = SchemaRegistry::new()
            .with_step(MigrationStep {
                from: "1.0",
                to: "1.1",
                apply: rename_thresholds,
            })
            .with_step(MigrationStep {
                from: "1.1",
                to: "2.0",
                apply: add_tag,
            });
        assert_eq!(registry.current_version(), "2.0");

        let mut graph = StrategyGraph::new("g");
        graph
            .metadata
            .insert(SCHEMA_VERSION_KEY.to_string(), json!("1.0"));
        graph.add_node(GraphNode::new("c", "threshold_condition").with_param("level", json!(3.0)));

        let migrated = registry.migrate(graph, None).unwrap();
        assert_eq!(migrated.schema_version(), Some("2.0"));
        assert_eq!(migrated.nodes[0].param_f64("threshold"), Some(3.0));
        assert_eq!(migrated.metadata.get("tagged"), Some(&json!(true)));
    }

    #[test]
    fn downgrade_has_no_path() {
        let registry = SchemaRegistry::new().with_step(MigrationStep {
            from: "1.0",
            to: "1.1",
            apply: add_tag,
        });
        let mut graph = StrategyGraph::new("g");
        graph
            .metadata
            .insert(SCHEMA_VERSION_KEY.to_string(), json!("1.1"));
        assert!(matches!(
            registry.migrate(graph, Some("1.0")),
            Err(MigrationError::NoPath { .. })
        ));
    }

    #[test]
    fn schema_check_reports_missing_fields() {
        let registry = SchemaRegistry::new();
        let raw = json!({
            "name": "g",
            "nodes": [{"id": "a", "node_type": "price_source"}],
            "edges": [{"source_node": "a", "source_port": "price", "target_node": "b"}]
        });
        let problems = registry.validate_schema(&raw);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("position"));
        assert!(problems[1].contains("target_port"));
    }
}
