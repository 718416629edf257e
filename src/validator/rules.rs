use super::{IssueKind, ValidationReport};
use crate::catalog::{NodeCatalog, NodeCategory, PortDirection};
use crate::graph::{GraphEdge, GraphIndex, StrategyGraph};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;

const EMERGENCY_EXIT: &str = "emergency_exit";
const ORDER_ACTIONS: &[&str] = &["buy_signal", "sell_signal"];

/// Pass 1. Returns `false` when the graph is empty and later passes are moot.
pub(super) fn check_structure(graph: &StrategyGraph, report: &mut ValidationReport) -> bool {
    if graph.nodes.is_empty() {
        report.error(
            IssueKind::EmptyGraph,
            "Graph contains no nodes".to_string(),
            None,
        );
        return false;
    }

    let mut seen_ids = AHashSet::new();
    let mut reported = AHashSet::new();
    for node in &graph.nodes {
        if !seen_ids.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
            report.error(
                IssueKind::DuplicateNode,
                format!("Node id '{}' is used more than once", node.id),
                Some(&node.id),
            );
        }
    }

    let mut seen_edges: AHashSet<&GraphEdge> = AHashSet::new();
    for edge in &graph.edges {
        if !seen_edges.insert(edge) {
            report.warning(
                IssueKind::DuplicateEdge,
                format!(
                    "Duplicate edge {}.{} -> {}.{}",
                    edge.source_node, edge.source_port, edge.target_node, edge.target_port
                ),
                Some(&edge.target_node),
            );
        }
    }
    true
}

/// Pass 2: node types, parameters, required inputs and unused action outputs.
pub(super) fn check_nodes(
    graph: &StrategyGraph,
    catalog: &NodeCatalog,
    report: &mut ValidationReport,
) {
    let connected_inputs: AHashSet<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.target_node.as_str(), e.target_port.as_str()))
        .collect();
    let has_outgoing: AHashSet<&str> = graph
        .edges
        .iter()
        .map(|e| e.source_node.as_str())
        .collect();

    for node in &graph.nodes {
        let definition = match catalog.lookup(&node.node_type) {
            Ok(def) => def,
            Err(e) => {
                report.error(IssueKind::UnknownNodeType, e.to_string(), Some(&node.id));
                continue;
            }
        };

        for param_error in catalog.validate_parameters(&node.node_type, &node.parameters) {
            report.error(
                IssueKind::InvalidParameter,
                param_error.to_string(),
                Some(&node.id),
            );
        }

        for port in definition.inputs().filter(|p| p.required) {
            if !connected_inputs.contains(&(node.id.as_str(), port.name)) {
                report.error(
                    IssueKind::MissingInput,
                    format!("Required input '{}' is not connected", port.name),
                    Some(&node.id),
                );
            }
        }

        if definition.category == NodeCategory::Action && !has_outgoing.contains(node.id.as_str()) {
            report.warning(
                IssueKind::UnusedOutput,
                format!("Output of action '{}' is not consumed", node.id),
                Some(&node.id),
            );
        }
    }
}

/// Pass 3: edge endpoints, port names and directions, and port type compatibility.
pub(super) fn check_edges(
    graph: &StrategyGraph,
    index: &GraphIndex<'_>,
    catalog: &NodeCatalog,
    report: &mut ValidationReport,
) {
    for edge in &graph.edges {
        let source = index.node(&edge.source_node);
        let target = index.node(&edge.target_node);
        if source.is_none() {
            report.error(
                IssueKind::MissingNode,
                format!("Edge source '{}' does not exist", edge.source_node),
                Some(&edge.source_node),
            );
        }
        if target.is_none() {
            report.error(
                IssueKind::MissingNode,
                format!("Edge target '{}' does not exist", edge.target_node),
                Some(&edge.target_node),
            );
        }
        let (Some(source), Some(target)) = (source, target) else {
            continue;
        };

        // Unknown types were already reported in the node pass.
        let (Some(source_def), Some(target_def)) = (
            catalog.by_type(&source.node_type),
            catalog.by_type(&target.node_type),
        ) else {
            continue;
        };

        let source_port = source_def.port(&edge.source_port, PortDirection::Output);
        let target_port = target_def.port(&edge.target_port, PortDirection::Input);
        if source_port.is_none() {
            report.error(
                IssueKind::InvalidPort,
                format!(
                    "'{}' has no output port '{}'",
                    source.node_type, edge.source_port
                ),
                Some(&source.id),
            );
        }
        if target_port.is_none() {
            report.error(
                IssueKind::InvalidPort,
                format!(
                    "'{}' has no input port '{}'",
                    target.node_type, edge.target_port
                ),
                Some(&target.id),
            );
        }

        if let (Some(out), Some(input)) = (source_port, target_port) {
            if !out.data_type.can_connect_to(input.data_type) {
                report.error(
                    IssueKind::TypeMismatch,
                    format!(
                        "Cannot connect {} output '{}.{}' to {} input '{}.{}'",
                        out.data_type,
                        source.id,
                        out.name,
                        input.data_type,
                        target.id,
                        input.name
                    ),
                    Some(&target.id),
                );
            }
        }
    }
}

/// Pass 4: cycles, disconnected components and unreachable sinks.
pub(super) fn check_logic(index: &GraphIndex<'_>, report: &mut ValidationReport) {
    for cycle in index.detect_cycles() {
        let first = cycle.first().cloned();
        let path = cycle.iter().chain(first.iter()).join(" -> ");
        report.error(
            IssueKind::CycleDetected,
            format!("Cycle detected: {}", path),
            first.as_deref(),
        );
    }

    let components = index.connected_components();
    if components.len() > 1 {
        report.warning(
            IssueKind::DisconnectedComponents,
            format!("Graph has {} disconnected components", components.len()),
            None,
        );
    }

    let n = index.graph().nodes.len();
    let sources: Vec<usize> = (0..n)
        .filter(|&i| index.in_degree(i) == 0 && index.out_degree(i) > 0)
        .collect();
    let reached = index.reachable_from(&sources);
    for i in (0..n).filter(|&i| index.out_degree(i) == 0 && !reached[i]) {
        let id = &index.graph().nodes[i].id;
        report.warning(
            IssueKind::UnreachableSink,
            format!("Sink '{}' is not reachable from any source", id),
            Some(id),
        );
    }
}

/// Pass 5: size limits and trading-specific sanity checks.
pub(super) fn check_business_rules(
    graph: &StrategyGraph,
    max_nodes: usize,
    max_edges_per_node: usize,
    report: &mut ValidationReport,
) {
    if graph.nodes.len() > max_nodes {
        report.warning(
            IssueKind::TooManyNodes,
            format!(
                "Graph has {} nodes; more than {} may evaluate slowly",
                graph.nodes.len(),
                max_nodes
            ),
            None,
        );
    }

    let mut edge_counts: AHashMap<&str, usize> = AHashMap::new();
    for edge in &graph.edges {
        *edge_counts.entry(edge.source_node.as_str()).or_default() += 1;
        *edge_counts.entry(edge.target_node.as_str()).or_default() += 1;
    }
    for node in graph.nodes.iter().unique_by(|n| n.id.as_str()) {
        let count = edge_counts.get(node.id.as_str()).copied().unwrap_or(0);
        if count > max_edges_per_node {
            report.warning(
                IssueKind::HighConnectivity,
                format!("Node has {} edges (limit {})", count, max_edges_per_node),
                Some(&node.id),
            );
        }
    }

    let order_actions = graph
        .nodes
        .iter()
        .filter(|n| ORDER_ACTIONS.contains(&n.node_type.as_str()))
        .count();
    if order_actions > 1 {
        report.warning(
            IssueKind::ConflictingActions,
            format!(
                "{} buy/sell actions may emit conflicting signals",
                order_actions
            ),
            None,
        );
    }

    if !graph.nodes.iter().any(|n| n.node_type == EMERGENCY_EXIT) {
        report.warning(
            IssueKind::MissingEmergencyExit,
            "No emergency_exit action is present".to_string(),
            None,
        );
    }
}
