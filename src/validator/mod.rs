//! Structural, type, logical and business-rule checks for strategy graphs.
//!
//! Validation never fails with an `Err`: it always returns a
//! [`ValidationReport`]. Errors block compilation, warnings do not.

use crate::catalog::NodeCatalog;
use crate::config::EngineConfig;
use crate::graph::StrategyGraph;
use serde::Serialize;
use std::fmt;

mod rules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    EmptyGraph,
    DuplicateNode,
    DuplicateEdge,
    UnknownNodeType,
    InvalidParameter,
    MissingInput,
    UnusedOutput,
    MissingNode,
    InvalidPort,
    TypeMismatch,
    CycleDetected,
    DisconnectedComponents,
    UnreachableSink,
    TooManyNodes,
    HighConnectivity,
    ConflictingActions,
    MissingEmergencyExit,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::EmptyGraph => "empty_graph",
            IssueKind::DuplicateNode => "duplicate_node",
            IssueKind::DuplicateEdge => "duplicate_edge",
            IssueKind::UnknownNodeType => "unknown_node_type",
            IssueKind::InvalidParameter => "invalid_parameter",
            IssueKind::MissingInput => "missing_input",
            IssueKind::UnusedOutput => "unused_output",
            IssueKind::MissingNode => "missing_node",
            IssueKind::InvalidPort => "invalid_port",
            IssueKind::TypeMismatch => "type_mismatch",
            IssueKind::CycleDetected => "cycle_detected",
            IssueKind::DisconnectedComponents => "disconnected_components",
            IssueKind::UnreachableSink => "unreachable_sink",
            IssueKind::TooManyNodes => "too_many_nodes",
            IssueKind::HighConnectivity => "high_connectivity",
            IssueKind::ConflictingActions => "conflicting_actions",
            IssueKind::MissingEmergencyExit => "missing_emergency_exit",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding produced by the validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub node_id: Option<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "[{}] {} (node '{}')", self.kind, self.message, id),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_error(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|i| i.kind == kind)
    }

    pub fn has_warning(&self, kind: IssueKind) -> bool {
        self.warnings.iter().any(|i| i.kind == kind)
    }

    pub(crate) fn error(&mut self, kind: IssueKind, message: String, node_id: Option<&str>) {
        self.errors.push(ValidationIssue {
            kind,
            severity: Severity::Error,
            message,
            node_id: node_id.map(str::to_string),
        });
    }

    pub(crate) fn warning(&mut self, kind: IssueKind, message: String, node_id: Option<&str>) {
        self.warnings.push(ValidationIssue {
            kind,
            severity: Severity::Warning,
            message,
            node_id: node_id.map(str::to_string),
        });
    }
}

pub struct GraphValidator {
    catalog: &'static NodeCatalog,
    max_nodes: usize,
    max_edges_per_node: usize,
}

impl Default for GraphValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphValidator {
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            catalog: NodeCatalog::global(),
            max_nodes: config.max_nodes_warning,
            max_edges_per_node: config.max_edges_per_node_warning,
        }
    }

    /// Runs every pass in order and collects their findings.
    pub fn validate(&self, graph: &StrategyGraph) -> ValidationReport {
        let mut report = ValidationReport::default();
        let index = graph.index();

        if !rules::check_structure(graph, &mut report) {
            return report;
        }
        rules::check_nodes(graph, self.catalog, &mut report);
        rules::check_edges(graph, &index, self.catalog, &mut report);
        rules::check_logic(&index, &mut report);
        rules::check_business_rules(
            graph,
            self.max_nodes,
            self.max_edges_per_node,
            &mut report,
        );

        if !report.is_valid() {
            log::warn!(
                "Graph '{}' failed validation: {} error(s), {} warning(s)",
                graph.name,
                report.errors.len(),
                report.warnings.len()
            );
        }
        report
    }
}
