use crate::backend::IndicatorKey;
use crate::catalog::NodeCategory;
use crate::error::NodeExecutionError;
use crate::graph::GraphNode;
use crate::runtime::{Signal, Value};
use crate::temporal::{TemporalKind, TemporalState};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSourceKind {
    Price,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Atr,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Macd => "macd",
            IndicatorKind::Atr => "atr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Threshold,
    Range,
    Duration,
    Sequence,
}

impl ConditionKind {
    pub fn temporal_kind(&self) -> Option<TemporalKind> {
        match self {
            ConditionKind::Duration => Some(TemporalKind::Duration),
            ConditionKind::Sequence => Some(TemporalKind::Sequence),
            ConditionKind::Threshold | ConditionKind::Range => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionKind {
    And,
    Or,
    Weighted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Buy,
    Sell,
    ClosePosition,
    Alert,
    EmergencyExit,
}

/// How the executor runs a node. One variant per category, one handler per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionType {
    DataSource(DataSourceKind),
    Indicator(IndicatorKind),
    Condition(ConditionKind),
    Composition(CompositionKind),
    Action(ActionKind),
}

impl ExecutionType {
    /// The fixed node type to execution type mapping.
    pub fn for_node_type(node_type: &str) -> Option<Self> {
        use ExecutionType::*;
        let mapped = match node_type {
            "price_source" => DataSource(DataSourceKind::Price),
            "volume_source" => DataSource(DataSourceKind::Volume),
            "sma" => Indicator(IndicatorKind::Sma),
            "ema" => Indicator(IndicatorKind::Ema),
            "rsi" => Indicator(IndicatorKind::Rsi),
            "macd" => Indicator(IndicatorKind::Macd),
            "atr" => Indicator(IndicatorKind::Atr),
            "threshold_condition" => Condition(ConditionKind::Threshold),
            "range_condition" => Condition(ConditionKind::Range),
            "duration_condition" => Condition(ConditionKind::Duration),
            "sequence_condition" => Condition(ConditionKind::Sequence),
            "and_gate" => Composition(CompositionKind::And),
            "or_gate" => Composition(CompositionKind::Or),
            "weighted_gate" => Composition(CompositionKind::Weighted),
            "buy_signal" => Action(ActionKind::Buy),
            "sell_signal" => Action(ActionKind::Sell),
            "close_position" => Action(ActionKind::ClosePosition),
            "alert_action" => Action(ActionKind::Alert),
            "emergency_exit" => Action(ActionKind::EmergencyExit),
            _ => return None,
        };
        Some(mapped)
    }

    pub fn category(&self) -> NodeCategory {
        match self {
            ExecutionType::DataSource(_) => NodeCategory::DataSource,
            ExecutionType::Indicator(_) => NodeCategory::Indicator,
            ExecutionType::Condition(_) => NodeCategory::Condition,
            ExecutionType::Composition(_) => NodeCategory::Composition,
            ExecutionType::Action(_) => NodeCategory::Action,
        }
    }

    pub fn temporal_kind(&self) -> Option<TemporalKind> {
        match self {
            ExecutionType::Condition(kind) => kind.temporal_kind(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// What a node produced on its last run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutput {
    /// Output port name to value.
    pub values: BTreeMap<String, Value>,
    /// Set when an indicator value came from the mock fallback.
    pub mocked: bool,
    pub signal: Option<Signal>,
}

impl NodeOutput {
    pub fn single(port: &str, value: Value) -> Self {
        let mut values = BTreeMap::new();
        values.insert(port.to_string(), value);
        Self {
            values,
            ..Default::default()
        }
    }
}

/// One compiled node: its graph definition plus per-tick execution state.
#[derive(Debug, Clone)]
pub struct ExecutionNode {
    pub id: String,
    pub execution_type: ExecutionType,
    pub node: GraphNode,
    pub dependencies: BTreeSet<String>,
    pub dependents: BTreeSet<String>,
    pub state: NodeState,
    pub result: Option<NodeOutput>,
    pub error: Option<NodeExecutionError>,
    /// Backend key for indicator nodes.
    pub indicator_key: Option<IndicatorKey>,
}

impl ExecutionNode {
    pub(crate) fn new(node: GraphNode, execution_type: ExecutionType) -> Self {
        Self {
            id: node.id.clone(),
            execution_type,
            node,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            state: NodeState::Pending,
            result: None,
            error: None,
            indicator_key: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = NodeState::Pending;
        self.result = None;
        self.error = None;
    }
}

/// An output port feeding an input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PortRef {
    pub node_id: String,
    pub port: String,
}

/// Every source wired into one input port, in edge order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputRoute {
    pub port: String,
    pub sources: Vec<PortRef>,
}

/// A compiled, run-ready strategy for one symbol.
///
/// Plans are replaced wholesale on reload; callers outside the executor only
/// read `nodes`, `execution_order` and `data_flow`.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub id: String,
    pub name: String,
    /// Namespace for persisted temporal state.
    pub strategy: String,
    pub symbol: String,
    pub nodes: AHashMap<String, ExecutionNode>,
    pub execution_order: Vec<String>,
    /// Temporal condition state, keyed by node id.
    pub state_machines: AHashMap<String, TemporalState>,
    /// Input routes for every node that consumes data, keyed by node id.
    pub data_flow: AHashMap<String, Vec<InputRoute>>,
    pub compiled_at: DateTime<Utc>,
}

impl ExecutionPlan {
    pub fn node(&self, id: &str) -> Option<&ExecutionNode> {
        self.nodes.get(id)
    }

    pub fn state_machine(&self, id: &str) -> Option<&TemporalState> {
        self.state_machines.get(id)
    }

    pub fn state_machine_nodes(&self) -> Vec<&str> {
        self.execution_order
            .iter()
            .filter(|id| self.state_machines.contains_key(id.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.execution_order.iter().position(|n| n == id)
    }
}
