use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Buy,
    Sell,
    ClosePosition,
    Alert,
    EmergencyExit,
}

/// Order-management side of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
    Close,
}

/// A trading signal emitted by an action node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: String,
    pub node_id: String,
    pub strategy: String,
    pub symbol: String,
    pub signal_type: SignalType,
    pub side: Option<Side>,
    pub quantity: f64,
    pub price: Option<f64>,
    pub confidence: f64,
    pub risk_level: String,
    pub message: Option<String>,
    /// Indicator values observed during the tick, keyed by node id.
    pub indicators: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}
