use super::{MarketSnapshot, Side, Signal, SignalType, Value};
use crate::backend::{IndicatorBackend, IndicatorKey, IndicatorReading, mock_value, read_indicator};
use crate::compiler::{
    ActionKind, CompositionKind, ConditionKind, DataSourceKind, ExecutionType, IndicatorKind,
    NodeOutput,
};
use crate::error::NodeExecutionError;
use crate::graph::GraphNode;
use crate::temporal::{DurationParams, SequenceParams, TemporalState};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Everything a node handler may read during one tick.
pub(super) struct NodeContext<'a> {
    pub node: &'a GraphNode,
    /// Upstream values per input port, one entry per feeding edge.
    pub inputs: &'a BTreeMap<String, Vec<Value>>,
    pub snapshot: &'a MarketSnapshot,
    pub strategy: &'a str,
    pub symbol: &'a str,
    pub now: f64,
    pub timestamp: DateTime<Utc>,
    /// Indicator values produced earlier in this tick.
    pub indicators: &'a BTreeMap<String, f64>,
    pub indicator_key: Option<&'a IndicatorKey>,
    pub backend: Option<&'a dyn IndicatorBackend>,
}

impl NodeContext<'_> {
    fn values(&self, port: &str) -> &[Value] {
        self.inputs.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    fn number(&self, port: &str) -> Result<f64, NodeExecutionError> {
        let value = self
            .values(port)
            .first()
            .ok_or_else(|| NodeExecutionError::MissingInput {
                port: port.to_string(),
            })?;
        value.as_f64().ok_or_else(|| NodeExecutionError::InvalidInput {
            port: port.to_string(),
            expected: "number".to_string(),
            found: value.clone(),
        })
    }

    fn booleans(&self, port: &str) -> Result<Vec<bool>, NodeExecutionError> {
        self.values(port)
            .iter()
            .map(|value| {
                value.as_bool().ok_or_else(|| NodeExecutionError::InvalidInput {
                    port: port.to_string(),
                    expected: "boolean".to_string(),
                    found: value.clone(),
                })
            })
            .collect()
    }

    fn boolean(&self, port: &str) -> Result<bool, NodeExecutionError> {
        self.booleans(port)?
            .first()
            .copied()
            .ok_or_else(|| NodeExecutionError::MissingInput {
                port: port.to_string(),
            })
    }
}

pub(super) async fn run(
    execution_type: ExecutionType,
    ctx: &NodeContext<'_>,
    state: Option<&mut TemporalState>,
) -> Result<NodeOutput, NodeExecutionError> {
    match execution_type {
        ExecutionType::DataSource(kind) => data_source(kind, ctx),
        ExecutionType::Indicator(kind) => indicator(kind, ctx).await,
        ExecutionType::Condition(kind) => condition(kind, ctx, state),
        ExecutionType::Composition(kind) => composition(kind, ctx),
        ExecutionType::Action(kind) => action(kind, ctx),
    }
}

fn data_source(kind: DataSourceKind, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeExecutionError> {
    let symbol = ctx
        .node
        .param_str("symbol")
        .filter(|s| !s.is_empty())
        .unwrap_or(ctx.symbol);
    let tick = ctx
        .snapshot
        .slice(symbol)
        .ok_or_else(|| NodeExecutionError::MissingMarketData(symbol.to_string()))?;

    let (port, value) = match kind {
        DataSourceKind::Price => ("price", tick.price),
        DataSourceKind::Volume => ("volume", tick.volume),
    };
    let value = value.ok_or_else(|| NodeExecutionError::MissingMarketData(symbol.to_string()))?;
    Ok(NodeOutput::single(port, Value::Number(value)))
}

async fn indicator(kind: IndicatorKind, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeExecutionError> {
    ctx.number("price")?;

    let key = match ctx.indicator_key {
        Some(key) => key.clone(),
        None => {
            let period = ctx.node.param_f64("period").unwrap_or(14.0).max(1.0) as u32;
            IndicatorKey::new(ctx.symbol, kind.as_str(), period)
        }
    };

    match read_indicator(ctx.backend, &key).await {
        IndicatorReading::Ready(value) => Ok(NodeOutput::single("value", Value::Number(value))),
        IndicatorReading::NotReady => Err(NodeExecutionError::IndicatorNotReady(key.to_string())),
        IndicatorReading::NoBackendConfigured => {
            let value = mock_value(kind.as_str());
            log::debug!(
                "No indicator backend configured; using mock {} = {} for node '{}'",
                kind.as_str(),
                value,
                ctx.node.id
            );
            Ok(NodeOutput {
                mocked: true,
                ..NodeOutput::single("value", Value::Number(value))
            })
        }
    }
}

fn condition(
    kind: ConditionKind,
    ctx: &NodeContext<'_>,
    state: Option<&mut TemporalState>,
) -> Result<NodeOutput, NodeExecutionError> {
    let result = match kind {
        ConditionKind::Threshold => {
            let value = ctx.number("value")?;
            let threshold = ctx.node.param_f64("threshold").unwrap_or(0.0);
            compare(ctx.node.param_str("operator").unwrap_or(">"), value, threshold)
        }
        ConditionKind::Range => {
            let value = ctx.number("value")?;
            let lower = ctx.node.param_f64("lower").unwrap_or(f64::NEG_INFINITY);
            let upper = ctx.node.param_f64("upper").unwrap_or(f64::INFINITY);
            lower <= value && value <= upper
        }
        ConditionKind::Duration | ConditionKind::Sequence => {
            let input = match kind {
                ConditionKind::Duration => ctx.boolean("condition")?,
                _ => ctx.boolean("event")?,
            };
            match state {
                Some(state) => advance(state, input, ctx),
                None => {
                    log::warn!("Temporal node '{}' has no state machine", ctx.node.id);
                    false
                }
            }
        }
    };
    Ok(NodeOutput::single("result", Value::Bool(result)))
}

/// Steps a temporal state machine. The executor persists it afterwards.
fn advance(state: &mut TemporalState, input: bool, ctx: &NodeContext<'_>) -> bool {
    match state {
        TemporalState::Duration(machine) => {
            machine.update(input, ctx.now, &DurationParams::from_node(ctx.node))
        }
        TemporalState::Sequence(machine) => {
            machine.update(input, ctx.now, &SequenceParams::from_node(ctx.node))
        }
    }
}

fn compare(operator: &str, value: f64, threshold: f64) -> bool {
    match operator {
        ">" => value > threshold,
        "<" => value < threshold,
        ">=" => value >= threshold,
        "<=" => value <= threshold,
        "==" => value == threshold,
        "!=" => value != threshold,
        _ => false,
    }
}

fn composition(kind: CompositionKind, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeExecutionError> {
    let inputs = ctx.booleans("inputs")?;
    let result = if inputs.is_empty() {
        false
    } else {
        match kind {
            CompositionKind::And => inputs.iter().all(|b| *b),
            CompositionKind::Or => inputs.iter().any(|b| *b),
            CompositionKind::Weighted => {
                let weights = weights(ctx.node);
                let threshold = ctx.node.param_f64("threshold").unwrap_or(0.5);
                weighted_score(&inputs, &weights) >= threshold
            }
        }
    };
    Ok(NodeOutput::single("result", Value::Bool(result)))
}

fn weights(node: &GraphNode) -> Vec<f64> {
    node.parameters
        .get("weights")
        .and_then(|w| w.as_array())
        .map(|list| list.iter().filter_map(|w| w.as_f64()).collect())
        .unwrap_or_default()
}

/// Normalized weighted share of true inputs. Missing weights count as 1.
fn weighted_score(inputs: &[bool], weights: &[f64]) -> f64 {
    let (hit, total) = inputs
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(hit, total), (i, on)| {
            let w = weights.get(i).copied().unwrap_or(1.0);
            (if *on { hit + w } else { hit }, total + w)
        });
    if total > 0.0 { hit / total } else { 0.0 }
}

fn action(kind: ActionKind, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeExecutionError> {
    let triggers = ctx.booleans("trigger")?;
    let fired = !triggers.is_empty() && triggers.iter().all(|t| *t);
    if !fired {
        return Ok(NodeOutput::single("signal", Value::Bool(false)));
    }

    let (signal_type, side) = match kind {
        ActionKind::Buy => (SignalType::Buy, Some(Side::Buy)),
        ActionKind::Sell => (SignalType::Sell, Some(Side::Sell)),
        ActionKind::ClosePosition => (SignalType::ClosePosition, Some(Side::Close)),
        ActionKind::EmergencyExit => (SignalType::EmergencyExit, Some(Side::Close)),
        ActionKind::Alert => (SignalType::Alert, None),
    };
    let quantity = match kind {
        ActionKind::Buy | ActionKind::Sell => ctx.node.param_f64("size").unwrap_or(0.0),
        _ => 0.0,
    };
    let message = match kind {
        ActionKind::Alert => Some(ctx.node.param_str("message").unwrap_or("Alert").to_string()),
        ActionKind::EmergencyExit => Some("Emergency exit".to_string()),
        _ => None,
    };
    let risk_level = match kind {
        ActionKind::Alert => ctx.node.param_str("level").unwrap_or("info"),
        ActionKind::EmergencyExit => "high",
        _ => ctx.node.param_str("risk_level").unwrap_or("medium"),
    };

    let signal = Signal {
        signal_id: uuid::Uuid::new_v4().to_string(),
        node_id: ctx.node.id.clone(),
        strategy: ctx.strategy.to_string(),
        symbol: ctx.symbol.to_string(),
        signal_type,
        side,
        quantity,
        price: ctx.snapshot.slice(ctx.symbol).and_then(|t| t.price),
        confidence: ctx.node.param_f64("confidence").unwrap_or(1.0),
        risk_level: risk_level.to_string(),
        message,
        indicators: ctx.indicators.clone(),
        timestamp: ctx.timestamp,
    };
    log::debug!(
        "Action '{}' fired {:?} for {}",
        ctx.node.id,
        signal.signal_type,
        signal.symbol
    );

    Ok(NodeOutput {
        signal: Some(signal),
        ..NodeOutput::single("signal", Value::Bool(true))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_operators() {
        assert!(compare(">", 51_000.0, 50_000.0));
        assert!(!compare("<", 51_000.0, 50_000.0));
        assert!(compare(">=", 1.0, 1.0));
        assert!(compare("<=", 1.0, 1.0));
        assert!(compare("==", 2.0, 2.0));
        assert!(compare("!=", 2.0, 3.0));
        assert!(!compare("~", 2.0, 3.0));
    }

    #[test]
    fn weighted_score_normalizes_and_defaults_missing_weights() {
        assert_eq!(weighted_score(&[true, false], &[3.0, 1.0]), 0.75);
        assert_eq!(weighted_score(&[true, false, true], &[]), 2.0 / 3.0);
        assert_eq!(weighted_score(&[], &[]), 0.0);
    }
}
