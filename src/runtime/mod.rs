//! Per-tick execution of compiled plans.

mod nodes;
mod signal;
mod snapshot;
mod value;

pub use signal::*;
pub use snapshot::*;
pub use value::*;

use crate::backend::IndicatorBackend;
use crate::clock::Clock;
use crate::compiler::{ExecutionPlan, ExecutionType, NodeState};
use crate::config::EngineConfig;
use crate::error::{NodeExecutionError, PersistenceError};
use crate::persistence::StatePersistence;
use nodes::NodeContext;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node that failed during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFailure {
    pub node_id: String,
    pub error: NodeExecutionError,
}

/// Everything one tick produced.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub signals: Vec<Signal>,
    /// Nodes that raised. Their dependents are listed in `skipped`.
    pub failures: Vec<NodeFailure>,
    pub skipped: Vec<String>,
    /// Indicator values seen this tick, keyed by node id.
    pub indicators: BTreeMap<String, f64>,
    /// Indicator nodes that fell back to a mock value.
    pub mocked: Vec<String>,
}

impl ExecutionOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Runs plans one tick at a time.
///
/// The executor holds no per-plan state; everything mutable lives on the plan,
/// so a caller must not run the same plan concurrently.
pub struct PlanExecutor {
    backend: Option<Arc<dyn IndicatorBackend>>,
    persistence: Option<Arc<dyn StatePersistence>>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl PlanExecutor {
    pub fn new(
        backend: Option<Arc<dyn IndicatorBackend>>,
        persistence: Option<Arc<dyn StatePersistence>>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            backend,
            persistence,
            clock,
            config,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Runs every node of `plan` in `execution_order` against `snapshot`.
    ///
    /// A failing node is recorded and only its dependents are skipped; the rest
    /// of the plan still runs.
    pub async fn execute_plan(
        &self,
        plan: &mut ExecutionPlan,
        snapshot: &MarketSnapshot,
    ) -> ExecutionOutcome {
        let timestamp = self.clock.now();
        let now = self.clock.now_secs();
        let timeout = self.config.node_timeout();
        let mut outcome = ExecutionOutcome::default();

        for node in plan.nodes.values_mut() {
            node.reset();
        }

        for id in &plan.execution_order {
            let Some(node) = plan.nodes.get(id) else {
                continue;
            };

            let blocked_by = node.dependencies.iter().find(|dep| {
                plan.nodes
                    .get(dep.as_str())
                    .is_none_or(|d| d.state != NodeState::Completed)
            });
            if let Some(dep) = blocked_by {
                let error = NodeExecutionError::UpstreamFailed(dep.clone());
                if let Some(node) = plan.nodes.get_mut(id) {
                    node.state = NodeState::Skipped;
                    node.error = Some(error);
                }
                outcome.skipped.push(id.clone());
                continue;
            }

            let inputs = gather_inputs(plan, id);
            let execution_type = node.execution_type;
            let context = NodeContext {
                node: &node.node,
                inputs: &inputs,
                snapshot,
                strategy: &plan.strategy,
                symbol: &plan.symbol,
                now,
                timestamp,
                indicators: &outcome.indicators,
                indicator_key: node.indicator_key.as_ref(),
                backend: self.backend.as_deref(),
            };
            let before = plan.state_machines.get(id).cloned();
            let state = plan.state_machines.get_mut(id);

            let result = match tokio::time::timeout(
                timeout,
                nodes::run(execution_type, &context, state),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(NodeExecutionError::Timeout(self.config.node_timeout_ms)),
            };

            if before.is_some() && plan.state_machines.get(id) != before.as_ref() {
                self.persist_state(plan, id).await;
            }

            let Some(node) = plan.nodes.get_mut(id) else {
                continue;
            };
            match result {
                Ok(output) => {
                    if let ExecutionType::Indicator(_) = execution_type {
                        if let Some(value) = output.values.get("value").and_then(Value::as_f64) {
                            outcome.indicators.insert(id.clone(), value);
                        }
                        if output.mocked {
                            outcome.mocked.push(id.clone());
                        }
                    }
                    if let Some(signal) = &output.signal {
                        outcome.signals.push(signal.clone());
                    }
                    node.state = NodeState::Completed;
                    node.result = Some(output);
                }
                Err(error) => {
                    log::warn!(
                        "Node '{}' in strategy '{}' ({}) failed: {}",
                        id,
                        plan.strategy,
                        plan.symbol,
                        error
                    );
                    node.state = NodeState::Failed;
                    node.error = Some(error.clone());
                    outcome.failures.push(NodeFailure {
                        node_id: id.clone(),
                        error,
                    });
                }
            }
        }

        if !outcome.signals.is_empty() {
            log::info!(
                "Strategy '{}' emitted {} signal(s) for {}",
                plan.strategy,
                outcome.signals.len(),
                plan.symbol
            );
        }
        outcome
    }

    /// Writes a changed temporal state back to the store. A failing or stalled
    /// store only logs; the in-memory state stays authoritative.
    async fn persist_state(&self, plan: &ExecutionPlan, id: &str) {
        let (Some(persistence), Some(state)) = (&self.persistence, plan.state_machines.get(id))
        else {
            return;
        };
        let saved = match state.to_blob() {
            Ok(blob) => {
                let write = persistence.set(
                    &plan.strategy,
                    &plan.symbol,
                    id,
                    blob,
                    self.config.state_ttl(),
                );
                match tokio::time::timeout(self.config.node_timeout(), write).await {
                    Ok(saved) => saved,
                    Err(_) => Err(PersistenceError::Unavailable(format!(
                        "write timed out after {}ms",
                        self.config.node_timeout_ms
                    ))),
                }
            }
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            log::warn!(
                "Could not persist state for node '{}', keeping it in memory: {}",
                id,
                e
            );
        }
    }
}

/// Collects the upstream values routed into each input port of `id`.
fn gather_inputs(plan: &ExecutionPlan, id: &str) -> BTreeMap<String, Vec<Value>> {
    let mut inputs = BTreeMap::new();
    let Some(routes) = plan.data_flow.get(id) else {
        return inputs;
    };
    for route in routes {
        let values: Vec<Value> = route
            .sources
            .iter()
            .filter_map(|source| {
                plan.nodes
                    .get(&source.node_id)?
                    .result
                    .as_ref()?
                    .values
                    .get(&source.port)
                    .cloned()
            })
            .collect();
        inputs.insert(route.port.clone(), values);
    }
    inputs
}
