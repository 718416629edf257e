use crate::compiler::ExecutionPlan;
use crate::config::EngineConfig;
use crate::graph::StrategyGraph;
use crate::runtime::{ExecutionOutcome, Signal};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// A failure recorded against a session. The session keeps running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionError {
    pub node_id: Option<String>,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Point-in-time view of a session, safe to hand out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub strategy_name: String,
    pub symbol: String,
    pub plan_id: String,
    pub execution_order: Vec<String>,
    pub active: bool,
    pub executions: u64,
    pub signals_emitted: u64,
    pub error_count: u64,
    pub started_at: DateTime<Utc>,
    pub last_execution: Option<DateTime<Utc>>,
    pub recent_errors: Vec<SessionError>,
}

/// One deployed (strategy, symbol) pair and the plan it runs.
#[derive(Debug)]
pub struct LiveExecutionSession {
    pub id: String,
    pub strategy_name: String,
    pub symbol: String,
    pub graph: StrategyGraph,
    pub plan: ExecutionPlan,
    pub active: bool,
    pub executions: u64,
    pub signals_emitted: u64,
    pub error_count: u64,
    pub started_at: DateTime<Utc>,
    pub last_execution: Option<DateTime<Utc>>,
    recent_errors: VecDeque<SessionError>,
    signal_history: VecDeque<Signal>,
    max_recent_errors: usize,
    max_signal_history: usize,
}

impl LiveExecutionSession {
    pub fn new(
        id: String,
        strategy_name: &str,
        graph: StrategyGraph,
        plan: ExecutionPlan,
        config: &EngineConfig,
    ) -> Self {
        Self {
            id,
            strategy_name: strategy_name.to_string(),
            symbol: plan.symbol.clone(),
            graph,
            plan,
            active: true,
            executions: 0,
            signals_emitted: 0,
            error_count: 0,
            started_at: Utc::now(),
            last_execution: None,
            recent_errors: VecDeque::new(),
            signal_history: VecDeque::new(),
            max_recent_errors: config.max_recent_errors,
            max_signal_history: config.max_signal_history,
        }
    }

    /// Folds one tick's outcome into the counters, error ring and signal history.
    pub fn record_outcome(&mut self, outcome: &ExecutionOutcome, at: DateTime<Utc>) {
        self.executions += 1;
        self.last_execution = Some(at);
        for failure in &outcome.failures {
            self.record_error(Some(&failure.node_id), failure.error.to_string(), at);
        }
        for signal in &outcome.signals {
            self.signals_emitted += 1;
            push_bounded(&mut self.signal_history, signal.clone(), self.max_signal_history);
        }
    }

    pub fn record_error(&mut self, node_id: Option<&str>, message: String, at: DateTime<Utc>) {
        self.error_count += 1;
        let error = SessionError {
            node_id: node_id.map(str::to_string),
            message,
            at,
        };
        push_bounded(&mut self.recent_errors, error, self.max_recent_errors);
    }

    /// Swaps in a freshly compiled plan. Counters and history carry over.
    pub fn replace_plan(&mut self, graph: StrategyGraph, plan: ExecutionPlan) {
        self.graph = graph;
        self.plan = plan;
    }

    pub fn recent_errors(&self) -> impl Iterator<Item = &SessionError> {
        self.recent_errors.iter()
    }

    pub fn signal_history(&self) -> impl Iterator<Item = &Signal> {
        self.signal_history.iter()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id.clone(),
            strategy_name: self.strategy_name.clone(),
            symbol: self.symbol.clone(),
            plan_id: self.plan.id.clone(),
            execution_order: self.plan.execution_order.clone(),
            active: self.active,
            executions: self.executions,
            signals_emitted: self.signals_emitted,
            error_count: self.error_count,
            started_at: self.started_at,
            last_execution: self.last_execution,
            recent_errors: self.recent_errors.iter().cloned().collect(),
        }
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, limit: usize) {
    if limit == 0 {
        return;
    }
    while queue.len() >= limit {
        queue.pop_front();
    }
    queue.push_back(item);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_queue_drops_oldest() {
        let mut queue = VecDeque::new();
        for i in 0..5 {
            push_bounded(&mut queue, i, 3);
        }
        assert_eq!(queue.into_iter().collect::<Vec<_>>(), vec![2, 3, 4]);

        let mut none = VecDeque::new();
        push_bounded(&mut none, 1, 0);
        assert!(none.is_empty());
    }
}
