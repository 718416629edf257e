//! Live execution: deployed sessions re-evaluated on every indicator update.
//!
//! Each session sits behind its own async mutex, so a session's plan is never
//! evaluated twice at once while different sessions run in parallel.

mod bus;
mod session;

pub use bus::*;
pub use session::*;

use crate::compiler::GraphCompiler;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::graph::StrategyGraph;
use crate::runtime::Signal;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinSet;

#[derive(Clone)]
struct SessionHandle {
    symbol: String,
    session: Arc<Mutex<LiveExecutionSession>>,
}

pub struct LiveEngine {
    compiler: Arc<GraphCompiler>,
    sessions: DashMap<String, SessionHandle>,
    bus: EventBus,
    config: EngineConfig,
}

impl LiveEngine {
    pub fn new(compiler: Arc<GraphCompiler>, config: EngineConfig) -> Self {
        let bus = EventBus::new(config.event_channel_capacity);
        Self {
            compiler,
            sessions: DashMap::new(),
            bus,
            config,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn compiler(&self) -> &Arc<GraphCompiler> {
        &self.compiler
    }

    /// Receiver for every engine event, including `signal.generated`.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Compiles `graph` for `symbol` and deploys it. Returns the new session id.
    pub async fn start_session(
        &self,
        strategy_name: &str,
        graph: &StrategyGraph,
        symbol: &str,
    ) -> Result<String, EngineError> {
        let plan = self
            .compiler
            .compile_for(strategy_name, graph, symbol)
            .await
            .inspect_err(|e| log::error!("Could not start '{}' on {}: {}", strategy_name, symbol, e))?;

        let id = uuid::Uuid::new_v4().to_string();
        let session = LiveExecutionSession::new(
            id.clone(),
            strategy_name,
            graph.clone(),
            plan,
            &self.config,
        );
        self.sessions.insert(
            id.clone(),
            SessionHandle {
                symbol: symbol.to_string(),
                session: Arc::new(Mutex::new(session)),
            },
        );
        log::info!("Started session {} ('{}' on {})", id, strategy_name, symbol);
        Ok(id)
    }

    /// Deactivates and removes a session. An in-flight tick finishes first.
    pub async fn stop_session(&self, session_id: &str) -> Result<SessionStatus, EngineError> {
        let (_, handle) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.session.lock().await;
        session.active = false;
        log::info!(
            "Stopped session {} after {} execution(s)",
            session_id,
            session.executions
        );
        Ok(session.status())
    }

    /// Recompiles a running session from `graph` and swaps the plan between ticks.
    ///
    /// Temporal state is re-read from the state store, so progress persisted by
    /// the old plan carries over for nodes that keep their ids. On failure the
    /// old plan stays in place.
    pub async fn reload_session(
        &self,
        session_id: &str,
        graph: &StrategyGraph,
    ) -> Result<(), EngineError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.session.lock().await;
        let plan = self
            .compiler
            .compile_for(&session.strategy_name, graph, &handle.symbol)
            .await?;
        session.replace_plan(graph.clone(), plan);
        log::info!("Reloaded session {} with plan {}", session_id, session.plan.id);
        Ok(())
    }

    pub async fn session_status(&self, session_id: &str) -> Result<SessionStatus, EngineError> {
        let handle = self.handle(session_id)?;
        let session = handle.session.lock().await;
        Ok(session.status())
    }

    pub async fn list_sessions(&self) -> Vec<SessionStatus> {
        let handles: Vec<SessionHandle> = self.sessions.iter().map(|e| e.value().clone()).collect();
        let mut statuses = Vec::with_capacity(handles.len());
        for handle in handles {
            statuses.push(handle.session.lock().await.status());
        }
        statuses.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        statuses
    }

    /// Signals a session has emitted, oldest first.
    pub async fn signal_history(&self, session_id: &str) -> Result<Vec<Signal>, EngineError> {
        let handle = self.handle(session_id)?;
        let session = handle.session.lock().await;
        Ok(session.signal_history().cloned().collect())
    }

    /// Runs every active session on `update.symbol` against the update.
    ///
    /// Sessions run concurrently; a failing or panicking session is logged and
    /// does not affect the others. Returns all signals emitted.
    pub async fn handle_indicator_update(&self, update: &IndicatorUpdated) -> Vec<Signal> {
        let targets: Vec<SessionHandle> = self
            .sessions
            .iter()
            .filter(|e| e.value().symbol == update.symbol)
            .map(|e| e.value().clone())
            .collect();
        if targets.is_empty() {
            log::trace!("No sessions for {}", update.symbol);
            return Vec::new();
        }

        let snapshot = Arc::new(update.to_snapshot());
        let mut tasks = JoinSet::new();
        for handle in targets {
            let compiler = Arc::clone(&self.compiler);
            let snapshot = Arc::clone(&snapshot);
            let bus = self.bus.clone();
            tasks.spawn(async move {
                let mut session = handle.session.lock().await;
                if !session.active {
                    return Vec::new();
                }
                let outcome = compiler.execute_plan(&mut session.plan, &snapshot).await;
                let at = compiler.executor().clock().now();
                session.record_outcome(&outcome, at);
                for signal in &outcome.signals {
                    bus.publish(EngineEvent::SignalGenerated(SignalGenerated::from_signal(
                        &session.id,
                        &session.strategy_name,
                        signal,
                    )));
                }
                outcome.signals
            });
        }

        let mut signals = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(mut emitted) => signals.append(&mut emitted),
                Err(e) => log::error!("Session task for {} aborted: {}", update.symbol, e),
            }
        }
        signals
    }

    /// Consumes `indicator.updated` events until the channel closes.
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<EngineEvent>) {
        log::info!("Live engine listening for {}", INDICATOR_UPDATED);
        loop {
            match events.recv().await {
                Ok(EngineEvent::IndicatorUpdated(update)) => {
                    self.handle_indicator_update(&update).await;
                }
                Ok(EngineEvent::SignalGenerated(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Live engine lagged; dropped {} event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        log::info!("Live engine stopped");
    }

    fn handle(&self, session_id: &str) -> Result<SessionHandle, EngineError> {
        self.sessions
            .get(session_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }
}
