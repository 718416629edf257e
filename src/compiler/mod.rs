//! Turns a validated strategy graph into an [`ExecutionPlan`].

use crate::backend::{IndicatorBackend, IndicatorKey};
use crate::catalog::NodeCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{CompileError, PersistenceError};
use crate::graph::StrategyGraph;
use crate::persistence::StatePersistence;
use crate::runtime::{ExecutionOutcome, MarketSnapshot, PlanExecutor};
use crate::schema::SchemaRegistry;
use crate::temporal::{TemporalKind, TemporalState};
use crate::validator::{GraphValidator, ValidationReport};
use ahash::AHashMap;
use std::sync::Arc;
use std::time::Duration;

pub mod plan;
mod sort;

pub use plan::*;

pub struct CompilerBuilder {
    persistence: Option<Arc<dyn StatePersistence>>,
    backend: Option<Arc<dyn IndicatorBackend>>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    schema: SchemaRegistry,
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerBuilder {
    pub fn new() -> Self {
        Self {
            persistence: None,
            backend: None,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
            schema: SchemaRegistry::new(),
        }
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn StatePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_indicator_backend(mut self, backend: Arc<dyn IndicatorBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_schema_registry(mut self, schema: SchemaRegistry) -> Self {
        self.schema = schema;
        self
    }

    pub fn build(self) -> GraphCompiler {
        let executor = PlanExecutor::new(
            self.backend.clone(),
            self.persistence.clone(),
            self.clock,
            self.config.clone(),
        );
        GraphCompiler {
            catalog: NodeCatalog::global(),
            validator: GraphValidator::from_config(&self.config),
            schema: self.schema,
            persistence: self.persistence,
            recovery_timeout: self.config.node_timeout(),
            backend: self.backend,
            executor,
        }
    }
}

/// Compiles graphs into plans and owns the executor those plans run on.
///
/// Built once at startup with its collaborators injected, then shared by
/// reference (typically behind an `Arc`).
pub struct GraphCompiler {
    catalog: &'static NodeCatalog,
    validator: GraphValidator,
    schema: SchemaRegistry,
    persistence: Option<Arc<dyn StatePersistence>>,
    /// Bound on each state store read during compilation.
    recovery_timeout: Duration,
    backend: Option<Arc<dyn IndicatorBackend>>,
    executor: PlanExecutor,
}

impl GraphCompiler {
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::new()
    }

    pub fn validate(&self, graph: &StrategyGraph) -> ValidationReport {
        self.validator.validate(graph)
    }

    pub fn executor(&self) -> &PlanExecutor {
        &self.executor
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Compiles `graph` for `symbol`, using the graph name as the strategy name.
    pub async fn compile(
        &self,
        graph: &StrategyGraph,
        symbol: &str,
    ) -> Result<ExecutionPlan, CompileError> {
        self.compile_for(&graph.name, graph, symbol).await
    }

    /// Compiles `graph` for `symbol`. Temporal state is recovered from, and later
    /// saved under, `(strategy, symbol, node id)`.
    pub async fn compile_for(
        &self,
        strategy: &str,
        graph: &StrategyGraph,
        symbol: &str,
    ) -> Result<ExecutionPlan, CompileError> {
        let graph = self.schema.migrate(graph.clone(), None)?;
        let graph = self.schema.hydrate_defaults(graph);

        let report = self.validator.validate(&graph);
        if !report.is_valid() {
            return Err(CompileError::Validation(report));
        }
        if !report.warnings.is_empty() {
            log::debug!(
                "Graph '{}' compiled with {} warning(s)",
                graph.name,
                report.warnings.len()
            );
        }

        let mut nodes = AHashMap::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            let execution_type = ExecutionType::for_node_type(&node.node_type).ok_or_else(|| {
                CompileError::UnmappedNodeType {
                    node_id: node.id.clone(),
                    node_type: node.node_type.clone(),
                }
            })?;
            nodes.insert(
                node.id.clone(),
                ExecutionNode::new(node.clone(), execution_type),
            );
        }

        for edge in &graph.edges {
            if !nodes.contains_key(&edge.target_node) {
                return Err(CompileError::UnknownNode(edge.target_node.clone()));
            }
            let source = nodes
                .get_mut(&edge.source_node)
                .ok_or_else(|| CompileError::UnknownNode(edge.source_node.clone()))?;
            source.dependents.insert(edge.target_node.clone());
            if let Some(target) = nodes.get_mut(&edge.target_node) {
                target.dependencies.insert(edge.source_node.clone());
            }
        }

        let index = graph.index();
        let execution_order = sort::topological_order(&index)?;

        let mut state_machines = AHashMap::new();
        for id in &execution_order {
            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            if let Some(kind) = node.execution_type.temporal_kind() {
                let state = self.recover_state(strategy, symbol, id, kind).await;
                state_machines.insert(id.clone(), state);
            }
            if let ExecutionType::Indicator(kind) = node.execution_type {
                node.indicator_key = Some(self.register_indicator(symbol, kind, &node.node).await);
            }
        }

        let data_flow = self.build_data_flow(&graph);

        let plan = ExecutionPlan {
            id: uuid::Uuid::new_v4().to_string(),
            name: graph.name.clone(),
            strategy: strategy.to_string(),
            symbol: symbol.to_string(),
            nodes,
            execution_order,
            state_machines,
            data_flow,
            compiled_at: chrono::Utc::now(),
        };
        log::info!(
            "Compiled strategy '{}' for {}: {} nodes, {} temporal",
            plan.strategy,
            plan.symbol,
            plan.nodes.len(),
            plan.state_machines.len()
        );
        Ok(plan)
    }

    /// Runs one tick of `plan` against `snapshot`.
    pub async fn execute_plan(
        &self,
        plan: &mut ExecutionPlan,
        snapshot: &MarketSnapshot,
    ) -> ExecutionOutcome {
        self.executor.execute_plan(plan, snapshot).await
    }

    /// Seeds a temporal node from the store, falling back to the zero state
    /// when nothing usable is stored or the store cannot be reached.
    async fn recover_state(
        &self,
        strategy: &str,
        symbol: &str,
        node_id: &str,
        kind: TemporalKind,
    ) -> TemporalState {
        let Some(persistence) = &self.persistence else {
            return TemporalState::zero(kind);
        };
        let read = tokio::time::timeout(
            self.recovery_timeout,
            persistence.get(strategy, symbol, node_id),
        )
        .await
        .unwrap_or_else(|_| {
            Err(PersistenceError::Unavailable(format!(
                "read timed out after {:?}",
                self.recovery_timeout
            )))
        });
        match read {
            Ok(Some(blob)) => match TemporalState::from_blob(&blob) {
                Ok(state) if state.kind() == kind => {
                    log::debug!("Recovered temporal state for {}:{}:{}", strategy, symbol, node_id);
                    state
                }
                Ok(_) => {
                    log::warn!(
                        "Stored state for node '{}' is not a {:?} state; starting fresh",
                        node_id,
                        kind
                    );
                    TemporalState::zero(kind)
                }
                Err(e) => {
                    log::warn!("Discarding stored state for node '{}': {}", node_id, e);
                    TemporalState::zero(kind)
                }
            },
            Ok(None) => TemporalState::zero(kind),
            Err(e) => {
                log::warn!(
                    "State recovery for node '{}' failed, starting fresh: {}",
                    node_id,
                    e
                );
                TemporalState::zero(kind)
            }
        }
    }

    async fn register_indicator(
        &self,
        symbol: &str,
        kind: IndicatorKind,
        node: &crate::graph::GraphNode,
    ) -> IndicatorKey {
        let period = node
            .param_f64("period")
            .map(|p| p.max(1.0) as u32)
            .unwrap_or(14);
        match &self.backend {
            Some(backend) => {
                let extra = serde_json::json!({ "node_id": node.id });
                backend.add(symbol, kind.as_str(), period, &extra).await
            }
            None => IndicatorKey::new(symbol, kind.as_str(), period),
        }
    }

    /// Input routes for every consuming node. Duplicate edges collapse to one source.
    fn build_data_flow(&self, graph: &StrategyGraph) -> AHashMap<String, Vec<InputRoute>> {
        let mut data_flow = AHashMap::new();
        for node in &graph.nodes {
            let routes: Vec<InputRoute> = self
                .catalog
                .input_ports(&node.node_type)
                .into_iter()
                .map(|port| {
                    let mut sources: Vec<PortRef> = Vec::new();
                    for edge in graph
                        .edges
                        .iter()
                        .filter(|e| e.target_node == node.id && e.target_port == port.name)
                    {
                        let source = PortRef {
                            node_id: edge.source_node.clone(),
                            port: edge.source_port.clone(),
                        };
                        if !sources.contains(&source) {
                            sources.push(source);
                        }
                    }
                    InputRoute {
                        port: port.name.to_string(),
                        sources,
                    }
                })
                .collect();
            if !routes.is_empty() {
                data_flow.insert(node.id.clone(), routes);
            }
        }
        data_flow
    }
}
