//! Relay State
//!
//! Wires the storage layer, interruption coordination, streaming aggregation
//! and the plan pipeline together from one [`RuntimeConfig`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use plan_relay_llm::{AggregationOptions, LlmProvider, StreamingAggregator};
use plan_relay_tools::{ParallelExecutionTool, ParallelExecutor, ToolRegistry};

use crate::models::settings::RuntimeConfig;
use crate::services::events::BroadcastEventPublisher;
use crate::services::interruption::{InterruptionChecker, InterruptionCoordinator, RetentionSweeper};
use crate::services::pipeline::{
    LevelBasedExecutorPool, PlanCreatorRegistry, PlanExecutorFactory, PlanFinalizer,
    PlanningCoordinator, StepRunner,
};
use crate::storage::{Database, SqliteTaskStore};
use crate::utils::error::{AppError, AppResult};

/// Host-supplied collaborators.
pub struct RelayComponents {
    pub runner: Arc<dyn StepRunner>,
    pub tools: Arc<ToolRegistry>,
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub creators: PlanCreatorRegistry,
}

impl RelayComponents {
    pub fn new(runner: Arc<dyn StepRunner>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            runner,
            tools,
            llm: None,
            creators: PlanCreatorRegistry::with_builtins(),
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_creators(mut self, creators: PlanCreatorRegistry) -> Self {
        self.creators = creators;
        self
    }
}

pub struct RelayState {
    config: RuntimeConfig,
    database: Database,
    tools: Arc<ToolRegistry>,
    events: Arc<BroadcastEventPublisher>,
    interruption: Arc<InterruptionCoordinator>,
    aggregator: Arc<StreamingAggregator>,
    planning: PlanningCoordinator,
    shutdown: CancellationToken,
}

impl RelayState {
    /// Open the task database named by the config (or the default path).
    pub fn open(config: RuntimeConfig, components: RelayComponents) -> AppResult<Self> {
        let database = match &config.database_path {
            Some(path) => Database::open(path)?,
            None => Database::new()?,
        };
        Self::initialize(config, database, components)
    }

    pub fn initialize(
        config: RuntimeConfig,
        database: Database,
        components: RelayComponents,
    ) -> AppResult<Self> {
        config.validate().map_err(AppError::config)?;

        let events = Arc::new(BroadcastEventPublisher::default());
        let store = Arc::new(SqliteTaskStore::new(&database));
        let interruption =
            Arc::new(InterruptionCoordinator::new(store).with_publisher(events.clone()));
        let aggregator = Arc::new(
            StreamingAggregator::new(events.clone())
                .with_min_chunks(config.early_termination_min_chunks)
                .with_progress_interval(Duration::from_secs(config.progress_log_interval_secs)),
        );

        let mut finalizer = PlanFinalizer::new(interruption.clone())
            .with_aggregator(aggregator.clone())
            .with_publisher(events.clone());
        if let Some(llm) = components.llm {
            finalizer = finalizer.with_llm(llm);
        }

        let creators = components
            .creators
            .with_default_type(&config.default_plan_type);
        let planning = PlanningCoordinator::new(
            Arc::new(creators),
            Arc::new(PlanExecutorFactory::with_builtins(
                interruption.clone(),
                components.runner,
            )),
            Arc::new(finalizer),
            Arc::new(LevelBasedExecutorPool::from_config(&config)),
            interruption.clone(),
        );

        info!(
            "[RelayState] Initialized ({} tools, pool levels {:?})",
            components.tools.len(),
            config.level_pool_sizes
        );

        Ok(Self {
            config,
            database,
            tools: components.tools,
            events,
            interruption,
            aggregator,
            planning,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn is_database_healthy(&self) -> bool {
        self.database.is_healthy()
    }

    pub fn events(&self) -> &Arc<BroadcastEventPublisher> {
        &self.events
    }

    pub fn interruption(&self) -> &Arc<InterruptionCoordinator> {
        &self.interruption
    }

    pub fn checker(&self) -> InterruptionChecker {
        InterruptionChecker::new(self.interruption.clone())
    }

    pub fn aggregator(&self) -> &Arc<StreamingAggregator> {
        &self.aggregator
    }

    pub fn planning(&self) -> &PlanningCoordinator {
        &self.planning
    }

    /// Aggregation options honoring the configured debug and early-termination flags.
    pub fn aggregation_options(&self, context_name: &str, plan_id: &str) -> AggregationOptions {
        AggregationOptions::new(context_name, plan_id)
            .with_debug_mode(self.config.debug_mode)
            .with_early_termination(self.config.early_termination_enabled)
    }

    /// Fresh function registry for one plan step.
    pub fn parallel_executor(&self) -> Arc<ParallelExecutor> {
        Arc::new(ParallelExecutor::new(self.tools.clone()))
    }

    pub fn parallel_tool(&self) -> ParallelExecutionTool {
        ParallelExecutionTool::new(self.parallel_executor())
    }

    /// Start the retention sweeper; it stops on [`shutdown`](Self::shutdown).
    pub fn start_retention_sweeper(&self) -> JoinHandle<()> {
        RetentionSweeper::from_config(self.interruption.clone(), &self.config)
            .spawn(self.shutdown.child_token())
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
