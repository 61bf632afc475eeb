//! Plan Executor Factory
//!
//! Maps a plan's type (case-insensitive) to an executor. Unknown or missing
//! types fall back to the default executor with a warning instead of failing.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::plan::{Plan, DEFAULT_PLAN_TYPE};
use crate::services::interruption::InterruptionCoordinator;

use super::executor::{PlanExecutor, SequentialPlanExecutor, StepRunner};

pub const DYNAMIC_AGENT_PLAN_TYPE: &str = "dynamic_agent";
pub const DIRECT_PLAN_TYPE: &str = "direct";

pub struct PlanExecutorFactory {
    executors: HashMap<String, Arc<dyn PlanExecutor>>,
    default_executor: Arc<dyn PlanExecutor>,
}

impl PlanExecutorFactory {
    pub fn new(default_executor: Arc<dyn PlanExecutor>) -> Self {
        Self {
            executors: HashMap::new(),
            default_executor,
        }
    }

    /// Factory with the built-in plan types, all backed by sequential execution.
    pub fn with_builtins(
        interruption: Arc<InterruptionCoordinator>,
        runner: Arc<dyn StepRunner>,
    ) -> Self {
        let default_executor: Arc<dyn PlanExecutor> = Arc::new(SequentialPlanExecutor::new(
            DYNAMIC_AGENT_PLAN_TYPE,
            interruption.clone(),
            runner.clone(),
        ));
        let mut factory = Self::new(default_executor.clone());
        factory.register(DYNAMIC_AGENT_PLAN_TYPE, default_executor);
        for plan_type in [DEFAULT_PLAN_TYPE, DIRECT_PLAN_TYPE] {
            factory.register(
                plan_type,
                Arc::new(SequentialPlanExecutor::new(
                    plan_type,
                    interruption.clone(),
                    runner.clone(),
                )),
            );
        }
        factory
    }

    pub fn register(&mut self, plan_type: &str, executor: Arc<dyn PlanExecutor>) {
        self.executors.insert(plan_type.to_lowercase(), executor);
    }

    pub fn create_executor(&self, plan: &Plan) -> Arc<dyn PlanExecutor> {
        self.executor_for_type(Some(&plan.plan_type))
    }

    pub fn executor_for_type(&self, plan_type: Option<&str>) -> Arc<dyn PlanExecutor> {
        let Some(plan_type) = plan_type.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("[ExecutorFactory] No plan type, using default executor");
            return self.default_executor.clone();
        };

        match self.executors.get(&plan_type.to_lowercase()) {
            Some(executor) => executor.clone(),
            None => {
                warn!(
                    "[ExecutorFactory] Unsupported plan type '{}', falling back to {}",
                    plan_type,
                    self.default_executor.name()
                );
                self.default_executor.clone()
            }
        }
    }

    pub fn is_supported(&self, plan_type: &str) -> bool {
        self.executors.contains_key(&plan_type.to_lowercase())
    }

    pub fn supported_plan_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.executors.keys().cloned().collect();
        types.sort();
        types
    }
}
