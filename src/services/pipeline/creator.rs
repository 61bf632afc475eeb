//! Plan Creators
//!
//! A [`PlanCreator`] populates `ExecutionContext::plan` from the user
//! request. Leaving the plan unset is how a creator reports failure.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::plan::{ExecutionStep, Plan, DEFAULT_PLAN_TYPE};
use crate::utils::error::{AppError, AppResult};

use super::context::ExecutionContext;

#[async_trait]
pub trait PlanCreator: Send + Sync {
    /// Build a plan for `ctx.user_request` and store it in `ctx.plan`.
    async fn create_plan(&self, ctx: &mut ExecutionContext, use_memory: bool) -> AppResult<()>;
}

/// Turns the whole request into a single-step plan.
pub struct SingleStepPlanCreator {
    plan_type: String,
}

impl SingleStepPlanCreator {
    pub fn new(plan_type: impl Into<String>) -> Self {
        Self {
            plan_type: plan_type.into(),
        }
    }
}

#[async_trait]
impl PlanCreator for SingleStepPlanCreator {
    async fn create_plan(&self, ctx: &mut ExecutionContext, _use_memory: bool) -> AppResult<()> {
        let request = ctx.user_request.trim();
        if request.is_empty() {
            warn!("[PlanCreator] Empty request for plan {}", ctx.current_plan_id);
            return Ok(());
        }

        let mut plan = Plan::new(self.plan_type.clone(), request)
            .with_user_request(request)
            .with_step(ExecutionStep::new(request));
        plan.current_plan_id = Some(ctx.current_plan_id.clone());
        plan.root_plan_id = Some(ctx.root_plan_id().to_string());
        ctx.plan = Some(plan);
        Ok(())
    }
}

pub struct PlanCreatorRegistry {
    creators: HashMap<String, Arc<dyn PlanCreator>>,
    /// Used when a request names no plan type, and as the lookup fallback
    default_type: String,
}

impl PlanCreatorRegistry {
    pub fn new() -> Self {
        Self {
            creators: HashMap::new(),
            default_type: DEFAULT_PLAN_TYPE.to_string(),
        }
    }

    /// Blank values keep the current default.
    pub fn with_default_type(mut self, plan_type: &str) -> Self {
        if !plan_type.trim().is_empty() {
            self.default_type = plan_type.trim().to_lowercase();
        }
        self
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    /// Registry with the single-step creator under the default plan type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            DEFAULT_PLAN_TYPE,
            Arc::new(SingleStepPlanCreator::new(DEFAULT_PLAN_TYPE)),
        );
        registry
    }

    pub fn register(&mut self, plan_type: &str, creator: Arc<dyn PlanCreator>) {
        self.creators.insert(plan_type.to_lowercase(), creator);
    }

    pub fn get(&self, plan_type: &str) -> Option<Arc<dyn PlanCreator>> {
        self.creators.get(&plan_type.to_lowercase()).cloned()
    }

    /// Creator for `plan_type`, falling back to the default plan type.
    pub fn resolve(&self, plan_type: &str) -> AppResult<Arc<dyn PlanCreator>> {
        if let Some(creator) = self.get(plan_type) {
            return Ok(creator);
        }
        debug!(
            "[PlanCreator] No creator for '{}', trying '{}'",
            plan_type, self.default_type
        );
        self.get(&self.default_type).ok_or_else(|| {
            AppError::plan_creation(format!(
                "No plan creator registered for type: {}",
                plan_type
            ))
        })
    }

    pub fn plan_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.creators.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for PlanCreatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_step_creator() {
        let mut ctx = ExecutionContext::new("root", "plan-1");
        ctx.user_request = "  find the answer ".into();
        SingleStepPlanCreator::new("simple")
            .create_plan(&mut ctx, false)
            .await
            .unwrap();

        let plan = ctx.plan.unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].step_requirement, "find the answer");
        assert_eq!(plan.root_plan_id.as_deref(), Some("root"));
        assert_eq!(plan.current_plan_id.as_deref(), Some("plan-1"));
    }

    #[tokio::test]
    async fn test_empty_request_leaves_plan_unset() {
        let mut ctx = ExecutionContext::new("root", "root");
        SingleStepPlanCreator::new("simple")
            .create_plan(&mut ctx, false)
            .await
            .unwrap();
        assert!(ctx.plan.is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let registry = PlanCreatorRegistry::with_builtins();
        assert!(registry.resolve("unheard_of").is_ok());
        assert_eq!(registry.plan_types(), vec!["simple"]);
    }

    #[test]
    fn test_configured_default_type_is_the_fallback() {
        let mut registry = PlanCreatorRegistry::with_builtins().with_default_type(" Outline ");
        assert_eq!(registry.default_type(), "outline");
        // Nothing registered under the configured default yet.
        assert!(registry.resolve("unheard_of").is_err());

        registry.register("outline", Arc::new(SingleStepPlanCreator::new("outline")));
        assert!(registry.resolve("unheard_of").is_ok());

        let unchanged = PlanCreatorRegistry::with_builtins().with_default_type("  ");
        assert_eq!(unchanged.default_type(), "simple");
    }

    #[test]
    fn test_resolve_without_any_creator() {
        let registry = PlanCreatorRegistry::new();
        let err = registry.resolve("simple").err().unwrap();
        assert!(matches!(err, AppError::PlanCreation(_)));
    }
}
