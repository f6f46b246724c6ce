use crate::coordinator::StrategyCoordinator;
use crate::pipeline::{execute_guarded, instantiate, PipelineExecutor};
use crate::types::PipelineConfig;
use prepcast_core::{Context, Outcome, PrepcastResult};
use prepcast_steps::{Step, StepConfig, StepRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Introspection snapshot returned by [`Engine::status`].
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub available_steps: Vec<String>,
    pub cached_instances: usize,
    pub coordinator: String,
    pub capabilities: Vec<String>,
}

/// Composition root: one registry, one executor, one coordinator.
///
/// Construct once at start-up and share by reference. Nothing returned from
/// [`Engine::run_pipeline`] or [`Engine::run_step`] is an error; every failure
/// is a failing [`Outcome`].
pub struct Engine {
    registry: Arc<StepRegistry>,
    executor: PipelineExecutor,
    coordinator: StrategyCoordinator,
}

impl Engine {
    /// Create an engine with an empty registry and the default coordinator.
    pub fn new() -> Self {
        Self::with_coordinator(StrategyCoordinator::new())
    }

    /// Create an engine with a custom coordinator.
    pub fn with_coordinator(coordinator: StrategyCoordinator) -> Self {
        let registry = Arc::new(StepRegistry::new());
        Self {
            executor: PipelineExecutor::new(registry.clone()),
            registry,
            coordinator,
        }
    }

    /// Register (or replace) a step factory.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&str, StepConfig) -> PrepcastResult<Arc<dyn Step>> + Send + Sync + 'static,
    {
        self.registry.register(name, factory);
    }

    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    pub fn coordinator(&self) -> &StrategyCoordinator {
        &self.coordinator
    }

    /// Run `steps` in order.
    ///
    /// With `adaptive` false the executor runs directly with `per_step`.
    /// With `adaptive` true the coordinator picks a strategy first and
    /// `per_step` is laid over the strategy's config.
    pub async fn run_pipeline<S>(
        &self,
        steps: &[S],
        initial: Option<Context>,
        per_step: Option<&PipelineConfig>,
        adaptive: bool,
    ) -> Outcome
    where
        S: AsRef<str> + Sync,
    {
        let initial = initial.unwrap_or_default();
        if adaptive {
            self.coordinator
                .run(&self.executor, steps, initial, per_step)
                .await
        } else {
            let empty = PipelineConfig::new();
            self.executor
                .run(steps, initial, per_step.unwrap_or(&empty))
                .await
        }
    }

    /// Run a single step outside a pipeline, behind the same fault barrier.
    pub async fn run_step(
        &self,
        name: &str,
        input: Context,
        config: Option<StepConfig>,
    ) -> Outcome {
        if !self.registry.contains(name) {
            warn!(step = %name, "Step not found");
            return Outcome::failure(format!("step not found: {name}"));
        }
        match instantiate(&self.registry, name, config) {
            Ok(step) => execute_guarded(step.as_ref(), &input).await,
            Err(e) => Outcome::failure(format!("failed to create step: {e}")),
        }
    }

    pub fn status(&self) -> EngineStatus {
        let status = EngineStatus {
            available_steps: self.registry.list_names(),
            cached_instances: self.registry.cached_count(),
            coordinator: self.coordinator.name().to_string(),
            capabilities: self.coordinator.capabilities().to_vec(),
        };
        info!(steps = status.available_steps.len(), "Engine status requested");
        status
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
