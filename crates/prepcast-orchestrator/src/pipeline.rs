use crate::types::{log_to_value, ExecutionLogEntry, PipelineConfig, EXECUTION_LOG};
use futures_util::FutureExt;
use prepcast_core::{Context, Outcome, PrepcastError, PrepcastResult};
use prepcast_steps::{Step, StepConfig, StepRegistry};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info};

/// Drives an ordered sequence of steps through the registry.
///
/// Steps run strictly one after another. Each successful step's data is
/// merged into the running context (last write wins); the first failure halts
/// the run and the context accumulated so far is returned with it.
pub struct PipelineExecutor {
    registry: Arc<StepRegistry>,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    /// Run `steps` in order starting from `initial`.
    ///
    /// `per_step` supplies configuration for the named steps; steps without an
    /// entry use their cached default instance.
    pub async fn run<S>(&self, steps: &[S], initial: Context, per_step: &PipelineConfig) -> Outcome
    where
        S: AsRef<str> + Sync,
    {
        if steps.is_empty() {
            return Outcome::failure("no steps specified")
                .with_metadata(EXECUTION_LOG, log_to_value(&[]));
        }

        let mut context = initial;
        let mut log: Vec<ExecutionLogEntry> = Vec::with_capacity(steps.len());

        info!(steps = steps.len(), "Starting pipeline");

        for name in steps {
            let name = name.as_ref();

            let step = match instantiate(&self.registry, name, per_step.get(name).cloned()) {
                Ok(step) => step,
                Err(e) => {
                    let cause = format!("failed to create step: {e}");
                    error!(step = %name, error = %e, "Pipeline stopped: step could not be created");
                    log.push(ExecutionLogEntry::new(name, false, Some(cause.clone())));
                    return halt(context, &log, format!("Step {name} failed: {cause}"));
                }
            };

            let outcome = execute_guarded(step.as_ref(), &context).await;
            log.push(ExecutionLogEntry::new(
                name,
                outcome.is_success(),
                outcome.error().map(str::to_string),
            ));

            if !outcome.is_success() {
                let cause = outcome.error().unwrap_or("no error reported");
                error!(step = %name, error = %cause, "Pipeline stopped at failing step");
                return halt(context, &log, format!("Step {name} failed: {cause}"));
            }

            for (key, value) in outcome.into_data() {
                context.insert(key, value);
            }
        }

        info!(steps = log.len(), "Pipeline completed successfully");
        Outcome::success(context).with_metadata(EXECUTION_LOG, log_to_value(&log))
    }
}

/// Resolve a step from the registry, treating a panicking factory as a
/// construction failure.
pub(crate) fn instantiate(
    registry: &StepRegistry,
    name: &str,
    config: Option<StepConfig>,
) -> PrepcastResult<Arc<dyn Step>> {
    std::panic::catch_unwind(AssertUnwindSafe(|| registry.create(name, config))).unwrap_or_else(
        |panic| {
            Err(PrepcastError::StepConstruction {
                name: name.to_string(),
                reason: panic_message(panic.as_ref()),
            })
        },
    )
}

/// Run one step behind a fault barrier: a panic inside `execute` becomes a
/// failing outcome carrying the panic message.
pub async fn execute_guarded(step: &dyn Step, context: &Context) -> Outcome {
    info!(step = %step.name(), "Starting step");
    let outcome = match AssertUnwindSafe(step.execute(context)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Outcome::failure(format!(
            "Exception in step {}: {}",
            step.name(),
            panic_message(panic.as_ref())
        )),
    };
    if outcome.is_success() {
        info!(step = %step.name(), "Step completed with status: SUCCESS");
    } else {
        error!(
            step = %step.name(),
            error = outcome.error().unwrap_or_default(),
            "Step completed with status: FAILED"
        );
    }
    outcome
}

fn halt(context: Context, log: &[ExecutionLogEntry], error: String) -> Outcome {
    Outcome::failure(error)
        .with_data(context)
        .with_metadata(EXECUTION_LOG, log_to_value(log))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
