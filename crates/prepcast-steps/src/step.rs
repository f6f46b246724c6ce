use async_trait::async_trait;
use prepcast_core::{Context, Outcome};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Per-step configuration. Empty means "defaults".
pub type StepConfig = Map<String, Value>;

/// Identity and configuration of a step instance.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDescriptor {
    pub name: String,
    pub config: StepConfig,
}

impl StepDescriptor {
    pub fn new(name: impl Into<String>, config: StepConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn f64_param(&self, key: &str) -> Option<f64> {
        self.config.get(key).and_then(Value::as_f64)
    }

    pub fn u64_param(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(Value::as_u64)
    }
}

/// Trait that every processing unit implements.
///
/// `execute` receives the accumulated context read-only and reports new or
/// refined keys in the returned [`Outcome`]'s data; the executor performs the
/// merge. Implementations validate their own preconditions and turn internal
/// errors into a failing outcome instead of panicking.
#[async_trait]
pub trait Step: Send + Sync {
    /// Identity and configuration of this instance.
    fn descriptor(&self) -> &StepDescriptor;

    /// Stable name used for registry lookup and logging.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Configuration this instance was built with.
    fn config(&self) -> &StepConfig {
        &self.descriptor().config
    }

    /// Run the step against the current context.
    async fn execute(&self, context: &Context) -> Outcome;
}

/// Keys from `required` that are absent from `context`, in the given order.
pub fn missing_keys<'a>(context: &Context, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|key| !context.contains_key(*key))
        .collect()
}

type StepFn = Arc<dyn Fn(&StepDescriptor, &Context) -> Outcome + Send + Sync>;

/// A step backed by a synchronous closure.
pub struct FnStep {
    descriptor: StepDescriptor,
    run: StepFn,
}

impl FnStep {
    pub fn new<F>(name: impl Into<String>, config: StepConfig, run: F) -> Self
    where
        F: Fn(&StepDescriptor, &Context) -> Outcome + Send + Sync + 'static,
    {
        Self {
            descriptor: StepDescriptor::new(name, config),
            run: Arc::new(run),
        }
    }
}

#[async_trait]
impl Step for FnStep {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    async fn execute(&self, context: &Context) -> Outcome {
        (self.run)(&self.descriptor, context)
    }
}
