use async_trait::async_trait;
use prepcast_core::{Context, Outcome};
use prepcast_steps::{Step, StepConfig, StepDescriptor};
use prepcast_store::QuestionStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Picks a random question from the store, optionally filtered by the
/// context's `subject`. Outputs `question`.
pub struct QuestionSelectionStep {
    descriptor: StepDescriptor,
    store: Arc<dyn QuestionStore>,
}

impl QuestionSelectionStep {
    pub const NAME: &'static str = "question_selection";

    pub fn new(name: &str, config: StepConfig, store: Arc<dyn QuestionStore>) -> Self {
        Self {
            descriptor: StepDescriptor::new(name, config),
            store,
        }
    }
}

#[async_trait]
impl Step for QuestionSelectionStep {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    async fn execute(&self, context: &Context) -> Outcome {
        let subject = context.get("subject").and_then(Value::as_str);

        let question = match self.store.random(subject).await {
            Ok(Some(q)) => q,
            Ok(None) => return Outcome::failure("No questions found in database"),
            Err(e) => {
                error!(error = %e, "Question lookup failed");
                return Outcome::failure(format!("Question selection failed: {e}"));
            }
        };

        info!(
            id = %question.id,
            subject = %question.subject,
            year = question.year,
            "Selected question"
        );

        match serde_json::to_value(&question) {
            Ok(value) => Outcome::success(Context::new()).with_value("question", value),
            Err(e) => Outcome::failure(format!("Question selection failed: {e}")),
        }
    }
}
