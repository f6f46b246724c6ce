use crate::input::{question_input, text};
use crate::render::ArtifactRenderer;
use async_trait::async_trait;
use prepcast_core::{Context, Outcome};
use prepcast_steps::{Step, StepConfig, StepDescriptor};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Renders the explanation into an artifact. Requires `question` and
/// `formatted_explanation`; outputs `video_path`.
pub struct VideoGenerationStep {
    descriptor: StepDescriptor,
    renderer: Arc<dyn ArtifactRenderer>,
}

impl VideoGenerationStep {
    pub const NAME: &'static str = "video_generation";

    pub fn new(name: &str, config: StepConfig, renderer: Arc<dyn ArtifactRenderer>) -> Self {
        Self {
            descriptor: StepDescriptor::new(name, config),
            renderer,
        }
    }
}

#[async_trait]
impl Step for VideoGenerationStep {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    async fn execute(&self, context: &Context) -> Outcome {
        let question = match question_input(context, &["question", "formatted_explanation"]) {
            Ok(q) => q,
            Err(failure) => return failure,
        };
        let explanation = text(context, "formatted_explanation");
        if explanation.trim().is_empty() {
            return Outcome::failure("formatted_explanation is empty");
        }

        match self.renderer.render(&question, explanation).await {
            Ok(path) => {
                info!(path = %path.display(), "Artifact generated");
                Outcome::success(Context::new())
                    .with_value("video_path", json!(path.display().to_string()))
            }
            Err(e) => {
                error!(error = %e, "Rendering failed");
                Outcome::failure(format!("Video generation failed: {e}"))
            }
        }
    }
}
