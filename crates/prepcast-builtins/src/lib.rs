//! Built-in steps for the Prepcast pipeline.
//!
//! The standard pipeline turns a stored exam question into an explanation
//! artifact:
//!
//! `question_selection → reasoning_extraction → llm_processing → video_generation`
//!
//! Each step depends on a collaborator behind a trait so the pipeline can run
//! offline: [`QuestionStore`](prepcast_store::QuestionStore),
//! [`ContextSearcher`], [`TextGenerator`] and [`ArtifactRenderer`].
//!
//! # Main entry points
//!
//! - [`register_builtins()`]: Register the four standard steps on an engine.
//! - [`BuiltinServices`]: The collaborators the steps are built with.
//! - [`STANDARD_PIPELINE`]: Step names of the standard pipeline, in order.

mod input;

/// Text generation collaborator with OpenAI and Anthropic clients.
pub mod llm;
/// Explanation generation step.
pub mod llm_processing;
/// Question selection step.
pub mod question_selection;
/// Reasoning extraction step.
pub mod reasoning_extraction;
/// Artifact rendering collaborator and storyboard renderer.
pub mod render;
/// Web search collaborator and Google Custom Search client.
pub mod search;
/// Artifact generation step.
pub mod video_generation;

pub use llm::{
    AnthropicGenerator, GenerationRequest, OpenAiGenerator, TextGenerator,
    DEFAULT_GENERATION_TIMEOUT,
};
pub use llm_processing::LlmProcessingStep;
pub use question_selection::QuestionSelectionStep;
pub use reasoning_extraction::{ReasoningExtractionStep, SearchDepth};
pub use render::{ArtifactRenderer, StoryboardRenderer};
pub use search::{ContextSearcher, GoogleSearcher, NoopSearcher, SearchHit};
pub use video_generation::VideoGenerationStep;

use prepcast_core::PrepcastResult;
use prepcast_orchestrator::Engine;
use prepcast_steps::{Step, StepConfig};
use prepcast_store::QuestionStore;
use std::sync::Arc;

/// Step names of the standard pipeline, in execution order.
pub const STANDARD_PIPELINE: [&str; 4] = [
    QuestionSelectionStep::NAME,
    ReasoningExtractionStep::NAME,
    LlmProcessingStep::NAME,
    VideoGenerationStep::NAME,
];

/// Collaborators shared by every instance the built-in factories create.
#[derive(Clone)]
pub struct BuiltinServices {
    pub store: Arc<dyn QuestionStore>,
    pub searcher: Arc<dyn ContextSearcher>,
    /// `None` means explanations always come from the template.
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub renderer: Arc<dyn ArtifactRenderer>,
}

/// Register the four standard steps on `engine`.
pub fn register_builtins(engine: &Engine, services: BuiltinServices) {
    let store = services.store;
    engine.register(
        QuestionSelectionStep::NAME,
        move |name: &str, config: StepConfig| -> PrepcastResult<Arc<dyn Step>> {
            Ok(Arc::new(QuestionSelectionStep::new(name, config, store.clone())))
        },
    );

    let searcher = services.searcher;
    engine.register(
        ReasoningExtractionStep::NAME,
        move |name: &str, config: StepConfig| -> PrepcastResult<Arc<dyn Step>> {
            Ok(Arc::new(ReasoningExtractionStep::new(
                name,
                config,
                searcher.clone(),
            )?))
        },
    );

    let generator = services.generator;
    engine.register(
        LlmProcessingStep::NAME,
        move |name: &str, config: StepConfig| -> PrepcastResult<Arc<dyn Step>> {
            Ok(Arc::new(LlmProcessingStep::new(
                name,
                config,
                generator.clone(),
            )?))
        },
    );

    let renderer = services.renderer;
    engine.register(
        VideoGenerationStep::NAME,
        move |name: &str, config: StepConfig| -> PrepcastResult<Arc<dyn Step>> {
            Ok(Arc::new(VideoGenerationStep::new(
                name,
                config,
                renderer.clone(),
            )))
        },
    );
}
