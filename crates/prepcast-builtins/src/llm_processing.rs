use crate::input::{question_input, text};
use crate::llm::{GenerationRequest, TextGenerator};
use async_trait::async_trait;
use prepcast_core::{Context, Outcome, PrepcastError, PrepcastResult, Question};
use prepcast_steps::{Step, StepConfig, StepDescriptor};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str =
    "You are an expert exam tutor who writes clear, step-by-step explanations for video narration.";

/// Turns the question and reasoning context into a formatted explanation.
/// Requires `question` and `reasoning_text`; outputs `formatted_explanation`
/// and `explanation_source` (`llm` or `template`).
///
/// Config: `temperature` (0.0..=2.0, default 0.7), `max_tokens` (default 800).
pub struct LlmProcessingStep {
    descriptor: StepDescriptor,
    generator: Option<Arc<dyn TextGenerator>>,
    temperature: f64,
    max_tokens: u64,
}

impl LlmProcessingStep {
    pub const NAME: &'static str = "llm_processing";
    const DEFAULT_TEMPERATURE: f64 = 0.7;
    const DEFAULT_MAX_TOKENS: u64 = 800;

    /// Without a generator every explanation comes from the template.
    pub fn new(
        name: &str,
        config: StepConfig,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> PrepcastResult<Self> {
        let descriptor = StepDescriptor::new(name, config);
        let temperature = descriptor
            .f64_param("temperature")
            .unwrap_or(Self::DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(PrepcastError::StepConstruction {
                name: name.to_string(),
                reason: format!("temperature {temperature} outside 0.0..=2.0"),
            });
        }
        let max_tokens = descriptor
            .u64_param("max_tokens")
            .unwrap_or(Self::DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(PrepcastError::StepConstruction {
                name: name.to_string(),
                reason: "max_tokens must be positive".to_string(),
            });
        }
        Ok(Self {
            descriptor,
            generator,
            temperature,
            max_tokens,
        })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u64 {
        self.max_tokens
    }
}

#[async_trait]
impl Step for LlmProcessingStep {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    async fn execute(&self, context: &Context) -> Outcome {
        let question = match question_input(context, &["question", "reasoning_text"]) {
            Ok(q) => q,
            Err(failure) => return failure,
        };
        let reasoning = text(context, "reasoning_text");

        let generated = match &self.generator {
            Some(generator) => {
                let request = GenerationRequest {
                    system_prompt: Some(SYSTEM_PROMPT.to_string()),
                    prompt: build_prompt(&question, reasoning),
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                };
                match generator.generate(&request).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!(error = %e, "Generation failed, using template explanation");
                        None
                    }
                }
            }
            None => None,
        };

        let (explanation, source) = match generated {
            Some(text) => (text, "llm"),
            None => (fallback_explanation(&question, reasoning), "template"),
        };
        info!(source, chars = explanation.len(), "Explanation ready");

        Outcome::success(Context::new())
            .with_value("formatted_explanation", json!(explanation))
            .with_value("explanation_source", json!(source))
    }
}

fn context_or(reasoning: &str, default: &str) -> String {
    if reasoning.trim().is_empty() {
        default.to_string()
    } else {
        reasoning.to_string()
    }
}

/// Prompt asking for a narration-friendly, step-by-step explanation.
pub fn build_prompt(question: &Question, reasoning: &str) -> String {
    format!(
        "Create a clear, educational explanation for this CAT {subject} question.\n\n\
         **Question:**\n{text}\n\n\
         **Options:**\n{options}\n\n\
         **Correct Answer:** {answer}\n\n\
         **Additional Context:**\n{context}\n\n\
         **Instructions:**\n\
         1. Give a step-by-step solution that is easy to follow\n\
         2. Explain the reasoning behind each step\n\
         3. Keep it suitable for slideshow narration\n\
         4. Say why the other options are wrong where relevant\n\
         5. Be concise but complete, in simple language\n\n\
         Format the response with clear sections and bullet points.",
        subject = question.subject,
        text = question.question_text,
        options = question.formatted_options(),
        answer = question.correct_answer,
        context = context_or(
            reasoning,
            "Use the standard problem-solving approach for this type of question."
        ),
    )
}

/// Markdown explanation used when no generator is configured or it fails.
pub fn fallback_explanation(question: &Question, reasoning: &str) -> String {
    format!(
        "# {subject} Question Explanation\n\n\
         ## Question\n{text}\n\n\
         ## Answer Options\n{options}\n\n\
         ## Correct Answer: {answer}\n\n\
         ## Solution Approach\n{approach}\n\n\
         ## Key Points\n\
         - Read the question carefully\n\
         - Apply the relevant concepts\n\
         - Eliminate incorrect options\n\
         - Verify the answer\n\n\
         *Note: configure an LLM API key for detailed step-by-step solutions.*\n",
        subject = question.subject,
        text = question.question_text,
        options = question.formatted_options(),
        answer = question.correct_answer,
        approach = context_or(
            reasoning,
            "Follow systematic problem-solving steps for this question type."
        ),
    )
}
