use crate::pipeline::{panic_message, PipelineExecutor};
use crate::profiles::StrategyProfiles;
use crate::types::{Analysis, PipelineConfig, Plan, StrategyKind};
use futures_util::FutureExt;
use prepcast_core::{Context, Outcome, PrepcastError, PrepcastResult};
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Declared, monotonic complexity heuristic.
///
/// Every factor only ever adds a non-negative weight to `base`, and the sum is
/// clamped to `[0.0, 1.0]`, so adding a factor can never lower the score.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexityHeuristic {
    pub base: f64,
    /// Question text longer than this many characters counts as long.
    pub long_text_chars: usize,
    pub long_text_weight: f64,
    /// Subject tag → weight. Matched case-insensitively.
    pub subject_weights: Vec<(String, f64)>,
    /// Matched case-insensitively as substrings of the question text.
    pub keywords: Vec<String>,
    pub keyword_weight: f64,
}

impl Default for ComplexityHeuristic {
    fn default() -> Self {
        Self {
            base: 0.3,
            long_text_chars: 200,
            long_text_weight: 0.2,
            subject_weights: vec![
                ("Quant".to_string(), 0.3),
                ("Logic".to_string(), 0.3),
                ("DI".to_string(), 0.2),
            ],
            keywords: ["calculate", "analyze", "determine", "derive", "prove"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            keyword_weight: 0.2,
        }
    }
}

impl ComplexityHeuristic {
    /// Score a context. Never fails; an empty context scores `base`.
    pub fn score(&self, context: &Context) -> f64 {
        let text = question_text(context).unwrap_or_default();
        let mut score = weight(self.base);

        if text.chars().count() > self.long_text_chars {
            score += weight(self.long_text_weight);
        }

        if let Some(subject) = subject_of(context) {
            score += self
                .subject_weights
                .iter()
                .find(|(tag, _)| tag.eq_ignore_ascii_case(subject))
                .map_or(0.0, |(_, w)| weight(*w));
        }

        let lowered = text.to_lowercase();
        if self
            .keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
        {
            score += weight(self.keyword_weight);
        }

        score.clamp(0.0, 1.0)
    }
}

fn weight(w: f64) -> f64 {
    if w.is_finite() {
        w.max(0.0)
    } else {
        0.0
    }
}

fn question_text(context: &Context) -> Option<&str> {
    context
        .get("question")
        .and_then(|q| q.get("question_text"))
        .and_then(Value::as_str)
}

/// Subject tag of the context: `question.subject`, else a top-level `subject`.
pub fn subject_of(context: &Context) -> Option<&str> {
    context
        .get("question")
        .and_then(|q| q.get("subject"))
        .and_then(Value::as_str)
        .or_else(|| context.get("subject").and_then(Value::as_str))
}

/// The adaptive layer: analyze → plan → execute.
///
/// The three phases always run together. Whatever happens inside them, the
/// caller receives an [`Outcome`]; errors and panics become a failing outcome
/// tagged with the session id and `agentic_mode`.
pub struct StrategyCoordinator {
    name: String,
    capabilities: Vec<String>,
    heuristic: ComplexityHeuristic,
    profiles: StrategyProfiles,
}

impl StrategyCoordinator {
    pub const ANALYSIS_CONFIDENCE: f64 = 0.85;
    pub const PLAN_CONFIDENCE: f64 = 0.90;
    pub const SUCCESS_CONFIDENCE: f64 = 0.88;
    pub const FAILURE_CONFIDENCE: f64 = 0.3;

    pub fn new() -> Self {
        Self {
            name: "intelligent_coordinator".to_string(),
            capabilities: vec![
                "analysis".to_string(),
                "strategy".to_string(),
                "execution".to_string(),
            ],
            heuristic: ComplexityHeuristic::default(),
            profiles: StrategyProfiles::default(),
        }
    }

    /// Replace the strategy table.
    pub fn with_profiles(mut self, profiles: StrategyProfiles) -> Self {
        self.profiles = profiles;
        self
    }

    /// Replace the complexity heuristic.
    pub fn with_heuristic(mut self, heuristic: ComplexityHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn profiles(&self) -> &StrategyProfiles {
        &self.profiles
    }

    /// Phase 1: score the context and recommend a strategy.
    pub fn analyze(&self, context: &Context) -> Analysis {
        let score = self.heuristic.score(context);
        let strategy = StrategyKind::from_score(score);
        let subject = subject_of(context).unwrap_or("unknown");

        info!(
            complexity = score,
            strategy = %strategy,
            "Coordinator Phase 1: content analysis"
        );

        Analysis {
            complexity_score: score,
            recommended_strategy: strategy,
            confidence: Self::ANALYSIS_CONFIDENCE,
            insight: format!(
                "Analyzed {subject} question with {:.0}% complexity",
                score * 100.0
            ),
        }
    }

    /// Phase 2: turn an analysis into a concrete per-step configuration.
    pub fn plan(&self, analysis: &Analysis) -> PrepcastResult<Plan> {
        let strategy = StrategyKind::from_score(analysis.complexity_score);
        let pipeline_config = self.profiles.config_for(strategy).cloned().ok_or_else(|| {
            PrepcastError::Coordination(format!("no profile for strategy '{strategy}'"))
        })?;

        info!(strategy = %strategy, "Coordinator Phase 2: strategy planned");

        Ok(Plan {
            strategy,
            pipeline_config,
            confidence: Self::PLAN_CONFIDENCE,
            estimated_time_secs: 45.0 + analysis.complexity_score * 30.0,
        })
    }

    /// Run all three phases over `steps`.
    ///
    /// `overrides` are laid over the plan's config key by key; the caller's
    /// values win.
    pub async fn run<S>(
        &self,
        executor: &PipelineExecutor,
        steps: &[S],
        initial: Context,
        overrides: Option<&PipelineConfig>,
    ) -> Outcome
    where
        S: AsRef<str> + Sync,
    {
        let session_id = Uuid::new_v4().to_string();
        info!(session = %session_id, "Starting adaptive pipeline");

        let guarded = AssertUnwindSafe(self.coordinate(
            executor,
            steps,
            initial.clone(),
            overrides,
            &session_id,
        ))
        .catch_unwind()
        .await;

        let fault = match guarded {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        error!(session = %session_id, error = %fault, "Adaptive pipeline failed");
        Outcome::failure(format!("Agentic pipeline error: {fault}"))
            .with_data(initial)
            .with_metadata("session_id", json!(session_id))
            .with_metadata("agentic_mode", json!(true))
    }

    async fn coordinate<S>(
        &self,
        executor: &PipelineExecutor,
        steps: &[S],
        initial: Context,
        overrides: Option<&PipelineConfig>,
        session_id: &str,
    ) -> PrepcastResult<Outcome>
    where
        S: AsRef<str> + Sync,
    {
        let analysis = self.analyze(&initial);
        let plan = self.plan(&analysis)?;

        let mut config = plan.pipeline_config.clone();
        if let Some(overrides) = overrides {
            overlay(&mut config, overrides);
        }

        info!(strategy = %plan.strategy, "Coordinator Phase 3: executing pipeline");
        let start = Instant::now();
        let mut outcome = executor.run(steps, initial, &config).await;
        let elapsed = start.elapsed().as_secs_f64();

        let confidence = if outcome.is_success() {
            Self::SUCCESS_CONFIDENCE
        } else {
            Self::FAILURE_CONFIDENCE
        };

        let metadata = outcome.metadata_mut();
        metadata.insert("session_id".into(), json!(session_id));
        metadata.insert("analysis".into(), serde_json::to_value(&analysis)?);
        metadata.insert("plan".into(), serde_json::to_value(&plan)?);
        metadata.insert("strategy_used".into(), json!(plan.strategy.as_str()));
        metadata.insert("execution_time".into(), json!(elapsed));
        metadata.insert("confidence".into(), json!(confidence));
        metadata.insert("agentic_mode".into(), json!(true));

        info!(
            session = %session_id,
            success = outcome.is_success(),
            confidence,
            elapsed_secs = elapsed,
            "Adaptive pipeline completed"
        );
        Ok(outcome)
    }
}

impl Default for StrategyCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Lay `overrides` over `base` one step setting at a time.
fn overlay(base: &mut PipelineConfig, overrides: &PipelineConfig) {
    for (step, settings) in overrides {
        let entry = base.entry(step.clone()).or_default();
        for (key, value) in settings {
            entry.insert(key.clone(), value.clone());
        }
    }
}
