use prepcast_steps::StepConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Metadata key holding the per-step execution log of a run.
pub const EXECUTION_LOG: &str = "execution_log";

/// Per-step configuration overrides for one pipeline run, keyed by step name.
pub type PipelineConfig = BTreeMap<String, StepConfig>;

/// One record per step actually invoked during a run, in invocation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub step_name: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ExecutionLogEntry {
    pub fn new(step_name: impl Into<String>, success: bool, error: Option<String>) -> Self {
        Self {
            step_name: step_name.into(),
            success,
            error,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "step_name": self.step_name,
            "success": self.success,
            "error": self.error,
        })
    }
}

/// Render a log as the JSON array stored under [`EXECUTION_LOG`].
pub fn log_to_value(log: &[ExecutionLogEntry]) -> Value {
    Value::Array(log.iter().map(ExecutionLogEntry::to_value).collect())
}

/// Class of processing behaviour chosen from a complexity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Slower, more thorough processing for complex input.
    Quality,
    /// Middle ground.
    Balanced,
    /// Fast processing for simple input.
    Performance,
}

impl StrategyKind {
    /// Above this score the quality strategy is chosen.
    pub const QUALITY_THRESHOLD: f64 = 0.7;
    /// Below this score the performance strategy is chosen.
    pub const PERFORMANCE_THRESHOLD: f64 = 0.4;

    /// Pure mapping from a complexity score to a strategy.
    pub fn from_score(score: f64) -> Self {
        if score > Self::QUALITY_THRESHOLD {
            StrategyKind::Quality
        } else if score < Self::PERFORMANCE_THRESHOLD {
            StrategyKind::Performance
        } else {
            StrategyKind::Balanced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Quality => "quality",
            StrategyKind::Balanced => "balanced",
            StrategyKind::Performance => "performance",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the analyze phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// In `[0.0, 1.0]`.
    pub complexity_score: f64,
    #[serde(rename = "recommended_strategy_name")]
    pub recommended_strategy: StrategyKind,
    pub confidence: f64,
    #[serde(rename = "insight_text")]
    pub insight: String,
}

/// Output of the plan phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "strategy_name")]
    pub strategy: StrategyKind,
    pub pipeline_config: PipelineConfig,
    pub confidence: f64,
    /// Seconds.
    #[serde(rename = "estimated_time")]
    pub estimated_time_secs: f64,
}
