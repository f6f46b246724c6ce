//! Pipeline execution, adaptive strategy coordination and the engine that
//! composes them.
//!
//! A pipeline is an ordered list of step names. The executor runs them one at
//! a time, merging each step's output into a shared context and stopping at the
//! first failure. In adaptive mode the coordinator first scores the context,
//! picks a strategy and derives per-step configuration before delegating to the
//! same executor.
//!
//! # Main types
//!
//! - [`Engine`]: Composition root and caller-facing entry point.
//! - [`PipelineExecutor`]: Fail-fast sequential step runner.
//! - [`StrategyCoordinator`]: Analyze → plan → execute adaptive layer.
//! - [`StrategyProfiles`]: Strategy → per-step configuration table.

/// Adaptive analyze/plan/execute coordination.
pub mod coordinator;
/// Composition root.
pub mod engine;
/// Sequential fail-fast executor.
pub mod pipeline;
/// Default strategy profiles.
pub mod profiles;
/// Shared orchestration types (StrategyKind, Analysis, Plan, execution log).
pub mod types;

pub use coordinator::{subject_of, ComplexityHeuristic, StrategyCoordinator};
pub use engine::{Engine, EngineStatus};
pub use pipeline::{execute_guarded, PipelineExecutor};
pub use profiles::{StrategyProfiles, GENERATION_STEP, REASONING_STEP};
pub use types::{
    log_to_value, Analysis, ExecutionLogEntry, PipelineConfig, Plan, StrategyKind, EXECUTION_LOG,
};
