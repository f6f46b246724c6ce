//! Core types and error definitions for the Prepcast pipeline.
//!
//! This crate provides the foundational types shared across all Prepcast crates,
//! including error handling, the uniform step/pipeline result envelope, and the
//! exam question record that the standard pipeline turns into a video.
//!
//! # Main types
//!
//! - [`PrepcastError`]: Unified error enum for all Prepcast subsystems.
//! - [`PrepcastResult`]: Convenience alias for `Result<T, PrepcastError>`.
//! - [`Context`]: The insertion-ordered key/value map threaded through a pipeline.
//! - [`Outcome`]: The success/failure/data/metadata envelope every step returns.
//! - [`Question`]: A multiple-choice exam question.

/// The result envelope shared by steps and pipelines.
pub mod outcome;
/// Exam question record.
pub mod question;

pub use outcome::{Context, Outcome};
pub use question::Question;

// --- Error types ---

/// Top-level error type for the Prepcast workspace.
///
/// Each variant corresponds to a subsystem that can produce errors. None of
/// these cross the engine's entry point: the orchestrator turns them into a
/// failing [`Outcome`].
#[derive(Debug, thiserror::Error)]
pub enum PrepcastError {
    /// No factory is registered under the requested step name.
    #[error("Step not found: {0}")]
    StepNotFound(String),

    /// A registered factory refused to build a step instance.
    #[error("Failed to construct step '{name}': {reason}")]
    StepConstruction {
        /// Name the step was requested under.
        name: String,
        /// Why construction failed.
        reason: String,
    },

    /// An error raised by a step while running.
    #[error("Step error: {0}")]
    Step(String),

    /// An error from the pipeline executor.
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// An error from the strategy coordinator (analyze, plan or execute phase).
    #[error("Coordination error: {0}")]
    Coordination(String),

    /// An error from the question store.
    #[error("Store error: {0}")]
    Store(String),

    /// An error from an outbound HTTP request (LLM or search API).
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`PrepcastError`].
pub type PrepcastResult<T> = Result<T, PrepcastError>;
