//! Question storage for Prepcast.
//!
//! The selection step draws exam questions from a [`QuestionStore`]. Two
//! backends are provided: [`InMemoryQuestionStore`] for tests and ephemeral
//! runs, and [`SqliteQuestionStore`] for the persistent question bank.

/// Seed questions used by `prepcast setup`.
pub mod samples;
/// SQLite-backed store.
pub mod sqlite;
/// Store trait and in-memory backend.
pub mod store;

pub use samples::sample_questions;
pub use sqlite::SqliteQuestionStore;
pub use store::{InMemoryQuestionStore, QuestionStore};
