use async_trait::async_trait;
use parking_lot::RwLock;
use prepcast_core::{PrepcastResult, Question};
use rand::seq::SliceRandom;
use std::collections::BTreeSet;

/// Trait for question storage backends.
///
/// "Nothing matched" is `Ok(None)`, never an error.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Insert or replace a question by id.
    async fn store(&self, question: Question) -> PrepcastResult<()>;

    /// Fetch a question by id.
    async fn get(&self, id: &str) -> PrepcastResult<Option<Question>>;

    /// Pick a random question, optionally restricted to one subject.
    async fn random(&self, subject: Option<&str>) -> PrepcastResult<Option<Question>>;

    /// Number of stored questions.
    async fn count(&self) -> PrepcastResult<usize>;

    /// Distinct subjects, sorted.
    async fn subjects(&self) -> PrepcastResult<Vec<String>>;
}

/// In-memory store. Insertion order is kept; replacing an id keeps its slot.
pub struct InMemoryQuestionStore {
    questions: RwLock<Vec<Question>>,
}

impl InMemoryQuestionStore {
    pub fn new() -> Self {
        Self {
            questions: RwLock::new(Vec::new()),
        }
    }

    /// Build a store pre-filled with `questions`.
    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.questions.write();
            for q in questions {
                upsert(&mut guard, q);
            }
        }
        store
    }
}

impl Default for InMemoryQuestionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert(questions: &mut Vec<Question>, question: Question) {
    match questions.iter_mut().find(|q| q.id == question.id) {
        Some(slot) => *slot = question,
        None => questions.push(question),
    }
}

#[async_trait]
impl QuestionStore for InMemoryQuestionStore {
    async fn store(&self, question: Question) -> PrepcastResult<()> {
        upsert(&mut self.questions.write(), question);
        Ok(())
    }

    async fn get(&self, id: &str) -> PrepcastResult<Option<Question>> {
        Ok(self.questions.read().iter().find(|q| q.id == id).cloned())
    }

    async fn random(&self, subject: Option<&str>) -> PrepcastResult<Option<Question>> {
        let questions = self.questions.read();
        let candidates: Vec<&Question> = questions
            .iter()
            .filter(|q| subject.map_or(true, |s| q.subject == s))
            .collect();
        Ok(candidates
            .choose(&mut rand::thread_rng())
            .map(|q| (*q).clone()))
    }

    async fn count(&self) -> PrepcastResult<usize> {
        Ok(self.questions.read().len())
    }

    async fn subjects(&self) -> PrepcastResult<Vec<String>> {
        let subjects: BTreeSet<String> = self
            .questions
            .read()
            .iter()
            .map(|q| q.subject.clone())
            .collect();
        Ok(subjects.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::sample_questions;

    #[tokio::test]
    async fn test_store_and_get() {
        let store = InMemoryQuestionStore::new();
        for q in sample_questions() {
            store.store(q).await.unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 3);
        let q = store.get("cat_2023_logic_001").await.unwrap().unwrap();
        assert_eq!(q.subject, "Logic");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_replaces_by_id() {
        let store = InMemoryQuestionStore::with_questions(sample_questions());
        let mut q = store.get("cat_2023_quant_001").await.unwrap().unwrap();
        q.difficulty = Some("Hard".into());
        store.store(q).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
        let q = store.get("cat_2023_quant_001").await.unwrap().unwrap();
        assert_eq!(q.difficulty.as_deref(), Some("Hard"));
    }

    #[tokio::test]
    async fn test_random_respects_subject() {
        let store = InMemoryQuestionStore::with_questions(sample_questions());
        for _ in 0..10 {
            let q = store.random(Some("Verbal")).await.unwrap().unwrap();
            assert_eq!(q.subject, "Verbal");
        }
        assert!(store.random(Some("DI")).await.unwrap().is_none());
        assert!(store.random(None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = InMemoryQuestionStore::new();
        assert!(store.random(None).await.unwrap().is_none());
        assert!(store.subjects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subjects_sorted_and_distinct() {
        let mut questions = sample_questions();
        questions.push(Question {
            id: "extra".into(),
            ..questions[0].clone()
        });
        let store = InMemoryQuestionStore::with_questions(questions);
        assert_eq!(
            store.subjects().await.unwrap(),
            vec!["Logic", "Quant", "Verbal"]
        );
    }
}
