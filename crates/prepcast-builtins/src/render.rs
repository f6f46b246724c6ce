use async_trait::async_trait;
use chrono::Utc;
use prepcast_core::{PrepcastResult, Question};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Turns a question and its explanation into an artifact on disk.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    /// Returns the path of the produced artifact.
    async fn render(&self, question: &Question, explanation: &str) -> PrepcastResult<PathBuf>;
}

/// Writes a slide-by-slide storyboard with narration script as a markdown
/// file under `<output_dir>/videos`.
pub struct StoryboardRenderer {
    videos_dir: PathBuf,
}

impl StoryboardRenderer {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            videos_dir: output_dir.as_ref().join("videos"),
        }
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    fn file_name() -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!(
            "cat_question_{}_{}.storyboard.md",
            Utc::now().format("%Y%m%d_%H%M%S"),
            &id[..8]
        )
    }
}

#[async_trait]
impl ArtifactRenderer for StoryboardRenderer {
    async fn render(&self, question: &Question, explanation: &str) -> PrepcastResult<PathBuf> {
        tokio::fs::create_dir_all(&self.videos_dir).await?;
        let path = self.videos_dir.join(Self::file_name());
        tokio::fs::write(&path, storyboard(question, explanation)).await?;
        info!(path = %path.display(), "Storyboard written");
        Ok(path)
    }
}

/// Markdown storyboard: question slide, options slide, explanation slide,
/// narration script.
pub fn storyboard(question: &Question, explanation: &str) -> String {
    format!(
        "# {subject} ({year})\n\n\
         ## Slide 1: Question\n\n{text}\n\n\
         ## Slide 2: Options\n\n{options}\n\n\
         ## Slide 3: Explanation\n\n{explanation}\n\n\
         ## Narration\n\n{narration}\n",
        subject = question.subject,
        year = question.year,
        text = question.question_text,
        options = question.formatted_options(),
        explanation = explanation.trim(),
        narration = narration(explanation),
    )
}

/// Spoken version of an explanation: markdown stripped, lines joined.
pub fn narration(explanation: &str) -> String {
    let spoken = explanation
        .lines()
        .map(|line| line.replace(['#', '*'], "").trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with("---"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("Let's solve this question step by step. {spoken} This completes our solution.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question {
            id: "q".into(),
            subject: "Logic".into(),
            year: 2023,
            question_text: "What comes next: 1, 2, 3, 5?".into(),
            options: vec!["7".into(), "8".into()],
            correct_answer: "B".into(),
            topic: None,
            difficulty: None,
        }
    }

    #[test]
    fn test_narration_strips_markdown() {
        let spoken = narration("# Title\n\n**Step 1:** add\n---\n* done");
        assert_eq!(
            spoken,
            "Let's solve this question step by step. \
             Title Step 1: add done This completes our solution."
        );
    }

    #[test]
    fn test_storyboard_has_all_slides() {
        let board = storyboard(&question(), "## Answer B\nIt is 8.");
        assert!(board.starts_with("# Logic (2023)"));
        assert!(board.contains("A. 7\nB. 8"));
        assert!(board.contains("## Slide 3: Explanation\n\n## Answer B"));
        assert!(board.contains("## Narration"));
    }

    #[tokio::test]
    async fn test_render_writes_under_videos_dir() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = StoryboardRenderer::new(dir.path());

        let path = renderer.render(&question(), "It is 8.").await.unwrap();
        assert!(path.starts_with(dir.path().join("videos")));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("It is 8."));

        let second = renderer.render(&question(), "again").await.unwrap();
        assert_ne!(path, second);
    }
}
