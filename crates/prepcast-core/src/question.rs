use serde::{Deserialize, Serialize};

/// A multiple-choice exam question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier, e.g. `cat_2023_quant_001`.
    pub id: String,
    /// Subject tag: `Quant`, `Verbal`, `Logic`, `DI`, ...
    pub subject: String,
    /// Exam year.
    pub year: i32,
    /// Body text of the question.
    pub question_text: String,
    /// Answer options in display order (A, B, C, ...).
    pub options: Vec<String>,
    /// Letter of the correct option.
    pub correct_answer: String,
    /// Optional topic within the subject.
    #[serde(default)]
    pub topic: Option<String>,
    /// Optional difficulty label.
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl Question {
    /// Letter label for the option at `index` (`0 -> 'A'`).
    pub fn option_letter(index: usize) -> char {
        u8::try_from(index)
            .ok()
            .and_then(|i| b'A'.checked_add(i))
            .map(char::from)
            .unwrap_or('?')
    }

    /// Text of the option marked correct, if the marker points at an option.
    pub fn correct_option_text(&self) -> Option<&str> {
        let letter = self.correct_answer.trim().chars().next()?.to_ascii_uppercase();
        let index = (letter as usize).checked_sub('A' as usize)?;
        self.options.get(index).map(String::as_str)
    }

    /// Options rendered one per line as `A. text`.
    pub fn formatted_options(&self) -> String {
        self.options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}. {opt}", Self::option_letter(i)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
