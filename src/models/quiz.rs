//! Weekly quiz data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quiz difficulty setting, stored per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Normalize a raw stored value; anything unrecognized is `Medium`.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some("easy") => Self::Easy,
            Some("hard") => Self::Hard,
            _ => Self::Medium,
        }
    }

    /// Lowercase label used in prompts and stored documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Where a generated question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Synthesized by the language model
    Model,
    /// Deterministic fallback content
    Fallback,
}

/// A single quiz question, year-locked to its quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Target year; must equal the quiz's year
    pub year: i32,

    /// Question text (non-empty)
    pub question: String,

    /// Exactly 4 answer options
    pub options: Vec<String>,

    /// Index of the correct option, 0-3
    pub answer_index: u8,

    /// Short explanation shown after answering
    pub explanation: String,

    /// Model-generated or deterministic fallback
    pub provenance: Provenance,
}

/// Aggregate provenance counts for a quiz definition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub model_count: u32,
    pub fallback_count: u32,
}

/// A full weekly quiz, owned by a (group, week) pair.
///
/// Always regenerated wholesale; never partially patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDefinition {
    pub year: i32,
    pub difficulty: Difficulty,

    /// Deterministic digest of (group, week, year, difficulty)
    pub seed: String,

    pub week_id: String,

    /// Exactly 20 year-locked questions
    pub questions: Vec<QuizQuestion>,

    pub source_summary: SourceSummary,

    /// Uid of the caller that triggered generation
    pub generated_by: String,

    /// Model label kept for diagnostics
    pub model: String,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_normalize() {
        assert_eq!(Difficulty::normalize(Some("easy")), Difficulty::Easy);
        assert_eq!(Difficulty::normalize(Some("hard")), Difficulty::Hard);
        assert_eq!(Difficulty::normalize(Some("extreme")), Difficulty::Medium);
        assert_eq!(Difficulty::normalize(None), Difficulty::Medium);
    }

    #[test]
    fn test_question_serializes_camel_case() {
        let question = QuizQuestion {
            year: 1994,
            question: "Q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            answer_index: 2,
            explanation: "E".into(),
            provenance: Provenance::Model,
        };
        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value["answerIndex"], 2);
        assert_eq!(value["provenance"], "model");
    }
}
