//! Core types for the test-taking engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Question answer format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    /// Single correct option key.
    #[serde(rename = "MCQ")]
    Mcq,
    /// One or more correct option keys, all required.
    #[serde(rename = "MSQ")]
    Msq,
    /// Free numeric answer checked against an inclusive range.
    #[serde(rename = "NAT", alias = "ShortAnswer")]
    Numeric,
}

impl QuestionKind {
    /// Parse the wire tag, case-insensitively. The remote store has used
    /// both `ShortAnswer` and `NAT` for numeric questions over time.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "MCQ" => Some(Self::Mcq),
            "MSQ" => Some(Self::Msq),
            "NAT" | "SHORTANSWER" => Some(Self::Numeric),
            _ => None,
        }
    }
}

/// Inclusive acceptance range for numeric answers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub from: f64,
    pub to: f64,
}

impl NumericRange {
    /// Both boundaries are accepted.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.from && value <= self.to
    }
}

/// Optional worked explanation shown after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Explanation {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image_url: String,
}

impl Explanation {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.image_url.is_empty()
    }
}

/// A single question. Choice questions carry `options` and `correct_keys`;
/// numeric questions carry `numeric_range` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub image: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub correct_keys: BTreeSet<String>,
    #[serde(default)]
    pub numeric_range: Option<NumericRange>,
    pub marks: f64,
    #[serde(default)]
    pub negative_marks: f64,
    #[serde(default)]
    pub explanation: Option<Explanation>,
}

impl Question {
    pub fn has_explanation(&self) -> bool {
        self.explanation.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// An ordered group of questions with section-level default marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub default_marks: f64,
    #[serde(default)]
    pub default_negative_marks: f64,
    pub questions: Vec<Question>,
}

/// A test as loaded for an attempt. Immutable once decoded; section and
/// question order are stable for the lifetime of the attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: String,
    /// Attempt duration in minutes.
    pub duration_minutes: u32,
    #[serde(default)]
    pub total_marks: f64,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub max_attempts: u32,
}

impl Test {
    /// All questions in flat traversal order: section order, then question
    /// order within each section.
    pub fn all_questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
            && !self.title.is_empty()
            && self.duration_minutes > 0
            && !self.sections.is_empty()
    }
}

/// Final typed answer for one question, decided by the question's declared
/// kind rather than by sniffing the runtime shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// MSQ: the submitted option keys as an order-insensitive set.
    Multiple(BTreeSet<String>),
    /// Numeric: the parsed value.
    Numeric(f64),
    /// MCQ: the single submitted option key.
    Single(String),
    /// Numeric answer that failed to parse, kept verbatim. The untagged
    /// representation cannot distinguish this from `Single` on the wire, so
    /// a stored `Unparsed` reads back as `Single`; the distinction exists
    /// only between scoring and the first serialization.
    Unparsed(String),
}

/// A scored, persisted attempt. `answers` holds the final per-question
/// values; questions with no recorded answer are absent from the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAttempt {
    pub id: String,
    pub test_id: String,
    pub test_title: String,
    pub student_id: String,
    /// Submission wall-clock time, milliseconds since the epoch.
    pub submitted_at: i64,
    /// Elapsed attempt time in whole seconds.
    pub time_taken_secs: i64,
    pub score: f64,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub unattempted_count: u32,
    pub answers: BTreeMap<String, AnswerValue>,
}
