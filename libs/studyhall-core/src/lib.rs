//! Core test-taking library shared by the studyhall client.
//!
//! Provides:
//! - Typed test/section/question model with tagged answer values
//! - Explicit decoder for loosely-typed remote test records
//! - In-attempt state tracking (answers, review flags, navigation)
//! - Scoring for MCQ / MSQ / numeric-range questions
//! - Per-session chat message rate limiting

pub mod attempt;
pub mod decode;
pub mod error;
pub mod rate_limit;
pub mod scoring;
pub mod types;

pub use attempt::{AttemptState, AttemptStats, PaletteState};
pub use decode::decode_test;
pub use error::{DecodeError, Result};
pub use rate_limit::{MessageLimits, MessageValidator, RateLimitError};
pub use scoring::{build_attempt, score_answers, split_multi_answer, ScoreBreakdown};
pub use types::{
    AnswerValue, Explanation, NumericRange, Question, QuestionKind, Section, Test, TestAttempt,
};
