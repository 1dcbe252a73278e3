//! Scoring for a finished attempt.
//!
//! One flat pass over the test's questions in section order. A question
//! contributes to exactly one of {correct, incorrect, unattempted}.

use crate::types::{AnswerValue, Question, QuestionKind, Test, TestAttempt};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Scoring result before attempt metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub unattempted_count: u32,
    /// Final typed answers, keyed by question id. Unattempted questions are
    /// not present.
    pub answers: BTreeMap<String, AnswerValue>,
}

/// Split a raw MSQ answer string into an order-insensitive key set.
/// Commas separate keys; whitespace is trimmed and empty segments dropped.
pub fn split_multi_answer(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Score the recorded answers against the test.
///
/// Missing or empty answers are unattempted and contribute zero. Wrong
/// answers subtract the question's negative marks, so the total can go
/// negative; no floor is applied.
pub fn score_answers(test: &Test, raw_answers: &HashMap<String, String>) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown {
        score: 0.0,
        correct_count: 0,
        incorrect_count: 0,
        unattempted_count: 0,
        answers: BTreeMap::new(),
    };

    for question in test.all_questions() {
        let raw = raw_answers.get(&question.id).map(String::as_str);
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            breakdown.unattempted_count += 1;
            continue;
        };

        let (value, is_correct) = evaluate(question, raw);
        breakdown.answers.insert(question.id.clone(), value);

        if is_correct {
            breakdown.score += question.marks;
            breakdown.correct_count += 1;
        } else {
            breakdown.score -= question.negative_marks;
            breakdown.incorrect_count += 1;
        }
    }

    breakdown
}

/// Interpret one raw answer against the question's declared kind.
fn evaluate(question: &Question, raw: &str) -> (AnswerValue, bool) {
    match question.kind {
        QuestionKind::Mcq => {
            let is_correct = question.correct_keys.contains(raw);
            (AnswerValue::Single(raw.to_string()), is_correct)
        }
        QuestionKind::Msq => {
            let submitted = split_multi_answer(raw);
            let is_correct = submitted == question.correct_keys;
            (AnswerValue::Multiple(submitted), is_correct)
        }
        QuestionKind::Numeric => match raw.trim().parse::<f64>() {
            Ok(value) => {
                let is_correct = question
                    .numeric_range
                    .is_some_and(|range| range.contains(value));
                (AnswerValue::Numeric(value), is_correct)
            }
            // An answer string was present, so this is incorrect rather
            // than unattempted.
            Err(_) => (AnswerValue::Unparsed(raw.to_string()), false),
        },
    }
}

/// Attach attempt metadata to a breakdown. Elapsed time is wall-clock `now`
/// minus attempt start, in whole seconds.
pub fn build_attempt(
    test: &Test,
    attempt_id: String,
    student_id: &str,
    breakdown: ScoreBreakdown,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> TestAttempt {
    TestAttempt {
        id: attempt_id,
        test_id: test.id.clone(),
        test_title: test.title.clone(),
        student_id: student_id.to_string(),
        submitted_at: now.timestamp_millis(),
        time_taken_secs: (now - started_at).num_seconds().max(0),
        score: breakdown.score,
        correct_count: breakdown.correct_count,
        incorrect_count: breakdown.incorrect_count,
        unattempted_count: breakdown.unattempted_count,
        answers: breakdown.answers,
    }
}
