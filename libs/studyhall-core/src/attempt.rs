//! Mutable per-attempt state: answers, review flags, navigation.
//!
//! No validation happens at write time; answers are free-form strings and
//! are only interpreted against the question's kind by the scorer.

use std::collections::{HashMap, HashSet};

/// Display state for one entry in the question navigation palette. The four
/// states are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteState {
    NotAnswered,
    Answered,
    Marked,
    AnsweredAndMarked,
}

/// Attempt-level counters for the palette header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptStats {
    pub attempted: usize,
    pub skipped: usize,
    pub marked: usize,
    pub total: usize,
}

/// Session-scoped attempt state. Created when the test loads, mutated by
/// user interaction, and consumed exactly once by the scorer.
#[derive(Debug, Clone)]
pub struct AttemptState {
    question_ids: Vec<String>,
    answers: HashMap<String, String>,
    marked: HashSet<String>,
    current: usize,
}

impl AttemptState {
    /// Build state over the test's flat question order.
    pub fn new(question_ids: Vec<String>) -> Self {
        Self {
            question_ids,
            answers: HashMap::new(),
            marked: HashSet::new(),
            current: 0,
        }
    }

    pub fn set_answer(&mut self, question_id: &str, answer: String) {
        self.answers.insert(question_id.to_string(), answer);
    }

    pub fn clear_answer(&mut self, question_id: &str) {
        self.answers.remove(question_id);
    }

    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn toggle_mark_for_review(&mut self, question_id: &str) {
        if !self.marked.remove(question_id) {
            self.marked.insert(question_id.to_string());
        }
    }

    pub fn is_marked_for_review(&self, question_id: &str) -> bool {
        self.marked.contains(question_id)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn next_question(&mut self) {
        if self.current + 1 < self.question_ids.len() {
            self.current += 1;
        }
    }

    pub fn previous_question(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Out-of-range jumps are ignored.
    pub fn jump_to_question(&mut self, index: usize) {
        if index < self.question_ids.len() {
            self.current = index;
        }
    }

    pub fn palette_state(&self, question_id: &str) -> PaletteState {
        let answered = self
            .answers
            .get(question_id)
            .is_some_and(|a| !a.is_empty());
        let marked = self.marked.contains(question_id);
        match (answered, marked) {
            (true, true) => PaletteState::AnsweredAndMarked,
            (true, false) => PaletteState::Answered,
            (false, true) => PaletteState::Marked,
            (false, false) => PaletteState::NotAnswered,
        }
    }

    pub fn stats(&self) -> AttemptStats {
        let mut attempted = 0;
        let mut marked = 0;
        for id in &self.question_ids {
            if self.answers.get(id).is_some_and(|a| !a.is_empty()) {
                attempted += 1;
            }
            if self.marked.contains(id) {
                marked += 1;
            }
        }
        AttemptStats {
            attempted,
            skipped: self.question_ids.len() - attempted,
            marked,
            total: self.question_ids.len(),
        }
    }

    /// Final answer map, handed to the scorer.
    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }
}
