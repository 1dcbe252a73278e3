//! Per-session chat message rate limiting.
//!
//! One [`MessageValidator`] is constructed per chat session and owned by it;
//! there is no process-wide state, so two open chats never share quota.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Limits applied to outgoing chat messages.
#[derive(Debug, Clone, Copy)]
pub struct MessageLimits {
    pub max_length: usize,
    pub max_per_minute: usize,
    pub max_per_hour: usize,
    /// Window within which an identical message is rejected as a duplicate.
    pub duplicate_window: Duration,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_length: 2000,
            max_per_minute: 5,
            max_per_hour: 50,
            duplicate_window: Duration::seconds(2),
        }
    }
}

/// Why a message was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("message cannot be empty")]
    Empty,

    #[error("message too long (max {max} characters)")]
    TooLong { max: usize },

    #[error("hourly limit reached, try again in {wait_secs}s")]
    HourlyLimit { wait_secs: i64 },

    #[error("sending too fast, try again in {wait_secs}s")]
    MinuteLimit { wait_secs: i64 },

    #[error("duplicate message")]
    Duplicate,
}

/// Sliding-window message validator for one chat session.
#[derive(Debug)]
pub struct MessageValidator {
    limits: MessageLimits,
    sent_last_minute: Vec<DateTime<Utc>>,
    sent_last_hour: Vec<DateTime<Utc>>,
    last_text: Option<String>,
    last_sent_at: Option<DateTime<Utc>>,
}

impl MessageValidator {
    pub fn new(limits: MessageLimits) -> Self {
        Self {
            limits,
            sent_last_minute: Vec::new(),
            sent_last_hour: Vec::new(),
            last_text: None,
            last_sent_at: None,
        }
    }

    /// Validate an outgoing message at time `now`, recording it on success.
    pub fn validate(&mut self, text: &str, now: DateTime<Utc>) -> Result<(), RateLimitError> {
        if text.trim().is_empty() {
            return Err(RateLimitError::Empty);
        }
        if text.len() > self.limits.max_length {
            return Err(RateLimitError::TooLong {
                max: self.limits.max_length,
            });
        }

        self.evict(now);

        if self.sent_last_hour.len() >= self.limits.max_per_hour {
            let oldest = self.sent_last_hour.iter().min().copied().unwrap_or(now);
            let wait = Duration::hours(1) - (now - oldest);
            return Err(RateLimitError::HourlyLimit {
                wait_secs: wait.num_seconds().max(0),
            });
        }

        if self.sent_last_minute.len() >= self.limits.max_per_minute {
            let oldest = self.sent_last_minute.iter().min().copied().unwrap_or(now);
            let wait = Duration::minutes(1) - (now - oldest);
            return Err(RateLimitError::MinuteLimit {
                wait_secs: wait.num_seconds().max(0),
            });
        }

        if let (Some(last_text), Some(last_at)) = (&self.last_text, self.last_sent_at) {
            if last_text == text && now - last_at < self.limits.duplicate_window {
                return Err(RateLimitError::Duplicate);
            }
        }

        self.sent_last_minute.push(now);
        self.sent_last_hour.push(now);
        self.last_text = Some(text.to_string());
        self.last_sent_at = Some(now);
        Ok(())
    }

    /// Remaining (per-minute, per-hour) quota at time `now`.
    pub fn remaining_quota(&mut self, now: DateTime<Utc>) -> (usize, usize) {
        self.evict(now);
        (
            self.limits.max_per_minute - self.sent_last_minute.len(),
            self.limits.max_per_hour - self.sent_last_hour.len(),
        )
    }

    pub fn reset(&mut self) {
        self.sent_last_minute.clear();
        self.sent_last_hour.clear();
        self.last_text = None;
        self.last_sent_at = None;
    }

    fn evict(&mut self, now: DateTime<Utc>) {
        self.sent_last_minute
            .retain(|t| now - *t <= Duration::minutes(1));
        self.sent_last_hour.retain(|t| now - *t <= Duration::hours(1));
    }
}

impl Default for MessageValidator {
    fn default() -> Self {
        Self::new(MessageLimits::default())
    }
}
