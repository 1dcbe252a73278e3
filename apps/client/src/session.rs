//! Timed test-taking session.
//!
//! One [`TestSession`] lives per attempt. It owns the countdown, the
//! in-attempt answer/review state, and the local-first submission pipeline.
//! Submission triggered by the timer reaching zero goes through the same
//! path as a manual submission and is indistinguishable to the scorer.

use crate::auth::StudentAuth;
use crate::db::{AttemptRepository, DbError, SqliteRepository, TestCacheRepository};
use crate::remote::{RemoteError, RemoteStore};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use studyhall_core::attempt::{AttemptState, AttemptStats, PaletteState};
use studyhall_core::scoring::{build_attempt, score_answers};
use studyhall_core::types::{Question, Test, TestAttempt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Errors surfaced by the submission pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("submission already in progress")]
    AlreadySubmitting,

    /// A completed attempt with no signed-in student is a hard error;
    /// nothing is persisted and the caller is told.
    #[error("not signed in")]
    NotAuthenticated,

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Errors while loading a test for an attempt.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("test {0} unavailable offline")]
    Unavailable(String),
}

/// Outcome of a submission. `remote_synced = false` still means the attempt
/// is durably captured locally; the resync loop will deliver it later.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub attempt: TestAttempt,
    pub remote_synced: bool,
    pub message: String,
}

const MSG_SUBMITTED: &str = "Test submitted successfully!";
const MSG_SAVED_LOCALLY: &str =
    "You're offline. Your answers are saved and will be submitted automatically when you're back online.";

/// Load a test for an attempt: remote first, caching the decoded record;
/// on a network failure, fall back to the last cached copy.
pub async fn load_test(
    repo: &Mutex<SqliteRepository>,
    remote: &dyn RemoteStore,
    test_id: &str,
) -> Result<Test, LoadError> {
    match remote.fetch_test(test_id).await {
        Ok(test) => {
            let repo = repo.lock().expect("repository lock");
            repo.cache_test(&test)?;
            Ok(test)
        }
        Err(RemoteError::Network(reason)) => {
            tracing::warn!(test_id, reason, "test fetch failed, trying local cache");
            let cached = {
                let repo = repo.lock().expect("repository lock");
                repo.get_cached_test(test_id)?
            };
            cached.ok_or_else(|| LoadError::Unavailable(test_id.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

struct SessionInner {
    test: Test,
    state: Mutex<AttemptState>,
    started_at: DateTime<Utc>,
    time_left: watch::Sender<u64>,
    submitting: AtomicBool,
    countdown: Mutex<Option<JoinHandle<()>>>,
    repo: Arc<Mutex<SqliteRepository>>,
    remote: Arc<dyn RemoteStore>,
    auth: Arc<dyn StudentAuth>,
}

impl SessionInner {
    fn cancel_countdown(&self) {
        if let Some(handle) = self.countdown.lock().expect("countdown lock").take() {
            handle.abort();
        }
    }

    /// The single submission path, shared by manual submits and the timer.
    async fn submit(self: &Arc<Self>) -> Result<SubmissionOutcome, SubmitError> {
        // In-flight guard: set before any work, stays set on success so a
        // finished attempt can never be scored twice.
        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SubmitError::AlreadySubmitting);
        }
        self.cancel_countdown();

        let Some(student_id) = self.auth.current_student_id() else {
            self.submitting.store(false, Ordering::SeqCst);
            return Err(SubmitError::NotAuthenticated);
        };

        let raw_answers = self.state.lock().expect("state lock").answers().clone();
        let breakdown = score_answers(&self.test, &raw_answers);
        let attempt = build_attempt(
            &self.test,
            Uuid::new_v4().to_string(),
            &student_id,
            breakdown,
            self.started_at,
            Utc::now(),
        );

        // Local-first: the attempt must be durable before the remote write
        // is even tried.
        let local = {
            let repo = self.repo.lock().expect("repository lock");
            repo.insert_attempt(&attempt)
        };
        if let Err(e) = local {
            self.submitting.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        tracing::debug!(attempt_id = %attempt.id, "attempt saved locally");

        match self.remote.put_attempt(&attempt).await {
            Ok(()) => {
                let marked = {
                    let repo = self.repo.lock().expect("repository lock");
                    repo.mark_synced(&attempt.id)
                };
                if let Err(e) = marked {
                    // Row stays unsynced; resync will replay the idempotent write.
                    tracing::warn!(attempt_id = %attempt.id, error = %e, "failed to mark attempt synced");
                }
                tracing::info!(attempt_id = %attempt.id, score = attempt.score, "attempt submitted");
                Ok(SubmissionOutcome {
                    attempt,
                    remote_synced: true,
                    message: MSG_SUBMITTED.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!(attempt_id = %attempt.id, error = %e, "remote write failed, attempt pending sync");
                Ok(SubmissionOutcome {
                    attempt,
                    remote_synced: false,
                    message: MSG_SAVED_LOCALLY.to_string(),
                })
            }
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(handle) = self.countdown.lock().expect("countdown lock").take() {
            handle.abort();
        }
    }
}

/// Handle to a live attempt.
///
/// Clone-able: all state lives behind an `Arc`, so the countdown task and
/// the caller share one attempt. The countdown holds only a weak reference
/// and stops when the session is dropped; an in-flight submission is never
/// cancelled.
#[derive(Clone)]
pub struct TestSession {
    inner: Arc<SessionInner>,
}

impl TestSession {
    pub fn new(
        test: Test,
        repo: Arc<Mutex<SqliteRepository>>,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn StudentAuth>,
    ) -> Self {
        let question_ids = test.all_questions().map(|q| q.id.clone()).collect();
        let total_secs = u64::from(test.duration_minutes) * 60;
        let (time_left, _) = watch::channel(total_secs);
        Self {
            inner: Arc::new(SessionInner {
                test,
                state: Mutex::new(AttemptState::new(question_ids)),
                started_at: Utc::now(),
                time_left,
                submitting: AtomicBool::new(false),
                countdown: Mutex::new(None),
                repo,
                remote,
                auth,
            }),
        }
    }

    pub fn test(&self) -> &Test {
        &self.inner.test
    }

    pub fn questions(&self) -> Vec<Question> {
        self.inner.test.all_questions().cloned().collect()
    }

    /// Seconds remaining, updated once per second while the countdown runs.
    pub fn time_left(&self) -> watch::Receiver<u64> {
        self.inner.time_left.subscribe()
    }

    /// Start the countdown. Has no effect if already started; nothing may
    /// restart or rewind the timer within one attempt.
    pub fn start(&self) {
        let mut countdown = self.inner.countdown.lock().expect("countdown lock");
        if countdown.is_some() {
            return;
        }

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let total_secs = u64::from(self.inner.test.duration_minutes) * 60;
        *countdown = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick is immediate; the display already shows the
            // full duration.
            interval.tick().await;

            let mut remaining = total_secs;
            while remaining > 0 {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                remaining -= 1;
                let _ = inner.time_left.send(remaining);

                if remaining == 0 {
                    // Detach the submission so cancelling the timer never
                    // cancels a write already in flight.
                    tokio::spawn(async move {
                        if let Err(e) = inner.submit().await {
                            tracing::warn!(error = %e, "auto-submission on timeout failed");
                        }
                    });
                    return;
                }
            }
        }));
    }

    /// Cancel the countdown, e.g. on screen teardown. Does not cancel an
    /// in-flight submission.
    pub fn cancel(&self) {
        self.inner.cancel_countdown();
    }

    pub fn set_answer(&self, question_id: &str, answer: String) {
        self.inner
            .state
            .lock()
            .expect("state lock")
            .set_answer(question_id, answer);
    }

    pub fn clear_answer(&self, question_id: &str) {
        self.inner
            .state
            .lock()
            .expect("state lock")
            .clear_answer(question_id);
    }

    pub fn answer(&self, question_id: &str) -> Option<String> {
        self.inner
            .state
            .lock()
            .expect("state lock")
            .answer(question_id)
            .map(str::to_string)
    }

    pub fn toggle_mark_for_review(&self, question_id: &str) {
        self.inner
            .state
            .lock()
            .expect("state lock")
            .toggle_mark_for_review(question_id);
    }

    pub fn is_marked_for_review(&self, question_id: &str) -> bool {
        self.inner
            .state
            .lock()
            .expect("state lock")
            .is_marked_for_review(question_id)
    }

    pub fn next_question(&self) {
        self.inner.state.lock().expect("state lock").next_question();
    }

    pub fn previous_question(&self) {
        self.inner
            .state
            .lock()
            .expect("state lock")
            .previous_question();
    }

    pub fn jump_to_question(&self, index: usize) {
        self.inner
            .state
            .lock()
            .expect("state lock")
            .jump_to_question(index);
    }

    pub fn current_index(&self) -> usize {
        self.inner.state.lock().expect("state lock").current_index()
    }

    pub fn palette_state(&self, question_id: &str) -> PaletteState {
        self.inner
            .state
            .lock()
            .expect("state lock")
            .palette_state(question_id)
    }

    pub fn stats(&self) -> AttemptStats {
        self.inner.state.lock().expect("state lock").stats()
    }

    /// Score and persist the attempt. Idempotent: while a submission is in
    /// flight (or after one succeeded), further calls are no-ops.
    pub async fn submit(&self) -> Result<SubmissionOutcome, SubmitError> {
        self.inner.submit().await
    }
}
