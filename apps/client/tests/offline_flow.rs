//! End-to-end offline submission flow: take a test while the backend is
//! down, then recover on the next resync pass.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use studyhall_client::auth::FixedAuth;
use studyhall_client::db::{AttemptRepository, SqliteRepository};
use studyhall_client::remote::{RemoteError, RemoteStore};
use studyhall_client::session::{load_test, TestSession};
use studyhall_client::sync::retry_unsynced;
use studyhall_core::types::{Test, TestAttempt};

/// In-memory remote store with a network kill switch.
struct FakeBackend {
    offline: AtomicBool,
    tests: Mutex<Vec<(String, serde_json::Value)>>,
    attempts: Mutex<Vec<TestAttempt>>,
}

impl FakeBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            offline: AtomicBool::new(false),
            tests: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
        })
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("no route to host".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeBackend {
    async fn fetch_test(&self, test_id: &str) -> Result<Test, RemoteError> {
        self.check_online()?;
        let tests = self.tests.lock().unwrap();
        let record = tests
            .iter()
            .find(|(id, _)| id == test_id)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| RemoteError::TestNotFound(test_id.to_string()))?;
        Ok(studyhall_core::decode_test(test_id, &record)?)
    }

    async fn put_attempt(&self, attempt: &TestAttempt) -> Result<(), RemoteError> {
        self.check_online()?;
        let mut attempts = self.attempts.lock().unwrap();
        // Keyed by attempt id: replays overwrite rather than duplicate.
        attempts.retain(|a| a.id != attempt.id);
        attempts.push(attempt.clone());
        Ok(())
    }

    async fn attempts_for_student(&self, student_id: &str) -> Result<Vec<TestAttempt>, RemoteError> {
        self.check_online()?;
        let attempts = self.attempts.lock().unwrap();
        Ok(attempts
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect())
    }
}

fn test_record() -> serde_json::Value {
    json!({
        "title": "GATE Mock 3",
        "duration": 1,
        "totalMarks": 8,
        "sections": [{
            "id": "s1",
            "title": "Aptitude",
            "questions": [
                {
                    "id": "q1",
                    "questionText": "Pick b",
                    "questionType": "MCQ",
                    "options": {"a": "A", "b": "B", "c": "C"},
                    "correctAnswers": ["b"],
                    "marks": 4,
                    "negativeMarks": 1,
                },
                {
                    "id": "q2",
                    "questionText": "Pick a and c",
                    "questionType": "MSQ",
                    "options": {"a": "A", "b": "B", "c": "C"},
                    "correctAnswers": ["a", "c"],
                    "marks": 4,
                    "negativeMarks": 1,
                },
            ],
        }],
    })
}

#[tokio::test]
async fn offline_submission_syncs_on_next_pass() {
    let backend = FakeBackend::new();
    backend
        .tests
        .lock()
        .unwrap()
        .push(("t1".to_string(), test_record()));

    let repo = Arc::new(Mutex::new(SqliteRepository::open_in_memory().unwrap()));

    // Load while online; the decoded test is cached for offline starts.
    let test = load_test(&repo, backend.as_ref(), "t1").await.unwrap();
    assert_eq!(test.question_count(), 2);

    // The network drops mid-attempt.
    backend.set_offline(true);

    let session = TestSession::new(
        test,
        repo.clone(),
        backend.clone(),
        Arc::new(FixedAuth::signed_in("student-7")),
    );
    session.set_answer("q1", "b".to_string());
    session.set_answer("q2", "c, a".to_string());

    let outcome = session.submit().await.unwrap();
    assert!(!outcome.remote_synced);
    assert_eq!(outcome.attempt.score, 8.0);
    assert_eq!(outcome.attempt.correct_count, 2);

    // Durably captured locally, nothing on the backend yet.
    assert_eq!(repo.lock().unwrap().unsynced_count().unwrap(), 1);
    assert!(backend.attempts.lock().unwrap().is_empty());

    // Back online: the resync pass delivers the attempt.
    backend.set_offline(false);
    let report = retry_unsynced(&repo, backend.as_ref()).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(repo.lock().unwrap().unsynced_count().unwrap(), 0);

    let remote_attempts = backend.attempts_for_student("student-7").await.unwrap();
    assert_eq!(remote_attempts.len(), 1);
    assert_eq!(remote_attempts[0], outcome.attempt);

    // A redundant replay of the same id stays idempotent.
    backend.put_attempt(&outcome.attempt).await.unwrap();
    assert_eq!(backend.attempts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn attempt_can_start_from_cache_while_offline() {
    let backend = FakeBackend::new();
    backend
        .tests
        .lock()
        .unwrap()
        .push(("t1".to_string(), test_record()));

    let repo = Arc::new(Mutex::new(SqliteRepository::open_in_memory().unwrap()));

    // Prime the cache, then go offline.
    load_test(&repo, backend.as_ref(), "t1").await.unwrap();
    backend.set_offline(true);

    let test = load_test(&repo, backend.as_ref(), "t1").await.unwrap();
    assert_eq!(test.title, "GATE Mock 3");

    // A test never fetched before is unavailable offline.
    let err = load_test(&repo, backend.as_ref(), "t2").await.unwrap_err();
    assert!(matches!(
        err,
        studyhall_client::session::LoadError::Unavailable(_)
    ));
}
