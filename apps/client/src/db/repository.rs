//! Repository pattern for database access.

use crate::db::error::DbError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use studyhall_core::types::{Test, TestAttempt};

type Result<T> = std::result::Result<T, DbError>;

/// Repository for attempt operations. Attempts are written locally first;
/// the `synced` flag tracks which rows still need a remote write.
pub trait AttemptRepository {
    fn insert_attempt(&self, attempt: &TestAttempt) -> Result<()>;
    fn get_attempt(&self, id: &str) -> Result<Option<TestAttempt>>;
    /// Prior attempts for history display, newest first.
    fn attempts_for_student(&self, student_id: &str) -> Result<Vec<TestAttempt>>;
    fn unsynced_attempts(&self) -> Result<Vec<TestAttempt>>;
    fn unsynced_count(&self) -> Result<usize>;
    fn mark_synced(&self, id: &str) -> Result<()>;
    fn delete_attempt(&self, id: &str) -> Result<()>;
}

/// Repository for the offline test cache.
pub trait TestCacheRepository {
    fn cache_test(&self, test: &Test) -> Result<()>;
    fn get_cached_test(&self, test_id: &str) -> Result<Option<Test>>;
}

/// SQLite implementation of repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(super::schema::SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![super::schema::SCHEMA_VERSION],
        )?;
        Ok(())
    }

    fn row_to_attempt(row: &Row<'_>) -> rusqlite::Result<(TestAttempt, String)> {
        Ok((
            TestAttempt {
                id: row.get(0)?,
                test_id: row.get(1)?,
                test_title: row.get(2)?,
                student_id: row.get(3)?,
                submitted_at: row.get(4)?,
                time_taken_secs: row.get(5)?,
                score: row.get(6)?,
                correct_count: row.get(7)?,
                incorrect_count: row.get(8)?,
                unattempted_count: row.get(9)?,
                answers: Default::default(),
            },
            row.get(10)?,
        ))
    }

    fn decode_answers((mut attempt, answers_json): (TestAttempt, String)) -> Result<TestAttempt> {
        attempt.answers = serde_json::from_str(&answers_json)
            .map_err(|e| DbError::InvalidData(format!("answers for {}: {e}", attempt.id)))?;
        Ok(attempt)
    }
}

const ATTEMPT_COLUMNS: &str = "id, test_id, test_title, student_id, submitted_at, \
     time_taken_secs, score, correct_count, incorrect_count, unattempted_count, answers_json";

impl AttemptRepository for SqliteRepository {
    fn insert_attempt(&self, attempt: &TestAttempt) -> Result<()> {
        let answers_json = serde_json::to_string(&attempt.answers)
            .map_err(|e| DbError::InvalidData(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO attempts \
             (id, test_id, test_title, student_id, submitted_at, time_taken_secs, \
              score, correct_count, incorrect_count, unattempted_count, answers_json, synced) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0)",
            params![
                attempt.id,
                attempt.test_id,
                attempt.test_title,
                attempt.student_id,
                attempt.submitted_at,
                attempt.time_taken_secs,
                attempt.score,
                attempt.correct_count,
                attempt.incorrect_count,
                attempt.unattempted_count,
                answers_json,
            ],
        )?;
        Ok(())
    }

    fn get_attempt(&self, id: &str) -> Result<Option<TestAttempt>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1"),
                params![id],
                Self::row_to_attempt,
            )
            .optional()?;
        row.map(Self::decode_answers).transpose()
    }

    fn attempts_for_student(&self, student_id: &str) -> Result<Vec<TestAttempt>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE student_id = ?1 \
             ORDER BY submitted_at DESC"
        ))?;
        let rows = stmt.query_map(params![student_id], Self::row_to_attempt)?;
        rows.map(|r| Self::decode_answers(r?)).collect()
    }

    fn unsynced_attempts(&self) -> Result<Vec<TestAttempt>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE synced = 0 ORDER BY submitted_at"
        ))?;
        let rows = stmt.query_map([], Self::row_to_attempt)?;
        rows.map(|r| Self::decode_answers(r?)).collect()
    }

    fn unsynced_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM attempts WHERE synced = 0", [], |row| {
                    row.get(0)
                })?;
        Ok(count as usize)
    }

    fn mark_synced(&self, id: &str) -> Result<()> {
        let updated = self
            .conn
            .execute("UPDATE attempts SET synced = 1 WHERE id = ?1", params![id])?;
        if updated == 0 {
            return Err(DbError::AttemptNotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_attempt(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM attempts WHERE id = ?1", params![id])?;
        Ok(())
    }
}

impl TestCacheRepository for SqliteRepository {
    fn cache_test(&self, test: &Test) -> Result<()> {
        let test_json =
            serde_json::to_string(test).map_err(|e| DbError::InvalidData(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO cached_tests (test_id, test_json, fetched_at) \
             VALUES (?1, ?2, ?3)",
            params![test.id, test_json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_cached_test(&self, test_id: &str) -> Result<Option<Test>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT test_json FROM cached_tests WHERE test_id = ?1",
                params![test_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| {
            serde_json::from_str(&j)
                .map_err(|e| DbError::InvalidData(format!("cached test {test_id}: {e}")))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use studyhall_core::types::AnswerValue;

    fn attempt(id: &str, student: &str, submitted_at: i64) -> TestAttempt {
        TestAttempt {
            id: id.to_string(),
            test_id: "t1".into(),
            test_title: "Mock Test 1".into(),
            student_id: student.to_string(),
            submitted_at,
            time_taken_secs: 10,
            score: 4.0,
            correct_count: 1,
            incorrect_count: 0,
            unattempted_count: 1,
            answers: [("q1".to_string(), AnswerValue::Single("b".into()))].into(),
        }
    }

    #[test]
    fn insert_and_read_back() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let a = attempt("a1", "s1", 1000);
        repo.insert_attempt(&a).unwrap();

        let loaded = repo.get_attempt("a1").unwrap().unwrap();
        assert_eq!(loaded, a);
        assert_eq!(repo.get_attempt("missing").unwrap(), None);
    }

    #[test]
    fn new_attempts_start_unsynced() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_attempt(&attempt("a1", "s1", 1000)).unwrap();
        repo.insert_attempt(&attempt("a2", "s1", 2000)).unwrap();

        assert_eq!(repo.unsynced_count().unwrap(), 2);
        let unsynced = repo.unsynced_attempts().unwrap();
        assert_eq!(unsynced.len(), 2);
        // Oldest first, so resync replays in submission order.
        assert_eq!(unsynced[0].id, "a1");
    }

    #[test]
    fn mark_synced_removes_from_pending() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_attempt(&attempt("a1", "s1", 1000)).unwrap();
        repo.mark_synced("a1").unwrap();

        assert_eq!(repo.unsynced_count().unwrap(), 0);
        assert!(repo.unsynced_attempts().unwrap().is_empty());
    }

    #[test]
    fn mark_synced_unknown_id_errors() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert!(matches!(
            repo.mark_synced("nope"),
            Err(DbError::AttemptNotFound(_))
        ));
    }

    #[test]
    fn reinsert_is_keyed_by_attempt_id() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_attempt(&attempt("a1", "s1", 1000)).unwrap();
        repo.insert_attempt(&attempt("a1", "s1", 1000)).unwrap();
        assert_eq!(repo.attempts_for_student("s1").unwrap().len(), 1);
    }

    #[test]
    fn history_is_per_student_newest_first() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.insert_attempt(&attempt("a1", "s1", 1000)).unwrap();
        repo.insert_attempt(&attempt("a2", "s1", 3000)).unwrap();
        repo.insert_attempt(&attempt("a3", "s2", 2000)).unwrap();

        let history = repo.attempts_for_student("s1").unwrap();
        let ids: Vec<&str> = history.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);
    }

    #[test]
    fn stored_unparsed_answer_reads_back_as_single() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let mut a = attempt("a1", "s1", 1000);
        a.answers = [("q1".to_string(), AnswerValue::Unparsed("abc".into()))].into();
        repo.insert_attempt(&a).unwrap();

        // The untagged answer encoding collapses Unparsed into Single on the
        // way back from storage; the raw text survives.
        let loaded = repo.get_attempt("a1").unwrap().unwrap();
        assert_eq!(loaded.answers["q1"], AnswerValue::Single("abc".into()));
    }

    #[test]
    fn test_cache_round_trip() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let record = serde_json::json!({
            "title": "Cached Test",
            "duration": 30,
            "sections": [{
                "id": "s1",
                "questions": [{
                    "id": "q1",
                    "questionType": "MCQ",
                    "correctAnswers": ["a"],
                    "marks": 4,
                }],
            }],
        });
        let test = studyhall_core::decode_test("t1", &record).unwrap();

        assert_eq!(repo.get_cached_test("t1").unwrap(), None);
        repo.cache_test(&test).unwrap();
        assert_eq!(repo.get_cached_test("t1").unwrap(), Some(test));
    }
}
