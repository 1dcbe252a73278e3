//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the local on-device database.
pub const SCHEMA: &str = r#"
-- Scored attempts, written locally before any remote write.
-- synced = 0 marks rows still waiting to reach the remote store.
CREATE TABLE IF NOT EXISTS attempts (
    id TEXT PRIMARY KEY,
    test_id TEXT NOT NULL,
    test_title TEXT NOT NULL,
    student_id TEXT NOT NULL,
    submitted_at INTEGER NOT NULL,
    time_taken_secs INTEGER NOT NULL,
    score REAL NOT NULL,
    correct_count INTEGER NOT NULL,
    incorrect_count INTEGER NOT NULL,
    unattempted_count INTEGER NOT NULL,
    answers_json TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0
);

-- Decoded test records cached for offline attempt starts.
CREATE TABLE IF NOT EXISTS cached_tests (
    test_id TEXT PRIMARY KEY,
    test_json TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_attempts_student ON attempts(student_id);
CREATE INDEX IF NOT EXISTS idx_attempts_test ON attempts(test_id);
CREATE INDEX IF NOT EXISTS idx_attempts_synced ON attempts(synced);
"#;
