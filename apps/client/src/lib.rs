//! Offline-first test-taking client.
//!
//! Wires the core test model to a local SQLite store and the remote
//! document store: attempt sessions with a countdown, local-first
//! submission, and background resync of pending attempts.

pub mod auth;
pub mod db;
pub mod remote;
pub mod session;
pub mod sync;

pub use auth::{FixedAuth, StudentAuth};
pub use db::{AttemptRepository, DbError, SqliteRepository, TestCacheRepository};
pub use remote::{HttpRemoteStore, RemoteError, RemoteStore};
pub use session::{load_test, LoadError, SubmissionOutcome, SubmitError, TestSession};
pub use sync::{retry_unsynced, run_resync_loop, SyncReport};
