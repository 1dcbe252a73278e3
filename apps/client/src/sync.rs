//! Resync of locally-captured attempts.
//!
//! At-least-once delivery: every unsynced attempt is replayed to the remote
//! store on each pass. Writes are keyed by attempt id, so re-sending an
//! already-delivered record is harmless. There is no backoff and no retry
//! cutoff; a record stays pending until a pass succeeds.

use crate::db::{AttemptRepository, DbError, SqliteRepository};
use crate::remote::RemoteStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result of one resync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Unsynced attempts found at the start of the pass.
    pub scanned: usize,
    /// Attempts delivered and marked synced during the pass.
    pub synced: usize,
}

/// Replay all unsynced attempts. Each attempt is retried independently; a
/// failure on one does not block the rest.
pub async fn retry_unsynced(
    repo: &Mutex<SqliteRepository>,
    remote: &dyn RemoteStore,
) -> Result<SyncReport, DbError> {
    let pending = {
        let repo = repo.lock().expect("repository lock");
        repo.unsynced_attempts()?
    };

    let scanned = pending.len();
    let mut synced = 0;

    for attempt in pending {
        match remote.put_attempt(&attempt).await {
            Ok(()) => {
                let marked = {
                    let repo = repo.lock().expect("repository lock");
                    repo.mark_synced(&attempt.id)
                };
                match marked {
                    Ok(()) => {
                        synced += 1;
                        tracing::info!(attempt_id = %attempt.id, "attempt synced");
                    }
                    Err(e) => {
                        tracing::warn!(attempt_id = %attempt.id, error = %e, "failed to mark attempt synced");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(attempt_id = %attempt.id, error = %e, "resync failed, will retry later");
            }
        }
    }

    Ok(SyncReport { scanned, synced })
}

/// Periodic resync driver. Runs until the surrounding task is dropped.
pub async fn run_resync_loop(
    repo: Arc<Mutex<SqliteRepository>>,
    remote: Arc<dyn RemoteStore>,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match retry_unsynced(&repo, remote.as_ref()).await {
            Ok(report) if report.scanned > 0 => {
                tracing::info!(scanned = report.scanned, synced = report.synced, "resync pass");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "resync pass failed"),
        }
    }
}
