//! Resync utility: replay locally-captured attempts that never reached the
//! remote store.
//!
//! Runs one pass by default; set `STUDYHALL_RESYNC_INTERVAL_SECS` to keep it
//! running as a periodic daemon.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use studyhall_client::db::{AttemptRepository, SqliteRepository};
use studyhall_client::remote::HttpRemoteStore;
use studyhall_client::sync;
use tracing_subscriber::EnvFilter;

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studyhall")
        .join("studyhall.db")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("studyhall_client=info")),
        )
        .init();

    let db_path = std::env::var("STUDYHALL_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_db_path());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("creating data directory")?;
    }

    let repo = Arc::new(Mutex::new(SqliteRepository::open(&db_path)?));
    let base_url = std::env::var("STUDYHALL_BACKEND_URL")
        .unwrap_or_else(|_| "http://localhost:8080".to_string());
    let token = std::env::var("STUDYHALL_TOKEN").ok();
    let remote = Arc::new(HttpRemoteStore::new(base_url, token));

    if let Ok(raw) = std::env::var("STUDYHALL_RESYNC_INTERVAL_SECS") {
        let secs: u64 = raw.parse().context("STUDYHALL_RESYNC_INTERVAL_SECS")?;
        tracing::info!(every_secs = secs, "starting periodic resync");
        sync::run_resync_loop(repo, remote, Duration::from_secs(secs)).await;
        return Ok(());
    }

    let report = sync::retry_unsynced(&repo, remote.as_ref()).await?;
    tracing::info!(
        scanned = report.scanned,
        synced = report.synced,
        "resync pass complete"
    );

    let remaining = repo.lock().expect("repository lock").unsynced_count()?;
    if remaining > 0 {
        tracing::warn!(remaining, "attempts still pending sync");
    }
    Ok(())
}
