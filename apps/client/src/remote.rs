//! Remote document store client.
//!
//! The store exposes a read path for test records and a keyed write path for
//! attempts. Attempt writes are keyed by the attempt's own id, so replaying
//! an already-synced record is idempotent.

use async_trait::async_trait;
use reqwest::Client;
use studyhall_core::error::DecodeError;
use studyhall_core::types::{Test, TestAttempt};

/// Remote store errors.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("test not found: {0}")]
    TestNotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("bad test record: {0}")]
    Record(#[from] DecodeError),
}

/// Boundary to the remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch and decode a test record.
    async fn fetch_test(&self, test_id: &str) -> Result<Test, RemoteError>;

    /// Write an attempt, keyed by `attempt.id`.
    async fn put_attempt(&self, attempt: &TestAttempt) -> Result<(), RemoteError>;

    /// Prior attempts for one student, for history display.
    async fn attempts_for_student(&self, student_id: &str) -> Result<Vec<TestAttempt>, RemoteError>;
}

/// HTTP implementation of [`RemoteStore`].
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Check if the backend is reachable.
    pub async fn check_connectivity(&self) -> Result<bool, RemoteError> {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => Err(RemoteError::Network(e.to_string())),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(RemoteError::Backend { status, message })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_test(&self, test_id: &str) -> Result<Test, RemoteError> {
        let url = format!("{}/api/tests/{test_id}", self.base_url);
        let resp = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteError::TestNotFound(test_id.to_string()));
        }
        let resp = Self::check_status(resp).await?;

        let record: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;
        Ok(studyhall_core::decode_test(test_id, &record)?)
    }

    async fn put_attempt(&self, attempt: &TestAttempt) -> Result<(), RemoteError> {
        let url = format!("{}/api/attempts/{}", self.base_url, attempt.id);
        let resp = self
            .request(self.client.put(&url))
            .json(attempt)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn attempts_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<TestAttempt>, RemoteError> {
        let url = format!("{}/api/students/{student_id}/attempts", self.base_url);
        let resp = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let resp = Self::check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}
