//! Database error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("attempt not found: {0}")]
    AttemptNotFound(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
