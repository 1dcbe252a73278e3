//! Error types for studyhall-core.

use thiserror::Error;

/// Result type alias using DecodeError.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur while decoding a remote test record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("test record is not an object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("unsupported record version {0}")]
    UnsupportedVersion(u64),

    #[error("test `{id}` has no sections")]
    NoSections { id: String },

    #[error("question `{id}` has unknown type `{value}`")]
    UnknownQuestionKind { id: String, value: String },
}
