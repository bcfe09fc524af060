//! Error types for the poll engine and its storage backends.

use thiserror::Error;

use crate::models::{OptionId, PollId};

/// Bad input shape or range. Always names the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("stored data is corrupted: {0}")]
    Corruption(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corruption(e.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Failures returned by the poll engine to its callers.
///
/// Expected business outcomes (closed poll, duplicate ballot, rejected change)
/// are not errors; see [`crate::voting::VoteOutcome`].
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("poll {0} not found")]
    PollNotFound(PollId),

    #[error("option {option} not found on poll {poll}")]
    OptionNotFound { poll: PollId, option: OptionId },

    #[error(transparent)]
    Storage(#[from] StoreError),
}
