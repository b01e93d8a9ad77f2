//! Domain errors for the traitscope engine.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the engine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unknown scoring dimension: {0}")]
    UnknownDimension(String),

    #[error("Profile not found for user: {0}")]
    ProfileNotFound(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Extraction failed for conversation {conversation_id}: {reason}")]
    ExtractionFailed { conversation_id: Uuid, reason: String },

    #[error("Dataset not found at {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Whether retrying the same unit of work could succeed.
    ///
    /// Configuration and validation problems are fatal; store, I/O and
    /// extraction failures are transient from the engine's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::Io(_) | Self::ExtractionFailed { .. }
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}
