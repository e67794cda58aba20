//! Error types for askfaq.
//!
//! A single error enum covers configuration, I/O, index, persistence,
//! embedding and ingestion failures so every crate can return `AppResult`.

use thiserror::Error;

/// Unified error type for askfaq.
///
/// All fallible functions return `Result<T, AppError>`. Invalid input is
/// reported through these variants, never through a panic.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Vector index usage errors (bad arguments, poisoned locks, corrupt rows)
    #[error("Index error: {0}")]
    Index(String),

    /// A vector's length disagrees with the index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The persisted vector file and companion file disagree or one is missing
    #[error("Persistence inconsistency: {0}")]
    PersistenceInconsistency(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Ingestion boundary errors (malformed chunk files, missing metadata keys)
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::DimensionMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 4, got 3");
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
