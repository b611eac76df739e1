//! Error types for the MSH³ assessment core
//!
//! This module provides structured error definitions using thiserror. Binaries
//! convert to anyhow at the edge; the library only ever returns `MshError`.

use thiserror::Error;

/// Main error type for MSH³ operations
#[derive(Error, Debug)]
pub enum MshError {
    /// Store operation failed (unavailable, I/O, constraint)
    #[error("Database error: {0}")]
    Database(String),

    /// Concurrent counter updates collided and the store gave up
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// Requested document does not exist where the contract requires it
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored document does not conform to the canonical schema
    #[error("Invalid record {collection}/{id}: {reason}")]
    InvalidRecord {
        collection: String,
        id: String,
        reason: String,
    },

    /// Assessment status change not allowed by the lifecycle
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Cycle outside month 1-12 or unparseable
    #[error("Invalid cycle: {0}")]
    InvalidCycle(String),

    /// Unparseable MSH identifier
    #[error("Invalid MSH id: {0}")]
    InvalidMshId(String),

    /// Current user lacks a capability
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid operation (e.g., importing a record without an id)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for MSH³ operations
pub type Result<T> = std::result::Result<T, MshError>;

impl From<libsql::Error> for MshError {
    fn from(err: libsql::Error) -> Self {
        MshError::Database(err.to_string())
    }
}

/// Convert anyhow::Error to MshError
impl From<anyhow::Error> for MshError {
    fn from(err: anyhow::Error) -> Self {
        MshError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MshError::NotFound("assessments/abc".to_string());
        assert_eq!(err.to_string(), "Not found: assessments/abc");

        let err = MshError::InvalidRecord {
            collection: "assessments".to_string(),
            id: "a1".to_string(),
            reason: "composite mismatch".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid record assessments/a1: composite mismatch"
        );
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        assert!(json_err.is_err());

        let msh_err: MshError = json_err.unwrap_err().into();
        assert!(matches!(msh_err, MshError::Serialization(_)));
    }
}
