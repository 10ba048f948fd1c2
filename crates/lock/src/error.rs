// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Error types for table locking

use std::time::Duration;

use thiserror::Error;

/// Result type alias for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// The requested table lock is not available
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// No lock has been created for this table
    #[error("Table '{0}' is not registered")]
    NotFound(String),

    /// The table has been closed (dropped); no further access is granted
    #[error("Table '{0}' is closed")]
    Closed(String),

    /// The request waited longer than the configured acquire timeout
    #[error("Timed out after {timeout:?} waiting for {kind} lock on table '{table}'")]
    Timeout {
        table: String,
        kind: crate::LockKind,
        timeout: Duration,
    },
}

impl LockError {
    /// Name of the table the error refers to
    pub fn table(&self) -> &str {
        match self {
            LockError::NotFound(table) | LockError::Closed(table) => table,
            LockError::Timeout { table, .. } => table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LockKind;

    #[test]
    fn test_error_display() {
        assert_eq!(
            LockError::NotFound("Student".to_string()).to_string(),
            "Table 'Student' is not registered"
        );
        assert_eq!(
            LockError::Closed("Student".to_string()).to_string(),
            "Table 'Student' is closed"
        );
        let err = LockError::Timeout {
            table: "Student".to_string(),
            kind: LockKind::Write,
            timeout: Duration::from_millis(50),
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 50ms waiting for write lock on table 'Student'"
        );
        assert_eq!(err.table(), "Student");
    }
}
