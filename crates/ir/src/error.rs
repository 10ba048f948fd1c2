// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for the IR
//!
//! Two families of errors come out of this crate:
//!
//! - **Malformed construct**: raised by builders, by node constructors while
//!   reviving JSON, and by `check()`/`validate()`. The caller has to fix the
//!   input and rebuild.
//! - **Revival**: raised by the [`NodeRegistry`](crate::NodeRegistry) when a
//!   serialized node cannot be mapped back to a known kind.

use thiserror::Error;

/// Result type alias for IR operations
pub type IrResult<T> = Result<T, IrError>;

/// Errors that can occur while building, validating or reviving IR nodes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    /// A required field is not set
    #[error("Missing required field '{field}' in {node}")]
    MissingField { node: &'static str, field: &'static str },

    /// A placeholder slot was never filled
    #[error("Incomplete {node}: {message}")]
    Incomplete { node: &'static str, message: String },

    /// Operator not in the whitelist of the active dialect
    #[error("Unsupported operator '{operator}' for {node}")]
    UnsupportedOperator { node: &'static str, operator: String },

    /// `not` flag used with an operator that cannot be negated
    #[error("Invalid use of `not` flag with operator '{0}'")]
    InvalidNegation(String),

    /// Operand shape does not fit the operator
    #[error("Invalid operand for operator '{operator}': {message}")]
    InvalidOperand { operator: String, message: String },

    /// Table construct that requires an alias has none
    #[error("Missing alias name for {0}")]
    MissingAlias(&'static str),

    /// Two tables in the same scope share a name
    #[error("Duplicate table name '{0}'")]
    DuplicateAlias(String),

    /// Column reference points at a table that is not in scope
    #[error("Table '{0}' is not available in the current scope")]
    UnknownTable(String),

    /// Column list and value tuple lengths differ
    #[error("Column count mismatch: expected {expected} values, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    /// The same column is defined twice
    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),

    /// Constraint names a column the table does not define
    #[error("Column '{0}' is not defined")]
    UnknownColumn(String),

    /// More than one primary key in a table definition
    #[error("Table '{0}' defines more than one PRIMARY KEY")]
    MultiplePrimaryKeys(String),

    /// PRIMARY KEY column made nullable
    #[error("PRIMARY KEY column '{0}' cannot be null")]
    NullablePrimaryKey(String),

    /// JOIN clause with an ON condition that does not fit its operator
    #[error("Invalid {operator} JOIN: {message}")]
    InvalidJoin { operator: String, message: String },

    /// No constructor registered for the given tag
    #[error("Kind not found: '{0}'")]
    KindNotFound(String),

    /// A node of one kind was revived where another kind was expected
    #[error("Unexpected node kind: expected {expected}, found '{found}'")]
    UnexpectedKind { expected: &'static str, found: String },

    /// JSON does not have the shape of the node it claims to be
    #[error("Invalid JSON for {node}: {message}")]
    InvalidJson { node: String, message: String },
}

impl IrError {
    /// Whether this error reports a malformed construct (builder/check/validate)
    pub fn is_malformed(&self) -> bool {
        !self.is_revival()
    }

    /// Whether this error comes from reviving untyped JSON
    pub fn is_revival(&self) -> bool {
        matches!(
            self,
            IrError::KindNotFound(_) | IrError::UnexpectedKind { .. } | IrError::InvalidJson { .. }
        )
    }

    pub(crate) fn invalid_json(node: impl Into<String>, message: impl Into<String>) -> Self {
        IrError::InvalidJson {
            node: node.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_operand(operator: impl Into<String>, message: impl Into<String>) -> Self {
        IrError::InvalidOperand {
            operator: operator.into(),
            message: message.into(),
        }
    }
}
