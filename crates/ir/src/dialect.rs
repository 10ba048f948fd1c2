// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Dialect Support
//!
//! This module defines the SQL dialects the IR can be built for.
//!
//! ## Design
//!
//! Rendering always produces the default (MySQL-flavoured) SQL text. What a
//! dialect changes is the set of operators builders and revival accept: each
//! dialect owns an operator table that overrides the default one.
//!
//! | Operator | MySQL | PostgreSQL |
//! |----------|-------|------------|
//! | `= <> < <= > >=` | yes | yes |
//! | `IN IS LIKE` | yes | yes |
//! | `:=` | yes | no |
//! | `REGEXP` | yes | no |
//! | `ILIKE` | no | yes |

use serde::{Deserialize, Serialize};

/// Default set of binary operators, based on MySQL
pub const DEFAULT_BINARY_OPERATORS: &[&str] =
    &["=", "<>", "<", "<=", ">", ">=", ":=", "IN", "IS", "LIKE", "REGEXP"];

const POSTGRESQL_BINARY_OPERATORS: &[&str] =
    &["=", "<>", "<", "<=", ">", ">=", "IN", "IS", "LIKE", "ILIKE"];

/// Arithmetic operators accepted by math expressions
pub const MATH_OPERATORS: &[&str] = &["+", "-", "*", "/", "%", "DIV", "MOD"];

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Dialect {
    /// MySQL (5.7, 8.0)
    #[default]
    MySQL,
    /// PostgreSQL (12, 14, 15+)
    PostgreSQL,
}

impl Dialect {
    /// Binary operators this dialect accepts
    pub fn binary_operators(&self) -> &'static [&'static str] {
        match self {
            Dialect::MySQL => DEFAULT_BINARY_OPERATORS,
            Dialect::PostgreSQL => POSTGRESQL_BINARY_OPERATORS,
        }
    }

    /// Check if this dialect supports a binary operator (case-insensitive)
    pub fn supports_operator(&self, operator: &str) -> bool {
        self.binary_operators()
            .iter()
            .any(|op| op.eq_ignore_ascii_case(operator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dialect_is_mysql() {
        assert_eq!(Dialect::default(), Dialect::MySQL);
        assert_eq!(Dialect::default().binary_operators(), DEFAULT_BINARY_OPERATORS);
    }

    #[test]
    fn test_postgresql_overrides_operator_table() {
        assert!(Dialect::PostgreSQL.supports_operator("ILIKE"));
        assert!(!Dialect::PostgreSQL.supports_operator(":="));
        assert!(!Dialect::PostgreSQL.supports_operator("REGEXP"));
        assert!(Dialect::MySQL.supports_operator("regexp"));
        assert!(!Dialect::MySQL.supports_operator("ILIKE"));
    }
}
