// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! YAML render-case format parser
//!
//! A case file holds one or more YAML documents separated by `---`. Each
//! document describes a tagged JSON node and what reviving it must produce:
//!
//! ```yaml
//! description: Delete with two conditions
//! dialect: mysql
//! json: |
//!   {"classname": "Delete", "name": "Student"}
//! sql: DELETE FROM `Student`
//! ---
//! description: Unknown tag
//! json: '{"classname": "Bogus"}'
//! error: KindNotFound
//! ```
//!
//! `error` names the expected `IrError` variant; `sql` and `error` are
//! mutually exclusive.

use std::path::Path;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use typed_sql_ir::Dialect;

/// A single render case
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderCase {
    pub description: String,
    #[serde(default, deserialize_with = "dialect")]
    pub dialect: Dialect,
    pub json: String,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Parse errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Case '{0}' sets both sql and error")]
    Conflicting(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Empty test case file")]
    EmptyFile,
}

fn dialect<'de, D>(deserializer: D) -> Result<Dialect, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.trim().to_lowercase().as_str() {
        "mysql" => Ok(Dialect::MySQL),
        "postgresql" | "postgres" => Ok(Dialect::PostgreSQL),
        _ => Err(serde::de::Error::custom(format!(
            "Invalid dialect value: {}",
            s
        ))),
    }
}

/// Parse a case file
pub fn parse_case_file(path: &Path) -> Result<Vec<RenderCase>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_case_content(&content)
}

/// Parse case content from a string
pub fn parse_case_content(content: &str) -> Result<Vec<RenderCase>, ParseError> {
    let mut cases = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        // tolerate a leading or trailing separator
        if value.is_null() {
            continue;
        }
        let case: RenderCase = serde_yaml::from_value(value)?;
        if case.description.trim().is_empty() {
            return Err(ParseError::MissingField("description"));
        }
        if case.sql.is_some() && case.error.is_some() {
            return Err(ParseError::Conflicting(case.description));
        }
        cases.push(case);
    }
    if cases.is_empty() {
        return Err(ParseError::EmptyFile);
    }
    Ok(cases)
}
