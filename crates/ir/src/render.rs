// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Shared pieces of the SQL text renderer.
//!
//! Identifiers are back-tick quoted (an embedded back-tick is doubled) and
//! literals are written in their JSON form, with arrays rendered as a
//! parenthesised list and `null` as `NULL`.

use std::fmt;

use serde_json::Value;

/// Placeholder written for slots that are not filled yet
pub const PLACEHOLDER: &str = "?";

/// Quoted identifier, e.g. `` `student` ``
pub struct Ident<'a>(pub &'a str);

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.0.replace('`', "``"))
    }
}

/// Optionally qualified identifier, e.g. `` `school`.`student` ``
pub struct Qualified<'a>(pub Option<&'a str>, pub &'a str);

impl fmt::Display for Qualified<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.0 {
            write!(f, "{}.", Ident(prefix))?;
        }
        write!(f, "{}", Ident(self.1))
    }
}

/// Literal value in SQL text
pub struct Literal<'a>(pub &'a Value);

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Array(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Literal(item))?;
                }
                write!(f, ")")
            }
            Value::Null => write!(f, "NULL"),
            other => write!(f, "{}", other),
        }
    }
}

/// Comma separated list of displayable items
pub struct List<'a, T>(pub &'a [T], pub &'a str);

impl<T: fmt::Display> fmt::Display for List<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.1)?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ident_quoting() {
        assert_eq!(Ident("name").to_string(), "`name`");
        assert_eq!(Ident("we`ird").to_string(), "`we``ird`");
        assert_eq!(Qualified(Some("s"), "id").to_string(), "`s`.`id`");
        assert_eq!(Qualified(None, "id").to_string(), "`id`");
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Literal(&json!("F")).to_string(), "\"F\"");
        assert_eq!(Literal(&json!("say \"hi\"")).to_string(), "\"say \\\"hi\\\"\"");
        assert_eq!(Literal(&json!(1)).to_string(), "1");
        assert_eq!(Literal(&json!(null)).to_string(), "NULL");
        assert_eq!(Literal(&json!([1, "a"])).to_string(), "(1, \"a\")");
    }
}
