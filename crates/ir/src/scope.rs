// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Table-name scope used by whole-tree validation.
//!
//! FROM items register their alias (or table name) as they are validated;
//! qualified column references elsewhere in the statement must resolve to a
//! registered name. A child scope (correlated sub-query) sees its parents'
//! names but only rejects duplicates among its own.

use crate::error::{IrError, IrResult};

#[derive(Debug, Clone, Default)]
pub struct Scope {
    outer: Vec<String>,
    local: Vec<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nested scope that can still resolve every name visible here
    pub fn child(&self) -> Scope {
        let mut outer = self.outer.clone();
        outer.extend(self.local.iter().cloned());
        Scope {
            outer,
            local: Vec::new(),
        }
    }

    /// Add a table name; duplicates within this scope are rejected
    pub fn register(&mut self, name: impl Into<String>) -> IrResult<()> {
        let name = name.into();
        if self.local.contains(&name) {
            return Err(IrError::DuplicateAlias(name));
        }
        self.local.push(name);
        Ok(())
    }

    pub fn resolves(&self, name: &str) -> bool {
        self.local.iter().chain(self.outer.iter()).any(|n| n == name)
    }

    /// Names registered in this scope, in registration order
    pub fn tables(&self) -> &[String] {
        &self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut scope = Scope::new();
        scope.register("s").unwrap();
        scope.register("c").unwrap();
        assert!(scope.resolves("s"));
        assert!(!scope.resolves("x"));
        assert_eq!(scope.tables(), ["s".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_duplicate_alias() {
        let mut scope = Scope::new();
        scope.register("s").unwrap();
        assert_eq!(
            scope.register("s"),
            Err(IrError::DuplicateAlias("s".to_string()))
        );
    }

    #[test]
    fn test_child_sees_outer_names() {
        let mut scope = Scope::new();
        scope.register("s").unwrap();
        let mut child = scope.child();
        assert!(child.resolves("s"));
        // shadowing an outer name is allowed
        child.register("s").unwrap();
        assert!(child.tables().len() == 1);
        assert!(!scope.resolves("t"));
    }
}
