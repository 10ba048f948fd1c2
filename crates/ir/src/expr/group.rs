// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IrError, IrResult};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::registry::NodeRegistry;

use super::Expr;

/// Logical connective of a [`GroupExpr`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    And,
    Or,
}

impl GroupOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOperator::And => "AND",
            GroupOperator::Or => "OR",
        }
    }

    fn parse(operator: &str) -> IrResult<Self> {
        match operator.to_ascii_uppercase().as_str() {
            "AND" => Ok(GroupOperator::And),
            "OR" => Ok(GroupOperator::Or),
            _ => Err(IrError::UnsupportedOperator {
                node: GroupExpr::CLASSNAME,
                operator: operator.to_string(),
            }),
        }
    }
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parenthesised `AND` / `OR` group of conditions
#[derive(Debug, Clone, PartialEq)]
pub struct GroupExpr {
    pub operator: GroupOperator,
    pub expressions: Vec<Expr>,
}

impl GroupExpr {
    pub const CLASSNAME: &'static str = "GroupExpression";

    pub fn new(operator: GroupOperator, expressions: impl IntoIterator<Item = Expr>) -> Self {
        Self {
            operator,
            expressions: expressions.into_iter().collect(),
        }
    }

    pub fn and(expressions: impl IntoIterator<Item = Expr>) -> Self {
        Self::new(GroupOperator::And, expressions)
    }

    pub fn or(expressions: impl IntoIterator<Item = Expr>) -> Self {
        Self::new(GroupOperator::Or, expressions)
    }

    pub fn builder(operator: GroupOperator) -> GroupBuilder {
        GroupBuilder {
            expr: Self::new(operator, Vec::new()),
        }
    }

    /// Combine an existing condition with another one under a single flat `AND`
    ///
    /// The first condition is kept as is; later ones extend the `AND` group
    /// instead of nesting it. `next` itself is appended unchanged.
    pub fn conjoin(existing: Option<Expr>, next: Expr) -> Expr {
        let Some(existing) = existing else {
            return next;
        };
        let mut expressions = match existing {
            Expr::Group(g) if g.operator == GroupOperator::And => g.expressions,
            other => vec![other],
        };
        expressions.push(next);
        Expr::Group(Self::and(expressions))
    }
}

impl SqlNode for GroupExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.expressions.is_empty() {
            return Err(IrError::Incomplete {
                node: Self::CLASSNAME,
                message: "at least one expression is required".to_string(),
            });
        }
        self.expressions
            .iter()
            .try_for_each(|e| e.check_slot(Self::CLASSNAME, "grouped"))
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("operator", self.operator.as_str())
            .list(
                "expressions",
                self.expressions.iter().map(SqlNode::json_value).collect(),
            )
            .finish()
    }
}

impl fmt::Display for GroupExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, expression) in self.expressions.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.operator)?;
            }
            write!(f, "{}", expression)?;
        }
        write!(f, ")")
    }
}

/// Builder for [`GroupExpr`]
#[derive(Debug, Clone)]
pub struct GroupBuilder {
    expr: GroupExpr,
}

impl GroupBuilder {
    pub fn expr(&mut self, expression: impl Into<Expr>) -> &mut Self {
        self.expr.expressions.push(expression.into());
        self
    }

    pub fn build(&self) -> GroupExpr {
        self.expr.clone()
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(GroupExpr::CLASSNAME, map, registry);
    Ok(Node::Expr(Expr::Group(GroupExpr {
        operator: GroupOperator::parse(json.str("operator")?)?,
        expressions: json.exprs("expressions")?,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryExpr, col, value};

    fn eq(column: &str, v: i64) -> Expr {
        BinaryExpr::new("=", col(column), value(v)).unwrap().into()
    }

    #[test]
    fn test_group_rendering() {
        let group = GroupExpr::or([eq("a", 1), eq("b", 2)]);
        assert_eq!(group.to_sql().unwrap(), "(`a` = 1 OR `b` = 2)");
    }

    #[test]
    fn test_empty_group_is_incomplete() {
        let group = GroupExpr::builder(GroupOperator::And).build();
        assert!(group.check().is_err());
    }

    #[test]
    fn test_conjoin_flattens() {
        let first = GroupExpr::conjoin(None, eq("a", 1));
        assert_eq!(first, eq("a", 1));

        let second = GroupExpr::conjoin(Some(first), eq("b", 2));
        let third = GroupExpr::conjoin(Some(second), eq("c", 3));
        match third {
            Expr::Group(g) => {
                assert_eq!(g.operator, GroupOperator::And);
                assert_eq!(g.expressions, vec![eq("a", 1), eq("b", 2), eq("c", 3)]);
            }
            other => panic!("expected AND group, got {:?}", other),
        }
    }

    #[test]
    fn test_conjoin_keeps_or_group_nested() {
        let or = Expr::Group(GroupExpr::or([eq("a", 1), eq("b", 2)]));
        let combined = GroupExpr::conjoin(Some(or.clone()), eq("c", 3));
        assert_eq!(combined, Expr::Group(GroupExpr::and([or, eq("c", 3)])));
    }

    #[test]
    fn test_conjoin_appends_and_group_unchanged() {
        let inner = Expr::Group(GroupExpr::and([eq("b", 2), eq("c", 3)]));
        let combined = GroupExpr::conjoin(Some(eq("a", 1)), inner.clone());
        assert_eq!(combined, Expr::Group(GroupExpr::and([eq("a", 1), inner])));
    }
}
