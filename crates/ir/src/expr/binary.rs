// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Binary comparison / assignment expressions.
//!
//! The operator must be in the whitelist of the active [`Dialect`]. A few
//! operators constrain their operands:
//!
//! | operator | constraint |
//! |---|---|
//! | `:=` | left side is a [`Variable`](super::VariableExpr) |
//! | `IN` | right side is an array value or a sub-query |
//! | `LIKE`, `ILIKE`, `REGEXP` | right side is a string value |
//! | `IS` | right side is always `NULL` |
//!
//! Only the operators in [`NEGATABLE_OPERATORS`] accept `not = true`.

use std::fmt;

use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::error::{IrError, IrResult};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::registry::NodeRegistry;

use super::{Expr, ValueExpr};

/// Operators that can be prefixed with `NOT`
pub const NEGATABLE_OPERATORS: &[&str] = &["IS", "IN", "LIKE", "ILIKE", "REGEXP"];

/// `left operator right`
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    /// Upper-cased operator
    pub operator: String,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub not: bool,
}

impl BinaryExpr {
    pub const CLASSNAME: &'static str = "BinaryExpression";

    /// Builder using the default dialect's operator whitelist
    pub fn builder(operator: &str) -> IrResult<BinaryBuilder> {
        BinaryBuilder::new(Dialect::default(), operator)
    }

    pub fn builder_for(dialect: Dialect, operator: &str) -> IrResult<BinaryBuilder> {
        BinaryBuilder::new(dialect, operator)
    }

    /// Shortcut for a complete, non-negated expression
    pub fn new(operator: &str, left: impl Into<Expr>, right: impl Into<Expr>) -> IrResult<Self> {
        let mut builder = Self::builder(operator)?;
        builder.left(left)?;
        if builder.expr.operator != "IS" {
            builder.right(right)?;
        }
        Ok(builder.build())
    }

    fn is_null_test(&self) -> bool {
        self.operator == "IS"
    }
}

fn normalize_operator(dialect: Dialect, operator: &str) -> IrResult<String> {
    if !dialect.supports_operator(operator) {
        return Err(IrError::UnsupportedOperator {
            node: BinaryExpr::CLASSNAME,
            operator: operator.to_string(),
        });
    }
    Ok(operator.to_ascii_uppercase())
}

fn check_left(operator: &str, left: &Expr) -> IrResult<()> {
    if operator == ":=" && !matches!(left, Expr::Variable(_) | Expr::Unknown) {
        return Err(IrError::invalid_operand(
            operator,
            "left expression must be a Variable",
        ));
    }
    Ok(())
}

fn check_right(operator: &str, right: &Expr) -> IrResult<()> {
    if right.is_unknown() {
        return Ok(());
    }
    match operator {
        "IS" if !matches!(right, Expr::Value(v) if v.value.is_null()) => Err(
            IrError::invalid_operand(operator, "right expression is fixed to NULL"),
        ),
        "IN" if !right.is_in_operand() => Err(IrError::invalid_operand(
            operator,
            "right expression must be a non-empty array or a query",
        )),
        "LIKE" | "ILIKE" | "REGEXP" if !right.is_string_value() => Err(IrError::invalid_operand(
            operator,
            "right expression must be a string",
        )),
        _ => Ok(()),
    }
}

fn check_not(operator: &str, not: bool) -> IrResult<()> {
    if not && !NEGATABLE_OPERATORS.contains(&operator) {
        return Err(IrError::InvalidNegation(operator.to_string()));
    }
    Ok(())
}

impl SqlNode for BinaryExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        check_left(&self.operator, &self.left)?;
        check_right(&self.operator, &self.right)?;
        check_not(&self.operator, self.not)?;
        self.left.check_slot(Self::CLASSNAME, "left")?;
        self.right.check_slot(Self::CLASSNAME, "right")
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("left", self.left.json_value())
            .set("operator", self.operator.clone())
            .set("right", self.right.json_value())
            .flag("not", self.not)
            .finish()
    }
}

impl fmt::Display for BinaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.not { "NOT " } else { "" };
        if self.is_null_test() {
            write!(f, "{} IS {}NULL", self.left, not)
        } else {
            write!(f, "{} {}{} {}", self.left, not, self.operator, self.right)
        }
    }
}

/// Staged builder for [`BinaryExpr`]
///
/// Every setter validates its argument against the operator; on error the
/// builder is left untouched.
#[derive(Debug, Clone)]
pub struct BinaryBuilder {
    expr: BinaryExpr,
}

impl BinaryBuilder {
    pub fn new(dialect: Dialect, operator: &str) -> IrResult<Self> {
        let operator = normalize_operator(dialect, operator)?;
        let right = if operator == "IS" {
            Expr::Value(ValueExpr::null())
        } else {
            Expr::Unknown
        };
        Ok(Self {
            expr: BinaryExpr {
                operator,
                left: Box::new(Expr::Unknown),
                right: Box::new(right),
                not: false,
            },
        })
    }

    pub fn left(&mut self, left: impl Into<Expr>) -> IrResult<&mut Self> {
        let left = left.into();
        check_left(&self.expr.operator, &left)?;
        self.expr.left = Box::new(left);
        Ok(self)
    }

    pub fn right(&mut self, right: impl Into<Expr>) -> IrResult<&mut Self> {
        if self.expr.is_null_test() {
            return Err(IrError::invalid_operand(
                "IS",
                "right expression is fixed to NULL",
            ));
        }
        let right = right.into();
        check_right(&self.expr.operator, &right)?;
        self.expr.right = Box::new(right);
        Ok(self)
    }

    pub fn not(&mut self, not: bool) -> IrResult<&mut Self> {
        check_not(&self.expr.operator, not)?;
        self.expr.not = not;
        Ok(self)
    }

    pub fn build(&self) -> BinaryExpr {
        self.expr.clone()
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(BinaryExpr::CLASSNAME, map, registry);
    let operator = normalize_operator(registry.dialect(), json.str("operator")?)?;
    let left = json.expr_or_unknown("left")?;
    check_left(&operator, &left)?;
    let right = if operator == "IS" {
        Expr::Value(ValueExpr::null())
    } else {
        let right = json.expr_or_unknown("right")?;
        check_right(&operator, &right)?;
        right
    };
    let not = json.flag("not")?;
    check_not(&operator, not)?;

    Ok(Node::Expr(Expr::Binary(BinaryExpr {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        not,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, value, var};
    use serde_json::json;

    #[test]
    fn test_equality_rendering() {
        let expr = BinaryExpr::new("=", col("gender"), value("F")).unwrap();
        assert_eq!(expr.to_sql().unwrap(), "`gender` = \"F\"");
    }

    #[test]
    fn test_unsupported_operator() {
        let err = BinaryExpr::builder("~~").unwrap_err();
        assert!(matches!(err, IrError::UnsupportedOperator { .. }));
        assert!(BinaryExpr::builder_for(Dialect::PostgreSQL, ":=").is_err());
        assert!(BinaryExpr::builder_for(Dialect::PostgreSQL, "ilike").is_ok());
    }

    #[test]
    fn test_operator_is_upper_cased() {
        let expr = BinaryExpr::new("like", col("name"), value("K%")).unwrap();
        assert_eq!(expr.operator, "LIKE");
        assert_eq!(expr.to_string(), "`name` LIKE \"K%\"");
    }

    #[test]
    fn test_assignment_requires_variable() {
        let mut builder = BinaryExpr::builder(":=").unwrap();
        assert!(builder.left(col("x")).is_err());
        assert!(builder.left(value(1)).is_err());
        builder.left(var("total")).unwrap().right(value(1)).unwrap();
        assert_eq!(builder.build().to_sql().unwrap(), "@total := 1");
    }

    #[test]
    fn test_is_right_side_fixed() {
        let mut builder = BinaryExpr::builder("IS").unwrap();
        assert!(builder.right(value(1)).is_err());
        builder.left(col("email")).unwrap().not(true).unwrap();
        assert_eq!(builder.build().to_sql().unwrap(), "`email` IS NOT NULL");
    }

    #[test]
    fn test_in_requires_array_or_query() {
        let mut builder = BinaryExpr::builder("IN").unwrap();
        assert!(builder.right(value("a")).is_err());
        builder
            .left(col("id"))
            .unwrap()
            .right(value(json!([1, 2, 3])))
            .unwrap()
            .not(true)
            .unwrap();
        assert_eq!(builder.build().to_sql().unwrap(), "`id` NOT IN (1, 2, 3)");
    }

    #[test]
    fn test_in_rejects_empty_array() {
        let err = BinaryExpr::new("IN", col("id"), value(json!([]))).unwrap_err();
        assert!(matches!(err, IrError::InvalidOperand { .. }));

        let revived = NodeRegistry::global().revive(&json!({
            "classname": "BinaryExpression",
            "operator": "IN",
            "left": { "classname": "ColumnExpression", "column": "id" },
            "right": { "classname": "Value", "value": [] },
        }));
        assert!(matches!(revived, Err(IrError::InvalidOperand { .. })));
    }

    #[test]
    fn test_like_requires_string() {
        let mut builder = BinaryExpr::builder("REGEXP").unwrap();
        assert!(builder.right(value(3)).is_err());
        assert!(builder.right(col("pattern")).is_err());
        assert!(builder.right(value("^a")).is_ok());
    }

    #[test]
    fn test_not_only_on_negatable_operators() {
        let mut builder = BinaryExpr::builder("=").unwrap();
        assert_eq!(
            builder.not(true).unwrap_err(),
            IrError::InvalidNegation("=".to_string())
        );
        assert!(builder.not(false).is_ok());
        assert!(!builder.build().not);
    }

    #[test]
    fn test_failed_setter_leaves_builder_unchanged() {
        let mut builder = BinaryExpr::builder("LIKE").unwrap();
        builder.right(value("a%")).unwrap();
        assert!(builder.right(value(1)).is_err());
        assert_eq!(*builder.build().right, value("a%"));
    }

    #[test]
    fn test_incomplete_expression_is_not_renderable() {
        let mut builder = BinaryExpr::builder("=").unwrap();
        builder.left(col("a")).unwrap();
        let expr = builder.build();
        assert!(matches!(expr.check(), Err(IrError::Incomplete { .. })));
        assert!(expr.to_json().is_err());
        assert_eq!(expr.to_string(), "`a` = ?");
    }

    #[test]
    fn test_json_shape() {
        let expr = BinaryExpr::new("=", col("gender"), value("F")).unwrap();
        assert_eq!(
            serde_json::to_string(&expr.to_json().unwrap()).unwrap(),
            r#"{"classname":"BinaryExpression","left":{"classname":"ColumnExpression","column":"gender"},"operator":"=","right":{"classname":"Value","value":"F"}}"#
        );
    }
}
