// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Expressions
//!
//! This module represents SQL expressions in the IR.
//!
//! ## Design
//!
//! Expressions form a recursive tree. Every composite expression exclusively
//! owns its children; column and variable references are names, resolved
//! through the validation [`Scope`] rather than pointers.
//!
//! - **Leaves**: [`ValueExpr`], [`ColumnExpr`], [`VariableExpr`]
//! - **Operators**: [`BinaryExpr`], [`BetweenExpr`], [`InExpr`], [`IsNullExpr`],
//!   [`ExistsExpr`], [`CaseExpr`], [`FunctionExpr`], [`MathExpr`], [`GroupExpr`]
//! - **Sub-query**: a [`Query`] used where an expression is expected
//! - **Placeholder**: [`Expr::Unknown`] marks a slot a builder has not filled
//!
//! ## Validation tiers
//!
//! Shapes are checked when a builder setter is called and when a node is
//! revived from JSON. Completeness (no [`Expr::Unknown`] left) is checked
//! lazily by [`SqlNode::check`], which `to_json` and `to_sql` run first.
//!
//! ```text
//! BinaryExpr {
//!   left: Column(`gender`),
//!   operator: "=",
//!   right: Value("F")
//! }
//! ```
//!
//! Renders: `` `gender` = "F" ``

mod between;
mod binary;
mod case;
mod column;
mod exists;
mod function;
mod group;
mod in_expr;
mod is_null;
mod math;
mod value;
mod variable;

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

pub use between::BetweenExpr;
pub use binary::{BinaryBuilder, BinaryExpr, NEGATABLE_OPERATORS};
pub use case::{CaseBuilder, CaseExpr, CaseWhen};
pub use column::ColumnExpr;
pub use exists::ExistsExpr;
pub use function::{FunctionBuilder, FunctionExpr};
pub use group::{GroupBuilder, GroupExpr, GroupOperator};
pub use in_expr::InExpr;
pub use is_null::IsNullExpr;
pub use math::{MathBuilder, MathExpr};
pub use value::ValueExpr;
pub use variable::VariableExpr;

pub(crate) use between::revive as revive_between;
pub(crate) use binary::revive as revive_binary;
pub(crate) use case::revive as revive_case;
pub(crate) use column::revive as revive_column;
pub(crate) use exists::revive as revive_exists;
pub(crate) use function::revive as revive_function;
pub(crate) use group::revive as revive_group;
pub(crate) use in_expr::revive as revive_in;
pub(crate) use is_null::revive as revive_is_null;
pub(crate) use math::revive as revive_math;
pub(crate) use value::revive as revive_value;
pub(crate) use variable::revive as revive_variable;

use crate::error::{IrError, IrResult};
use crate::node::SqlNode;
use crate::query::Query;
use crate::render::PLACEHOLDER;
use crate::scope::Scope;

/// A SQL expression
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expr {
    /// Slot not filled yet; never serialized or rendered by `to_sql`
    #[default]
    Unknown,
    Value(ValueExpr),
    Column(ColumnExpr),
    Variable(VariableExpr),
    Binary(BinaryExpr),
    Between(BetweenExpr),
    In(InExpr),
    IsNull(IsNullExpr),
    Exists(ExistsExpr),
    Case(CaseExpr),
    Function(FunctionExpr),
    Math(MathExpr),
    Group(GroupExpr),
    /// Sub-query used as an expression, e.g. the right side of `IN`
    Query(Box<Query>),
}

macro_rules! each_expr {
    ($self:expr, $inner:ident => $body:expr, unknown => $unknown:expr) => {
        match $self {
            Expr::Unknown => $unknown,
            Expr::Value($inner) => $body,
            Expr::Column($inner) => $body,
            Expr::Variable($inner) => $body,
            Expr::Binary($inner) => $body,
            Expr::Between($inner) => $body,
            Expr::In($inner) => $body,
            Expr::IsNull($inner) => $body,
            Expr::Exists($inner) => $body,
            Expr::Case($inner) => $body,
            Expr::Function($inner) => $body,
            Expr::Math($inner) => $body,
            Expr::Group($inner) => $body,
            Expr::Query($inner) => $body,
        }
    };
}

impl Expr {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Expr::Unknown)
    }

    /// Whether this can stand on the right of `IN`: a non-empty array value or a query
    pub fn is_in_operand(&self) -> bool {
        match self {
            Expr::Value(v) => v.value.as_array().is_some_and(|items| !items.is_empty()),
            Expr::Query(_) => true,
            _ => false,
        }
    }

    /// Whether this is a `Value` holding a JSON string
    pub fn is_string_value(&self) -> bool {
        matches!(self, Expr::Value(v) if v.value.is_string())
    }

    /// Completeness gate for a child slot
    pub(crate) fn check_slot(&self, node: &'static str, slot: &str) -> IrResult<()> {
        if self.is_unknown() {
            return Err(IrError::Incomplete {
                node,
                message: format!("{} expression is not set", slot),
            });
        }
        self.check()
    }

    /// Verify that every qualified column reference resolves in `scope`
    pub fn validate(&self, scope: &Scope) -> IrResult<()> {
        match self {
            Expr::Unknown | Expr::Value(_) | Expr::Variable(_) => Ok(()),
            Expr::Column(c) => c.validate(scope),
            Expr::Binary(b) => {
                b.left.validate(scope)?;
                b.right.validate(scope)
            }
            Expr::Between(b) => {
                b.left.validate(scope)?;
                b.start.validate(scope)?;
                b.end.validate(scope)
            }
            Expr::In(e) => {
                e.left.validate(scope)?;
                e.right.validate(scope)
            }
            Expr::IsNull(e) => e.left.validate(scope),
            Expr::Exists(e) => e.query.validate_in(&mut scope.child()),
            Expr::Case(c) => {
                if let Some(expression) = &c.expression {
                    expression.validate(scope)?;
                }
                for case in &c.cases {
                    case.when.validate(scope)?;
                    case.then.validate(scope)?;
                }
                match &c.otherwise {
                    Some(e) => e.validate(scope),
                    None => Ok(()),
                }
            }
            Expr::Function(f) => f.parameters.iter().try_for_each(|p| p.validate(scope)),
            Expr::Math(m) => m.operands.iter().try_for_each(|o| o.validate(scope)),
            Expr::Group(g) => g.expressions.iter().try_for_each(|e| e.validate(scope)),
            Expr::Query(q) => q.validate_in(&mut scope.child()),
        }
    }

    /// Collect names of tables read by sub-queries nested in this expression
    pub(crate) fn collect_reads(&self, reads: &mut BTreeSet<String>) {
        match self {
            Expr::Unknown | Expr::Value(_) | Expr::Column(_) | Expr::Variable(_) => {}
            Expr::Binary(b) => {
                b.left.collect_reads(reads);
                b.right.collect_reads(reads);
            }
            Expr::Between(b) => {
                b.left.collect_reads(reads);
                b.start.collect_reads(reads);
                b.end.collect_reads(reads);
            }
            Expr::In(e) => {
                e.left.collect_reads(reads);
                e.right.collect_reads(reads);
            }
            Expr::IsNull(e) => e.left.collect_reads(reads),
            Expr::Exists(e) => e.query.collect_reads(reads),
            Expr::Case(c) => {
                let children = c.expression.iter().map(|e| e.as_ref());
                let cases = c.cases.iter().flat_map(|w| [&w.when, &w.then]);
                let otherwise = c.otherwise.iter().map(|e| e.as_ref());
                for e in children.chain(cases).chain(otherwise) {
                    e.collect_reads(reads);
                }
            }
            Expr::Function(f) => f.parameters.iter().for_each(|p| p.collect_reads(reads)),
            Expr::Math(m) => m.operands.iter().for_each(|o| o.collect_reads(reads)),
            Expr::Group(g) => g.expressions.iter().for_each(|e| e.collect_reads(reads)),
            Expr::Query(q) => q.collect_reads(reads),
        }
    }
}

impl SqlNode for Expr {
    fn classname(&self) -> &'static str {
        each_expr!(self, e => e.classname(), unknown => "Unknown")
    }

    fn check(&self) -> IrResult<()> {
        each_expr!(self, e => e.check(), unknown => Err(IrError::Incomplete {
            node: "Unknown",
            message: "placeholder expression cannot be rendered".to_string(),
        }))
    }

    fn json_value(&self) -> Value {
        each_expr!(self, e => e.json_value(), unknown => Value::Null)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Query(q) => write!(f, "({})", q),
            other => each_expr!(other, e => write!(f, "{}", e), unknown => write!(f, "{}", PLACEHOLDER)),
        }
    }
}

macro_rules! impl_from_expr {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Expr {
            fn from(e: $ty) -> Self {
                Expr::$variant(e)
            }
        })*
    };
}

impl_from_expr!(
    ValueExpr => Value,
    ColumnExpr => Column,
    VariableExpr => Variable,
    BinaryExpr => Binary,
    BetweenExpr => Between,
    InExpr => In,
    IsNullExpr => IsNull,
    ExistsExpr => Exists,
    CaseExpr => Case,
    FunctionExpr => Function,
    MathExpr => Math,
    GroupExpr => Group,
);

impl From<Query> for Expr {
    fn from(q: Query) -> Self {
        Expr::Query(Box::new(q))
    }
}

/// Unqualified column reference
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(ColumnExpr::new(name))
}

/// Column reference qualified by a table name or alias
pub fn col_of(table: impl Into<String>, name: impl Into<String>) -> Expr {
    Expr::Column(ColumnExpr::new(name).with_table(table))
}

/// Literal value
pub fn value(v: impl Into<Value>) -> Expr {
    Expr::Value(ValueExpr::new(v))
}

/// Variable reference
pub fn var(name: impl Into<String>) -> Expr {
    Expr::Variable(VariableExpr::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_never_passes_check() {
        let err = Expr::Unknown.check().unwrap_err();
        assert!(matches!(err, IrError::Incomplete { .. }));
        assert!(Expr::Unknown.to_json().is_err());
        assert!(Expr::Unknown.to_sql().is_err());
        assert_eq!(Expr::Unknown.to_string(), "?");
    }

    #[test]
    fn test_helpers() {
        assert_eq!(col("id").to_string(), "`id`");
        assert_eq!(col_of("s", "id").to_string(), "`s`.`id`");
        assert_eq!(value("F").to_string(), "\"F\"");
        assert_eq!(var("total").to_string(), "@total");
        assert!(value(json!([1, 2])).is_in_operand());
        assert!(!value(json!([])).is_in_operand());
        assert!(value("x").is_string_value());
        assert!(!col("x").is_string_value());
    }
}
