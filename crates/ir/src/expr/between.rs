// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::fmt;

use serde_json::{Map, Value};

use crate::error::IrResult;
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::registry::NodeRegistry;

use super::Expr;

/// `left [NOT ]BETWEEN start AND end`
#[derive(Debug, Clone, PartialEq)]
pub struct BetweenExpr {
    pub left: Box<Expr>,
    pub start: Box<Expr>,
    pub end: Box<Expr>,
    pub not: bool,
}

impl BetweenExpr {
    pub const CLASSNAME: &'static str = "BetweenExpression";

    pub fn new(left: impl Into<Expr>, start: impl Into<Expr>, end: impl Into<Expr>) -> Self {
        Self {
            left: Box::new(left.into()),
            start: Box::new(start.into()),
            end: Box::new(end.into()),
            not: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.not = !self.not;
        self
    }
}

impl SqlNode for BetweenExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        self.left.check_slot(Self::CLASSNAME, "left")?;
        self.start.check_slot(Self::CLASSNAME, "start")?;
        self.end.check_slot(Self::CLASSNAME, "end")
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("left", self.left.json_value())
            .set("start", self.start.json_value())
            .set("end", self.end.json_value())
            .flag("not", self.not)
            .finish()
    }
}

impl fmt::Display for BetweenExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.not { "NOT " } else { "" };
        write!(
            f,
            "{} {}BETWEEN {} AND {}",
            self.left, not, self.start, self.end
        )
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(BetweenExpr::CLASSNAME, map, registry);
    let mut expr = BetweenExpr::new(
        json.expr_or_unknown("left")?,
        json.expr_or_unknown("start")?,
        json.expr_or_unknown("end")?,
    );
    expr.not = json.flag("not")?;
    Ok(Node::Expr(expr.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, value};

    #[test]
    fn test_between_rendering() {
        let expr = BetweenExpr::new(col("age"), value(18), value(30));
        assert_eq!(expr.to_sql().unwrap(), "`age` BETWEEN 18 AND 30");
        assert_eq!(
            expr.negated().to_sql().unwrap(),
            "`age` NOT BETWEEN 18 AND 30"
        );
    }

    #[test]
    fn test_missing_bound_is_incomplete() {
        let expr = BetweenExpr::new(col("age"), value(18), Expr::Unknown);
        assert!(expr.check().is_err());
    }
}
