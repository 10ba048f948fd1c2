// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{IrError, IrResult};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::registry::NodeRegistry;

use super::Expr;

/// `left [NOT ]IN (...)` where the right side is an array value or a sub-query
#[derive(Debug, Clone, PartialEq)]
pub struct InExpr {
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub not: bool,
}

fn check_right(right: &Expr) -> IrResult<()> {
    if right.is_unknown() || right.is_in_operand() {
        Ok(())
    } else {
        Err(IrError::invalid_operand(
            "IN",
            "right expression must be a non-empty array or a query",
        ))
    }
}

impl InExpr {
    pub const CLASSNAME: &'static str = "InExpression";

    pub fn new(left: impl Into<Expr>, right: impl Into<Expr>) -> IrResult<Self> {
        let right = right.into();
        check_right(&right)?;
        Ok(Self {
            left: Box::new(left.into()),
            right: Box::new(right),
            not: false,
        })
    }

    pub fn negated(mut self) -> Self {
        self.not = !self.not;
        self
    }
}

impl SqlNode for InExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        check_right(&self.right)?;
        self.left.check_slot(Self::CLASSNAME, "left")?;
        self.right.check_slot(Self::CLASSNAME, "right")
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("left", self.left.json_value())
            .set("right", self.right.json_value())
            .flag("not", self.not)
            .finish()
    }
}

impl fmt::Display for InExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.not { "NOT " } else { "" };
        write!(f, "{} {}IN {}", self.left, not, self.right)
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(InExpr::CLASSNAME, map, registry);
    let mut expr = InExpr::new(json.expr_or_unknown("left")?, json.expr_or_unknown("right")?)?;
    expr.not = json.flag("not")?;
    Ok(Node::Expr(expr.into()))
}
