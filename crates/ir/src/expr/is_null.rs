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

/// `left IS [NOT ]NULL`
#[derive(Debug, Clone, PartialEq)]
pub struct IsNullExpr {
    pub left: Box<Expr>,
    pub not: bool,
}

impl IsNullExpr {
    pub const CLASSNAME: &'static str = "IsNullExpression";

    pub fn new(left: impl Into<Expr>) -> Self {
        Self {
            left: Box::new(left.into()),
            not: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.not = !self.not;
        self
    }
}

impl SqlNode for IsNullExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        self.left.check_slot(Self::CLASSNAME, "left")
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("left", self.left.json_value())
            .flag("not", self.not)
            .finish()
    }
}

impl fmt::Display for IsNullExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.not { "NOT " } else { "" };
        write!(f, "{} IS {}NULL", self.left, not)
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(IsNullExpr::CLASSNAME, map, registry);
    let mut expr = IsNullExpr::new(json.expr_or_unknown("left")?);
    expr.not = json.flag("not")?;
    Ok(Node::Expr(expr.into()))
}
