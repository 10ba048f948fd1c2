// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{IrError, IrResult};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::query::Query;
use crate::registry::NodeRegistry;

/// `[NOT ]EXISTS (query)`
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsExpr {
    pub query: Box<Query>,
    pub not: bool,
}

impl ExistsExpr {
    pub const CLASSNAME: &'static str = "ExistsExpression";

    pub fn new(query: Query) -> Self {
        Self {
            query: Box::new(query),
            not: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.not = !self.not;
        self
    }
}

impl SqlNode for ExistsExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        self.query.check()
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("query", self.query.json_value())
            .flag("not", self.not)
            .finish()
    }
}

impl fmt::Display for ExistsExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.not { "NOT " } else { "" };
        write!(f, "{}EXISTS ({})", not, self.query)
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(ExistsExpr::CLASSNAME, map, registry);
    let query = json.get("query").ok_or(IrError::MissingField {
        node: ExistsExpr::CLASSNAME,
        field: "query",
    })?;
    let mut expr = ExistsExpr::new(registry.revive_query(query)?);
    expr.not = json.flag("not")?;
    Ok(Node::Expr(expr.into()))
}
