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
use crate::render::Qualified;
use crate::scope::Scope;

/// Column reference, optionally qualified by a table name or alias
///
/// The name `*` is the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnExpr {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnExpr {
    pub const CLASSNAME: &'static str = "ColumnExpression";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }

    pub(crate) fn validate(&self, scope: &Scope) -> IrResult<()> {
        match &self.table {
            Some(table) if !scope.resolves(table) => Err(IrError::UnknownTable(table.clone())),
            _ => Ok(()),
        }
    }
}

impl SqlNode for ColumnExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.name.is_empty() {
            return Err(IrError::MissingField {
                node: Self::CLASSNAME,
                field: "column",
            });
        }
        Ok(())
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .opt("table", self.table.clone())
            .set("column", self.name.clone())
            .finish()
    }
}

impl fmt::Display for ColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Qualified(self.table.as_deref(), &self.name))
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(ColumnExpr::CLASSNAME, map, registry);
    let mut column = ColumnExpr::new(json.str("column")?);
    column.table = json.opt_str("table")?.map(str::to_string);
    Ok(Node::Expr(column.into()))
}
