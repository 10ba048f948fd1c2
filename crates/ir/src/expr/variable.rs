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

/// Session variable reference, rendered as `@name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableExpr {
    pub name: String,
}

impl VariableExpr {
    pub const CLASSNAME: &'static str = "Variable";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SqlNode for VariableExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.name.is_empty() {
            return Err(IrError::MissingField {
                node: Self::CLASSNAME,
                field: "name",
            });
        }
        Ok(())
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("name", self.name.clone())
            .finish()
    }
}

impl fmt::Display for VariableExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(VariableExpr::CLASSNAME, map, registry);
    Ok(Node::Expr(VariableExpr::new(json.str("name")?).into()))
}
