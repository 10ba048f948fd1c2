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
use crate::render::Literal;

/// Literal value (string, number, boolean, null or array of those)
#[derive(Debug, Clone, PartialEq)]
pub struct ValueExpr {
    pub value: Value,
}

impl ValueExpr {
    pub const CLASSNAME: &'static str = "Value";

    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn null() -> Self {
        Self { value: Value::Null }
    }
}

impl SqlNode for ValueExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        Ok(())
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("value", self.value.clone())
            .finish()
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Literal(&self.value))
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(ValueExpr::CLASSNAME, map, registry);
    let value = json.raw("value").cloned().unwrap_or(Value::Null);
    Ok(Node::Expr(ValueExpr::new(value).into()))
}
