// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Helpers for reading and writing the tagged JSON form of nodes.
//!
//! Canonical form: every node object carries `classname`, absent optional
//! fields are omitted, `false` flags are omitted and empty lists are omitted.

use serde_json::{Map, Value};

use crate::error::{IrError, IrResult};
use crate::expr::Expr;
use crate::registry::NodeRegistry;

/// Key holding the type tag of every serialized node
pub const CLASSNAME: &str = "classname";

/// Read-only view over the JSON object of one node
pub(crate) struct JsonReader<'a> {
    node: &'static str,
    map: &'a Map<String, Value>,
    registry: &'a NodeRegistry,
}

impl<'a> JsonReader<'a> {
    pub(crate) fn new(
        node: &'static str,
        map: &'a Map<String, Value>,
        registry: &'a NodeRegistry,
    ) -> Self {
        Self {
            node,
            map,
            registry,
        }
    }

    pub(crate) fn registry(&self) -> &'a NodeRegistry {
        self.registry
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Raw value including explicit `null`
    pub(crate) fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    pub(crate) fn str(&self, key: &'static str) -> IrResult<&'a str> {
        self.opt_str(key)?.ok_or(IrError::MissingField {
            node: self.node,
            field: key,
        })
    }

    pub(crate) fn opt_str(&self, key: &str) -> IrResult<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.type_error(key, "string", other)),
        }
    }

    pub(crate) fn flag(&self, key: &str) -> IrResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.type_error(key, "boolean", other)),
        }
    }

    pub(crate) fn opt_u64(&self, key: &str) -> IrResult<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.type_error(key, "unsigned integer", v)),
        }
    }

    pub(crate) fn list(&self, key: &str) -> IrResult<&'a [Value]> {
        match self.get(key) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(self.type_error(key, "array", other)),
        }
    }

    pub(crate) fn strings(&self, key: &str) -> IrResult<Vec<String>> {
        self.list(key)?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.type_error(key, "array of strings", v))
            })
            .collect()
    }

    pub(crate) fn opt_expr(&self, key: &str) -> IrResult<Option<Expr>> {
        self.get(key)
            .map(|v| self.registry.revive_expr(v))
            .transpose()
    }

    /// Missing expression slots revive as [`Expr::Unknown`]
    pub(crate) fn expr_or_unknown(&self, key: &str) -> IrResult<Expr> {
        Ok(self.opt_expr(key)?.unwrap_or(Expr::Unknown))
    }

    pub(crate) fn exprs(&self, key: &str) -> IrResult<Vec<Expr>> {
        self.list(key)?
            .iter()
            .map(|v| self.registry.revive_expr(v))
            .collect()
    }

    fn type_error(&self, key: &str, expected: &str, found: &Value) -> IrError {
        IrError::invalid_json(
            self.node,
            format!("field '{}' must be {}, found {}", key, expected, found),
        )
    }
}

/// Writer producing the canonical JSON object of one node
pub(crate) struct JsonWriter {
    map: Map<String, Value>,
}

impl JsonWriter {
    pub(crate) fn new(classname: &'static str) -> Self {
        let mut map = Map::new();
        map.insert(CLASSNAME.to_string(), Value::String(classname.to_string()));
        Self { map }
    }

    pub(crate) fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.map.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub(crate) fn flag(self, key: &str, value: bool) -> Self {
        if value { self.set(key, true) } else { self }
    }

    pub(crate) fn list(self, key: &str, values: Vec<Value>) -> Self {
        if values.is_empty() {
            self
        } else {
            self.set(key, Value::Array(values))
        }
    }

    pub(crate) fn finish(self) -> Value {
        Value::Object(self.map)
    }
}

/// Extract the object map and its tag from a node's JSON
pub(crate) fn tagged_object(json: &Value) -> IrResult<(&str, &Map<String, Value>)> {
    let map = json
        .as_object()
        .ok_or_else(|| IrError::invalid_json("node", format!("expected an object, found {}", json)))?;
    let tag = map
        .get(CLASSNAME)
        .and_then(Value::as_str)
        .ok_or_else(|| IrError::invalid_json("node", format!("missing '{}' tag", CLASSNAME)))?;
    Ok((tag, map))
}
