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
use crate::render::List;

use super::Expr;

/// Function call, e.g. `COUNT(DISTINCT `id`)`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    /// Upper-cased function name
    pub name: String,
    pub parameters: Vec<Expr>,
    pub distinct: bool,
}

fn normalize_name(name: &str) -> IrResult<String> {
    if name.is_empty() {
        return Err(IrError::MissingField {
            node: FunctionExpr::CLASSNAME,
            field: "name",
        });
    }
    Ok(name.to_ascii_uppercase())
}

impl FunctionExpr {
    pub const CLASSNAME: &'static str = "FunctionExpression";

    pub fn builder(name: &str) -> IrResult<FunctionBuilder> {
        Ok(FunctionBuilder {
            expr: FunctionExpr {
                name: normalize_name(name)?,
                parameters: Vec::new(),
                distinct: false,
            },
        })
    }

    pub fn call(name: &str, parameters: impl IntoIterator<Item = Expr>) -> IrResult<Self> {
        let mut builder = Self::builder(name)?;
        builder.expr.parameters.extend(parameters);
        Ok(builder.build())
    }
}

impl SqlNode for FunctionExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        normalize_name(&self.name)?;
        self.parameters
            .iter()
            .try_for_each(|p| p.check_slot(Self::CLASSNAME, "parameter"))
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("name", self.name.clone())
            .list(
                "parameters",
                self.parameters.iter().map(SqlNode::json_value).collect(),
            )
            .flag("distinct", self.distinct)
            .finish()
    }
}

impl fmt::Display for FunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        write!(
            f,
            "{}({}{})",
            self.name,
            distinct,
            List(&self.parameters, ", ")
        )
    }
}

/// Builder for [`FunctionExpr`]
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    expr: FunctionExpr,
}

impl FunctionBuilder {
    pub fn param(&mut self, parameter: impl Into<Expr>) -> &mut Self {
        self.expr.parameters.push(parameter.into());
        self
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.expr.distinct = distinct;
        self
    }

    pub fn build(&self) -> FunctionExpr {
        self.expr.clone()
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(FunctionExpr::CLASSNAME, map, registry);
    Ok(Node::Expr(Expr::Function(FunctionExpr {
        name: normalize_name(json.str("name")?)?,
        parameters: json.exprs("parameters")?,
        distinct: json.flag("distinct")?,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::col;

    #[test]
    fn test_function_rendering() {
        let count = FunctionExpr::builder("count")
            .unwrap()
            .param(col("id"))
            .distinct(true)
            .build();
        assert_eq!(count.name, "COUNT");
        assert_eq!(count.to_sql().unwrap(), "COUNT(DISTINCT `id`)");

        let now = FunctionExpr::call("now", Vec::new()).unwrap();
        assert_eq!(now.to_sql().unwrap(), "NOW()");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(FunctionExpr::builder("").is_err());
    }
}
