// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::fmt;

use serde_json::{Map, Value};

use crate::dialect::MATH_OPERATORS;
use crate::error::{IrError, IrResult};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::registry::NodeRegistry;

use super::Expr;

/// Arithmetic over two or more operands, rendered parenthesised: `(a + b)`
#[derive(Debug, Clone, PartialEq)]
pub struct MathExpr {
    pub operator: String,
    pub operands: Vec<Expr>,
}

fn normalize_operator(operator: &str) -> IrResult<String> {
    MATH_OPERATORS
        .iter()
        .find(|op| op.eq_ignore_ascii_case(operator))
        .map(|op| op.to_string())
        .ok_or_else(|| IrError::UnsupportedOperator {
            node: MathExpr::CLASSNAME,
            operator: operator.to_string(),
        })
}

impl MathExpr {
    pub const CLASSNAME: &'static str = "MathExpression";

    pub fn builder(operator: &str) -> IrResult<MathBuilder> {
        Ok(MathBuilder {
            expr: MathExpr {
                operator: normalize_operator(operator)?,
                operands: Vec::new(),
            },
        })
    }

    pub fn new(operator: &str, operands: impl IntoIterator<Item = Expr>) -> IrResult<Self> {
        let mut builder = Self::builder(operator)?;
        builder.expr.operands.extend(operands);
        Ok(builder.build())
    }
}

impl SqlNode for MathExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        normalize_operator(&self.operator)?;
        if self.operands.len() < 2 {
            return Err(IrError::Incomplete {
                node: Self::CLASSNAME,
                message: format!(
                    "operator '{}' needs at least 2 operands, found {}",
                    self.operator,
                    self.operands.len()
                ),
            });
        }
        self.operands
            .iter()
            .try_for_each(|o| o.check_slot(Self::CLASSNAME, "operand"))
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("operator", self.operator.clone())
            .list(
                "operands",
                self.operands.iter().map(SqlNode::json_value).collect(),
            )
            .finish()
    }
}

impl fmt::Display for MathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.operator)?;
            }
            write!(f, "{}", operand)?;
        }
        write!(f, ")")
    }
}

/// Builder for [`MathExpr`]
#[derive(Debug, Clone)]
pub struct MathBuilder {
    expr: MathExpr,
}

impl MathBuilder {
    pub fn operand(&mut self, operand: impl Into<Expr>) -> &mut Self {
        self.expr.operands.push(operand.into());
        self
    }

    pub fn build(&self) -> MathExpr {
        self.expr.clone()
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(MathExpr::CLASSNAME, map, registry);
    Ok(Node::Expr(Expr::Math(MathExpr {
        operator: normalize_operator(json.str("operator")?)?,
        operands: json.exprs("operands")?,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, value};

    #[test]
    fn test_math_rendering() {
        let expr = MathExpr::new("+", [col("a"), col("b"), value(1)]).unwrap();
        assert_eq!(expr.to_sql().unwrap(), "(`a` + `b` + 1)");

        let div = MathExpr::new("div", [col("a"), value(2)]).unwrap();
        assert_eq!(div.to_sql().unwrap(), "(`a` DIV 2)");
    }

    #[test]
    fn test_single_operand_is_incomplete() {
        let mut builder = MathExpr::builder("*").unwrap();
        builder.operand(col("a"));
        assert!(matches!(
            builder.build().check(),
            Err(IrError::Incomplete { .. })
        ));
        builder.operand(value(3));
        assert!(builder.build().check().is_ok());
    }

    #[test]
    fn test_unknown_operator() {
        assert!(matches!(
            MathExpr::builder("^"),
            Err(IrError::UnsupportedOperator { .. })
        ));
    }
}
