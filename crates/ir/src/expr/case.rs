// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::fmt;

use serde_json::{Map, Value, json};

use crate::error::{IrError, IrResult};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::registry::NodeRegistry;

use super::Expr;

/// One `WHEN when THEN then` arm
#[derive(Debug, Clone, PartialEq)]
pub struct CaseWhen {
    pub when: Expr,
    pub then: Expr,
}

/// `CASE [expression] WHEN ... THEN ... [ELSE ...] END`
///
/// With `expression` set this is the simple form (`CASE x WHEN 1 THEN ...`),
/// otherwise every `when` is a boolean condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaseExpr {
    pub expression: Option<Box<Expr>>,
    pub cases: Vec<CaseWhen>,
    pub otherwise: Option<Box<Expr>>,
}

impl CaseExpr {
    pub const CLASSNAME: &'static str = "CaseExpression";

    pub fn builder() -> CaseBuilder {
        CaseBuilder::default()
    }
}

impl SqlNode for CaseExpr {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.cases.is_empty() {
            return Err(IrError::Incomplete {
                node: Self::CLASSNAME,
                message: "at least one WHEN/THEN pair is required".to_string(),
            });
        }
        if let Some(expression) = &self.expression {
            expression.check_slot(Self::CLASSNAME, "case")?;
        }
        for case in &self.cases {
            case.when.check_slot(Self::CLASSNAME, "when")?;
            case.then.check_slot(Self::CLASSNAME, "then")?;
        }
        match &self.otherwise {
            Some(otherwise) => otherwise.check_slot(Self::CLASSNAME, "else"),
            None => Ok(()),
        }
    }

    fn json_value(&self) -> Value {
        let cases = self
            .cases
            .iter()
            .map(|c| json!({ "when": c.when.json_value(), "then": c.then.json_value() }))
            .collect();
        JsonWriter::new(Self::CLASSNAME)
            .opt("expression", self.expression.as_ref().map(|e| e.json_value()))
            .list("cases", cases)
            .opt("else", self.otherwise.as_ref().map(|e| e.json_value()))
            .finish()
    }
}

impl fmt::Display for CaseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CASE ")?;
        if let Some(expression) = &self.expression {
            write!(f, "{} ", expression)?;
        }
        for case in &self.cases {
            write!(f, "WHEN {} THEN {} ", case.when, case.then)?;
        }
        if let Some(otherwise) = &self.otherwise {
            write!(f, "ELSE {} ", otherwise)?;
        }
        write!(f, "END")
    }
}

/// Builder for [`CaseExpr`]
#[derive(Debug, Clone, Default)]
pub struct CaseBuilder {
    expr: CaseExpr,
}

impl CaseBuilder {
    pub fn expression(&mut self, expression: impl Into<Expr>) -> &mut Self {
        self.expr.expression = Some(Box::new(expression.into()));
        self
    }

    pub fn when(&mut self, when: impl Into<Expr>, then: impl Into<Expr>) -> &mut Self {
        self.expr.cases.push(CaseWhen {
            when: when.into(),
            then: then.into(),
        });
        self
    }

    pub fn otherwise(&mut self, otherwise: impl Into<Expr>) -> &mut Self {
        self.expr.otherwise = Some(Box::new(otherwise.into()));
        self
    }

    pub fn build(&self) -> CaseExpr {
        self.expr.clone()
    }
}

pub(crate) fn revive(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(CaseExpr::CLASSNAME, map, registry);
    let cases = json
        .list("cases")?
        .iter()
        .map(|case| {
            let arm = case.as_object().ok_or_else(|| {
                IrError::invalid_json(CaseExpr::CLASSNAME, "each case must be an object")
            })?;
            let arm = JsonReader::new(CaseExpr::CLASSNAME, arm, registry);
            Ok(CaseWhen {
                when: arm.expr_or_unknown("when")?,
                then: arm.expr_or_unknown("then")?,
            })
        })
        .collect::<IrResult<Vec<_>>>()?;

    Ok(Node::Expr(Expr::Case(CaseExpr {
        expression: json.opt_expr("expression")?.map(Box::new),
        cases,
        otherwise: json.opt_expr("else")?.map(Box::new),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryExpr, col, value};

    #[test]
    fn test_searched_case() {
        let expr = CaseExpr::builder()
            .when(
                BinaryExpr::new(">=", col("score"), value(90)).unwrap(),
                value("A"),
            )
            .otherwise(value("B"))
            .build();
        assert_eq!(
            expr.to_sql().unwrap(),
            "CASE WHEN `score` >= 90 THEN \"A\" ELSE \"B\" END"
        );
    }

    #[test]
    fn test_simple_case() {
        let expr = CaseExpr::builder()
            .expression(col("grade"))
            .when(value(1), value("one"))
            .when(value(2), value("two"))
            .build();
        assert_eq!(
            expr.to_sql().unwrap(),
            "CASE `grade` WHEN 1 THEN \"one\" WHEN 2 THEN \"two\" END"
        );
    }

    #[test]
    fn test_case_without_arms_is_incomplete() {
        let expr = CaseExpr::builder().otherwise(value(0)).build();
        assert!(matches!(expr.check(), Err(IrError::Incomplete { .. })));
    }
}
