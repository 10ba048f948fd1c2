// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for expression construction, rendering and revival

use serde_json::json;
use typed_sql_ir::{
    BetweenExpr, BinaryExpr, CaseExpr, Dialect, ExistsExpr, Expr, FunctionExpr, GroupExpr,
    InExpr, IrError, IsNullExpr, MathExpr, NodeRegistry, Query, SqlNode, col, col_of, value, var,
};

fn revive(expr: &Expr) -> Expr {
    let json = expr.to_json().unwrap();
    NodeRegistry::global().revive_expr(&json).unwrap()
}

fn sample_expressions() -> Vec<Expr> {
    let sub_query = Query::builder()
        .select(col("studentId"))
        .from("ClubStudent")
        .build();
    vec![
        value("F"),
        value(json!([1, 2, 3])),
        col_of("s", "id"),
        var("total"),
        BinaryExpr::new(">=", col("age"), value(18)).unwrap().into(),
        BetweenExpr::new(col("age"), value(18), value(25)).negated().into(),
        InExpr::new(col("id"), sub_query.clone()).unwrap().into(),
        IsNullExpr::new(col("email")).negated().into(),
        ExistsExpr::new(sub_query).into(),
        CaseExpr::builder()
            .expression(col("gender"))
            .when(value("F"), value("female"))
            .otherwise(value("male"))
            .build()
            .into(),
        FunctionExpr::call("count", [col("id")]).unwrap().into(),
        MathExpr::new("*", [col("price"), value(2)]).unwrap().into(),
        GroupExpr::or([
            BinaryExpr::new("=", col("a"), value(1)).unwrap().into(),
            BinaryExpr::new("=", col("b"), value(2)).unwrap().into(),
        ])
        .into(),
    ]
}

#[test]
fn test_every_expression_kind_round_trips() {
    for expr in sample_expressions() {
        assert_eq!(revive(&expr), expr, "round trip of {}", expr);
    }
}

#[test]
fn test_serialization_is_deterministic() {
    for expr in sample_expressions() {
        let first = serde_json::to_string(&expr.to_json().unwrap()).unwrap();
        let second = serde_json::to_string(&revive(&expr).to_json().unwrap()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_rendering() {
    let expr: Expr = BinaryExpr::new("like", col("name"), value("K%"))
        .unwrap()
        .into();
    assert_eq!(expr.to_sql().unwrap(), "`name` LIKE \"K%\"");

    let expr: Expr = BetweenExpr::new(col("age"), value(18), value(25)).into();
    assert_eq!(expr.to_sql().unwrap(), "`age` BETWEEN 18 AND 25");

    let expr: Expr = MathExpr::new("+", [col("a"), col("b")]).unwrap().into();
    assert_eq!(expr.to_sql().unwrap(), "(`a` + `b`)");
}

#[test]
fn test_assignment_requires_variable() {
    assert!(BinaryExpr::new(":=", var("total"), value(1)).is_ok());
    for left in [col("total"), value(1)] {
        assert!(matches!(
            BinaryExpr::new(":=", left, value(1)),
            Err(IrError::InvalidOperand { .. })
        ));
    }
}

#[test]
fn test_negation_only_for_negatable_operators() {
    let mut builder = BinaryExpr::builder("LIKE").unwrap();
    assert!(builder.not(true).is_ok());

    let mut builder = BinaryExpr::builder("=").unwrap();
    assert!(matches!(
        builder.not(true),
        Err(IrError::InvalidNegation(_))
    ));
}

#[test]
fn test_is_operator_fixes_null_right_side() {
    let expr: Expr = BinaryExpr::new("IS", col("email"), value(1))
        .unwrap()
        .into();
    assert_eq!(expr.to_sql().unwrap(), "`email` IS NULL");
}

#[test]
fn test_in_requires_list_or_query() {
    assert!(InExpr::new(col("id"), value(json!([1, 2]))).is_ok());
    assert!(InExpr::new(col("id"), value(1)).is_err());
}

#[test]
fn test_unknown_slot_blocks_serialization() {
    let mut builder = BinaryExpr::builder("=").unwrap();
    builder.left(col("id")).unwrap();
    let expr: Expr = builder.build().into();
    assert!(matches!(expr.to_json(), Err(IrError::Incomplete { .. })));
    assert!(matches!(expr.to_sql(), Err(IrError::Incomplete { .. })));
    assert_eq!(expr.to_string(), "`id` = ?");
}

#[test]
fn test_dialect_operator_whitelist() {
    let json = json!({
        "classname": "BinaryExpression",
        "operator": "ILIKE",
        "left": { "classname": "ColumnExpression", "column": "name" },
        "right": { "classname": "Value", "value": "k%" },
    });
    let mysql = NodeRegistry::with_dialect(Dialect::MySQL);
    assert!(matches!(
        mysql.revive_expr(&json),
        Err(IrError::UnsupportedOperator { .. })
    ));
    let postgres = NodeRegistry::with_dialect(Dialect::PostgreSQL);
    assert!(postgres.revive_expr(&json).is_ok());
}

#[test]
fn test_unknown_tag_is_rejected() {
    let json = json!({ "classname": "Bogus" });
    assert_eq!(
        NodeRegistry::global().revive_expr(&json),
        Err(IrError::KindNotFound("Bogus".to_string()))
    );
}
