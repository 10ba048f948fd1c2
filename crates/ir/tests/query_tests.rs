// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for queries, tables and joins

use serde_json::json;
use typed_sql_ir::{
    BinaryExpr, ColumnDef, Expr, FromTable, IrError, JoinClause, JoinOperator, NodeRegistry,
    Query, QueryTable, RemoteTable, SchemaTable, SortDirection, SqlNode, Statement, Table, col, col_of,
    value,
};

fn eq(left: Expr, right: Expr) -> Expr {
    BinaryExpr::new("=", left, right).unwrap().into()
}

fn round_trip(query: &Query) -> Query {
    let json = query.to_json().unwrap();
    NodeRegistry::global().revive_query(&json).unwrap()
}

fn student_with_class() -> Query {
    let from = FromTable::new(SchemaTable::new("Student").with_alias("s")).join(
        JoinClause::new(
            JoinOperator::Inner,
            SchemaTable::new("Class").with_alias("c"),
            [
                eq(col_of("s", "class_id"), col_of("c", "id")),
                eq(col_of("c", "open"), value(true)),
            ],
        )
        .unwrap(),
    );
    Query::builder()
        .select(col_of("s", "name"))
        .select_as(col_of("c", "name"), "class")
        .from(from)
        .where_clause(eq(col_of("s", "gender"), value("F")))
        .order_by(col_of("s", "name"), SortDirection::Asc)
        .limit(10, Some(5))
        .build()
}

#[test]
fn test_select_without_from() {
    let query = Query::builder().select(value(1)).build();
    assert!(query.validate().is_ok());
    assert_eq!(query.to_sql().unwrap(), "SELECT 1");
    assert_eq!(round_trip(&query), query);
}

#[test]
fn test_select_star() {
    let query = Query::builder().from("Student").build();
    assert_eq!(query.to_sql().unwrap(), "SELECT * FROM `Student`");
}

#[test]
fn test_joined_query_round_trip() {
    let query = student_with_class();
    query.validate().unwrap();
    let revived = round_trip(&query);
    assert_eq!(revived, query);
    assert_eq!(revived.to_sql().unwrap(), query.to_sql().unwrap());
    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT `s`.`name`, `c`.`name` AS `class` FROM `Student` `s` \
         INNER JOIN `Class` `c` ON (`s`.`class_id` = `c`.`id` AND `c`.`open` = true) \
         WHERE `s`.`gender` = \"F\" ORDER BY `s`.`name` ASC LIMIT 10 OFFSET 5"
    );
}

#[test]
fn test_join_condition_rules() {
    assert!(matches!(
        JoinClause::new(JoinOperator::Left, "Class", Vec::new()),
        Err(IrError::InvalidJoin { .. })
    ));
    assert!(matches!(
        JoinClause::new(
            JoinOperator::Cross,
            "Class",
            [eq(col("a"), col("b"))]
        ),
        Err(IrError::InvalidJoin { .. })
    ));
    assert!(JoinClause::new(JoinOperator::Cross, "Class", Vec::new()).is_ok());
}

#[test]
fn test_join_alias_must_be_unique() {
    let from = FromTable::new(SchemaTable::new("Student").with_alias("s"))
        .join(JoinClause::cross(SchemaTable::new("Class").with_alias("s")));
    let query = Query::builder().from(from).build();
    assert_eq!(
        query.validate(),
        Err(IrError::DuplicateAlias("s".to_string()))
    );
}

#[test]
fn test_derived_table() {
    let inner = Query::builder()
        .select(col("id"))
        .from("Student")
        .build();
    let query = Query::builder()
        .select(col_of("t", "id"))
        .from(Table::from(QueryTable::new(inner, "t")))
        .build();
    query.validate().unwrap();
    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT `t`.`id` FROM (SELECT `id` FROM `Student`) `t`"
    );
    assert_eq!(round_trip(&query), query);

    let access = Statement::from(query).table_access();
    assert!(access.reads.contains("Student"));
    assert!(access.writes.is_empty());
}

#[test]
fn test_derived_table_cannot_see_outer_aliases() {
    let inner = Query::builder()
        .select(col_of("s", "id"))
        .from("Club")
        .build();
    let query = Query::builder()
        .from(SchemaTable::new("Student").with_alias("s"))
        .from(Table::from(QueryTable::new(inner, "t")))
        .build();
    assert_eq!(
        query.validate(),
        Err(IrError::UnknownTable("s".to_string()))
    );
}

#[test]
fn test_remote_table_round_trip() {
    let remote = RemoteTable::new(
        json!({ "url": "http://example.com/students" }),
        vec![ColumnDef::new("id", "INTEGER").primary_key()],
        "r",
    );
    let query = Query::builder()
        .select(col_of("r", "id"))
        .from(Table::from(remote))
        .build();
    query.validate().unwrap();
    assert_eq!(round_trip(&query), query);
}

#[test]
fn test_query_statement_conversion() {
    let query = student_with_class();
    let json = query.to_json().unwrap();
    let statement = NodeRegistry::global().revive_statement(&json).unwrap();
    assert!(matches!(&statement, Statement::Query(q) if **q == query));
    let expr = NodeRegistry::global().revive_expr(&json).unwrap();
    assert!(matches!(expr, Expr::Query(_)));
}

#[test]
fn test_order_by_sub_query_table_access() {
    let ranking = Query::builder().select(col("rank")).from("Ranking").build();
    let query = Query::builder()
        .from("Student")
        .order_by(ranking, SortDirection::Asc)
        .build();
    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT * FROM `Student` ORDER BY (SELECT `rank` FROM `Ranking`) ASC"
    );

    let access = Statement::from(query).table_access();
    assert_eq!(
        access.reads.into_iter().collect::<Vec<_>>(),
        vec!["Ranking".to_string(), "Student".to_string()]
    );
}
