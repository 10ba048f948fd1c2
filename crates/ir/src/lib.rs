// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Typed SQL IR
//!
//! A typed intermediate representation of SQL statements.
//! The IR is designed to:
//! - Be built incrementally through builders that reject invalid shapes early
//! - Validate whole trees, including table-alias resolution
//! - Serialize to a canonical tagged JSON form and revive from it
//! - Render deterministic SQL text for logging and debugging
//!
//! ```
//! use typed_sql_ir::{BinaryExpr, Delete, SqlNode, col, value};
//!
//! let delete = Delete::builder("Student")
//!     .where_clause(BinaryExpr::new("=", col("id"), value(1)).unwrap())
//!     .build();
//! assert_eq!(delete.to_sql().unwrap(), "DELETE FROM `Student` WHERE `id` = 1");
//! ```

pub mod ddl;
pub mod dialect;
pub mod error;
pub mod expr;
mod json;
pub mod node;
pub mod query;
pub mod registry;
pub mod render;
pub mod scope;
pub mod statement;
pub mod table;

// Re-export commonly used types
pub use ddl::{
    ColumnDef, CreateSchema, CreateTable, CreateTableBuilder, DropSchema, DropTable,
    PrimaryKeyConstraint,
};
pub use dialect::Dialect;
pub use error::{IrError, IrResult};
pub use expr::{
    BetweenExpr, BinaryBuilder, BinaryExpr, CaseBuilder, CaseExpr, CaseWhen, ColumnExpr,
    ExistsExpr, Expr, FunctionBuilder, FunctionExpr, GroupBuilder, GroupExpr, GroupOperator,
    InExpr, IsNullExpr, MathBuilder, MathExpr, ValueExpr, VariableExpr, col, col_of, value, var,
};
pub use json::CLASSNAME;
pub use node::{Node, SqlNode};
pub use query::{GroupBy, Limit, OrderBy, Query, QueryBuilder, ResultColumn, SortDirection};
pub use registry::{Constructor, NodeRegistry};
pub use scope::Scope;
pub use statement::{
    Delete, DeleteBuilder, Insert, InsertBuilder, InsertSource, Statement, TableAccess, Update,
    UpdateBuilder,
};
pub use table::{FromTable, JoinClause, JoinOperator, QueryTable, RemoteTable, SchemaTable, Table};
