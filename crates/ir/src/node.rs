// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Nodes
//!
//! [`SqlNode`] is the capability every IR node shares: a type tag, a
//! structural check, and the two canonical serializations.
//!
//! [`Node`] is the closed sum of every node kind the
//! [`NodeRegistry`](crate::NodeRegistry) can revive from tagged JSON.

use std::fmt;

use serde_json::Value;

use crate::ddl::{ColumnDef, PrimaryKeyConstraint};
use crate::error::{IrError, IrResult};
use crate::expr::Expr;
use crate::query::{GroupBy, Limit, OrderBy, Query, ResultColumn};
use crate::statement::Statement;
use crate::table::{FromTable, JoinClause, Table};

/// Capability shared by all IR nodes
///
/// `Display` writes SQL text for any node, filling unset slots with `?`.
/// [`to_sql`](SqlNode::to_sql) and [`to_json`](SqlNode::to_json) refuse
/// nodes that do not pass [`check`](SqlNode::check).
pub trait SqlNode: fmt::Display {
    /// Type tag written under `classname`
    fn classname(&self) -> &'static str;

    /// Structural invariants, recursively
    fn check(&self) -> IrResult<()>;

    /// Tagged JSON without running `check`
    fn json_value(&self) -> Value;

    fn to_json(&self) -> IrResult<Value> {
        self.check()?;
        Ok(self.json_value())
    }

    fn to_sql(&self) -> IrResult<String> {
        self.check()?;
        Ok(self.to_string())
    }
}

/// Fails with `MissingField` when a statement's table or schema name is empty
pub(crate) fn require_name(node: &'static str, name: &str) -> IrResult<()> {
    if name.is_empty() {
        return Err(IrError::MissingField {
            node,
            field: "name",
        });
    }
    Ok(())
}

/// Any node that can be revived from tagged JSON
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expr(Expr),
    Table(Table),
    FromTable(FromTable),
    JoinClause(JoinClause),
    ColumnDef(ColumnDef),
    PrimaryKey(PrimaryKeyConstraint),
    ResultColumn(ResultColumn),
    OrderBy(OrderBy),
    GroupBy(GroupBy),
    Limit(Limit),
    Statement(Statement),
}

macro_rules! each_node {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Node::Expr($inner) => $body,
            Node::Table($inner) => $body,
            Node::FromTable($inner) => $body,
            Node::JoinClause($inner) => $body,
            Node::ColumnDef($inner) => $body,
            Node::PrimaryKey($inner) => $body,
            Node::ResultColumn($inner) => $body,
            Node::OrderBy($inner) => $body,
            Node::GroupBy($inner) => $body,
            Node::Limit($inner) => $body,
            Node::Statement($inner) => $body,
        }
    };
}

impl Node {
    fn unexpected(self, expected: &'static str) -> IrError {
        IrError::UnexpectedKind {
            expected,
            found: self.classname().to_string(),
        }
    }

    /// Expression view; a revived `Query` statement is a sub-query expression
    pub fn into_expr(self) -> IrResult<Expr> {
        match self {
            Node::Expr(e) => Ok(e),
            Node::Statement(Statement::Query(q)) => Ok(Expr::Query(q)),
            other => Err(other.unexpected("expression")),
        }
    }

    pub fn into_table(self) -> IrResult<Table> {
        match self {
            Node::Table(t) => Ok(t),
            other => Err(other.unexpected("table")),
        }
    }

    pub fn into_statement(self) -> IrResult<Statement> {
        match self {
            Node::Statement(s) => Ok(s),
            Node::Expr(Expr::Query(q)) => Ok(Statement::Query(q)),
            other => Err(other.unexpected("statement")),
        }
    }

    pub fn into_query(self) -> IrResult<Query> {
        match self.into_statement()? {
            Statement::Query(q) => Ok(*q),
            other => Err(Node::Statement(other).unexpected("Query")),
        }
    }

    pub fn into_from_table(self) -> IrResult<FromTable> {
        match self {
            Node::FromTable(f) => Ok(f),
            // a bare table is a FROM item without joins
            Node::Table(t) => Ok(FromTable::new(t)),
            other => Err(other.unexpected("FromTable")),
        }
    }

    pub fn into_join_clause(self) -> IrResult<JoinClause> {
        match self {
            Node::JoinClause(j) => Ok(j),
            other => Err(other.unexpected("JoinClause")),
        }
    }

    pub fn into_column_def(self) -> IrResult<ColumnDef> {
        match self {
            Node::ColumnDef(c) => Ok(c),
            other => Err(other.unexpected("ColumnDef")),
        }
    }

    pub fn into_primary_key(self) -> IrResult<PrimaryKeyConstraint> {
        match self {
            Node::PrimaryKey(p) => Ok(p),
            other => Err(other.unexpected("PrimaryKeyConstraint")),
        }
    }

    pub fn into_result_column(self) -> IrResult<ResultColumn> {
        match self {
            Node::ResultColumn(r) => Ok(r),
            // plain expressions are accepted as unaliased result columns
            Node::Expr(e) => Ok(ResultColumn::new(e)),
            other => Err(other.unexpected("ResultColumn")),
        }
    }

    pub fn into_order_by(self) -> IrResult<OrderBy> {
        match self {
            Node::OrderBy(o) => Ok(o),
            other => Err(other.unexpected("OrderBy")),
        }
    }

    pub fn into_group_by(self) -> IrResult<GroupBy> {
        match self {
            Node::GroupBy(g) => Ok(g),
            other => Err(other.unexpected("GroupBy")),
        }
    }

    pub fn into_limit(self) -> IrResult<Limit> {
        match self {
            Node::Limit(l) => Ok(l),
            other => Err(other.unexpected("Limit")),
        }
    }
}

impl SqlNode for Node {
    fn classname(&self) -> &'static str {
        each_node!(self, n => n.classname())
    }

    fn check(&self) -> IrResult<()> {
        each_node!(self, n => n.check())
    }

    fn json_value(&self) -> Value {
        each_node!(self, n => n.json_value())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        each_node!(self, n => write!(f, "{}", n))
    }
}

macro_rules! impl_from_node {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Node {
            fn from(n: $ty) -> Self {
                Node::$variant(n)
            }
        })*
    };
}

impl_from_node!(
    Expr => Expr,
    Table => Table,
    FromTable => FromTable,
    JoinClause => JoinClause,
    ColumnDef => ColumnDef,
    PrimaryKeyConstraint => PrimaryKey,
    ResultColumn => ResultColumn,
    OrderBy => OrderBy,
    GroupBy => GroupBy,
    Limit => Limit,
    Statement => Statement,
);
