// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Query Representation
//!
//! This module represents SELECT queries in the IR.
//!
//! ## Query Structure
//!
//! A [`Query`] consists of:
//!
//! - **Projection**: [`ResultColumn`]s; empty means `*`
//! - **FROM**: comma separated [`FromTable`] items, each with its joins
//! - **WHERE**: row filtering condition
//! - **GROUP BY**: [`GroupBy`] expressions with an optional HAVING condition
//! - **ORDER BY**: [`OrderBy`] terms
//! - **LIMIT**: [`Limit`] with an optional offset
//! - **Distinct**: DISTINCT modifier
//!
//! A query is also usable as an expression (sub-query), see
//! [`Expr::Query`].
//!
//! ## Building
//!
//! ```rust
//! use typed_sql_ir::{BinaryExpr, Query, SortDirection, SqlNode, col, value};
//!
//! let query = Query::builder()
//!     .from("Student")
//!     .where_clause(BinaryExpr::new("=", col("gender"), value("F")).unwrap())
//!     .order_by(col("id"), SortDirection::Asc)
//!     .build();
//!
//! assert_eq!(
//!     query.to_sql().unwrap(),
//!     "SELECT * FROM `Student` WHERE `gender` = \"F\" ORDER BY `id` ASC"
//! );
//! ```
//!
//! ## Validation
//!
//! [`Query::validate`] runs the structural checks and then walks the tree
//! with a [`Scope`]: every FROM item registers its name, and every qualified
//! column reference in the projection, WHERE, GROUP BY, HAVING and ORDER BY
//! must resolve to one of them (or to an outer query's table, for correlated
//! sub-queries).
//!
//! ```sql
//! SELECT `c`.`name` FROM `Student` `s` LEFT JOIN `Class` `c`
//!   ON (`c`.`studentId` = `s`.`id`) ORDER BY `c`.`year` DESC LIMIT 1
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IrError, IrResult};
use crate::expr::{Expr, GroupExpr};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::registry::NodeRegistry;
use crate::render::{Ident, List};
use crate::scope::Scope;
use crate::table::FromTable;

/// A SELECT query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub distinct: bool,
    pub select: Vec<ResultColumn>,
    pub from: Vec<FromTable>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<GroupBy>,
    pub order: Vec<OrderBy>,
    pub limit: Option<Limit>,
}

impl Query {
    pub const CLASSNAME: &'static str = "Query";

    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Structural check followed by scope validation from a fresh root scope
    pub fn validate(&self) -> IrResult<()> {
        self.check()?;
        self.validate_in(&mut Scope::new())
    }

    /// Scope validation: FROM items register their names in `scope`, then
    /// every other clause is resolved against it
    pub fn validate_in(&self, scope: &mut Scope) -> IrResult<()> {
        for from in &self.from {
            from.validate(scope)?;
        }
        for column in &self.select {
            column.expression.validate(scope)?;
        }
        if let Some(condition) = &self.where_clause {
            condition.validate(scope)?;
        }
        if let Some(group_by) = &self.group_by {
            for expression in &group_by.expressions {
                expression.validate(scope)?;
            }
            if let Some(having) = &group_by.having {
                having.validate(scope)?;
            }
        }
        for term in &self.order {
            term.expression.validate(scope)?;
        }
        Ok(())
    }

    /// Tables this query reads, including through sub-queries
    pub(crate) fn collect_reads(&self, reads: &mut BTreeSet<String>) {
        for from in &self.from {
            from.collect_reads(reads);
        }
        let projection = self.select.iter().map(|c| &c.expression);
        let group = self
            .group_by
            .iter()
            .flat_map(|g| g.expressions.iter().chain(g.having.iter()));
        let order = self.order.iter().map(|o| &o.expression);
        for expression in projection
            .chain(self.where_clause.iter())
            .chain(group)
            .chain(order)
        {
            expression.collect_reads(reads);
        }
    }
}

impl SqlNode for Query {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.select.is_empty() && self.from.is_empty() {
            return Err(IrError::Incomplete {
                node: Self::CLASSNAME,
                message: "a query needs result columns or a FROM clause".to_string(),
            });
        }
        self.select.iter().try_for_each(SqlNode::check)?;
        self.from.iter().try_for_each(SqlNode::check)?;
        if let Some(condition) = &self.where_clause {
            condition.check_slot(Self::CLASSNAME, "WHERE")?;
        }
        if let Some(group_by) = &self.group_by {
            group_by.check()?;
        }
        self.order.iter().try_for_each(SqlNode::check)?;
        Ok(())
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .flag("distinct", self.distinct)
            .list("select", self.select.iter().map(SqlNode::json_value).collect())
            .list("from", self.from.iter().map(SqlNode::json_value).collect())
            .opt("where", self.where_clause.as_ref().map(SqlNode::json_value))
            .opt("groupBy", self.group_by.as_ref().map(SqlNode::json_value))
            .list("order", self.order.iter().map(SqlNode::json_value).collect())
            .opt("limit", self.limit.as_ref().map(SqlNode::json_value))
            .finish()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if self.select.is_empty() {
            write!(f, "*")?;
        } else {
            write!(f, "{}", List(&self.select, ", "))?;
        }
        if !self.from.is_empty() {
            write!(f, " FROM {}", List(&self.from, ", "))?;
        }
        if let Some(condition) = &self.where_clause {
            write!(f, " WHERE {}", condition)?;
        }
        if let Some(group_by) = &self.group_by {
            write!(f, " {}", group_by)?;
        }
        if !self.order.is_empty() {
            write!(f, " ORDER BY {}", List(&self.order, ", "))?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " {}", limit)?;
        }
        Ok(())
    }
}

/// Builder for [`Query`]
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.query.distinct = distinct;
        self
    }

    pub fn select(&mut self, expression: impl Into<Expr>) -> &mut Self {
        self.query.select.push(ResultColumn::new(expression));
        self
    }

    pub fn select_as(&mut self, expression: impl Into<Expr>, alias: impl Into<String>) -> &mut Self {
        self.query
            .select
            .push(ResultColumn::new(expression).with_alias(alias));
        self
    }

    /// Add a comma separated FROM item
    pub fn from(&mut self, table: impl Into<FromTable>) -> &mut Self {
        self.query.from.push(table.into());
        self
    }

    /// Add a condition; repeated calls are combined into one flat `AND` group
    pub fn where_clause(&mut self, condition: impl Into<Expr>) -> &mut Self {
        let existing = self.query.where_clause.take();
        self.query.where_clause = Some(GroupExpr::conjoin(existing, condition.into()));
        self
    }

    pub fn group_by(&mut self, expressions: impl IntoIterator<Item = Expr>) -> &mut Self {
        let group_by = self.query.group_by.get_or_insert_with(GroupBy::default);
        group_by.expressions.extend(expressions);
        self
    }

    /// HAVING condition; needs a GROUP BY clause first
    pub fn having(&mut self, condition: impl Into<Expr>) -> IrResult<&mut Self> {
        let group_by = self.query.group_by.as_mut().ok_or(IrError::MissingField {
            node: Query::CLASSNAME,
            field: "groupBy",
        })?;
        let existing = group_by.having.take();
        group_by.having = Some(GroupExpr::conjoin(existing, condition.into()));
        Ok(self)
    }

    pub fn order_by(&mut self, expression: impl Into<Expr>, direction: SortDirection) -> &mut Self {
        self.query.order.push(OrderBy::new(expression, direction));
        self
    }

    pub fn limit(&mut self, limit: u64, offset: Option<u64>) -> &mut Self {
        self.query.limit = Some(Limit { limit, offset });
        self
    }

    pub fn build(&self) -> Query {
        self.query.clone()
    }
}

/// One projected expression: `` expr [AS `alias`] ``
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    pub expression: Expr,
    pub alias: Option<String>,
}

impl ResultColumn {
    pub const CLASSNAME: &'static str = "ResultColumn";

    pub fn new(expression: impl Into<Expr>) -> Self {
        Self {
            expression: expression.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl SqlNode for ResultColumn {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        self.expression.check_slot(Self::CLASSNAME, "result")
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("expression", self.expression.json_value())
            .opt("$as", self.alias.clone())
            .finish()
    }
}

impl fmt::Display for ResultColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", Ident(alias))?;
        }
        Ok(())
    }
}

impl From<Expr> for ResultColumn {
    fn from(expression: Expr) -> Self {
        ResultColumn::new(expression)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn parse(direction: &str) -> IrResult<Self> {
        match direction.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(IrError::UnsupportedOperator {
                node: OrderBy::CLASSNAME,
                operator: direction.to_string(),
            }),
        }
    }
}

/// ORDER BY term: `expr ASC|DESC`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expression: Expr,
    pub direction: SortDirection,
}

impl OrderBy {
    pub const CLASSNAME: &'static str = "OrderBy";

    pub fn new(expression: impl Into<Expr>, direction: SortDirection) -> Self {
        Self {
            expression: expression.into(),
            direction,
        }
    }
}

impl SqlNode for OrderBy {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        self.expression.check_slot(Self::CLASSNAME, "ORDER BY")
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("expression", self.expression.json_value())
            .set("order", self.direction.as_str())
            .finish()
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expression, self.direction.as_str())
    }
}

/// `GROUP BY a, b [HAVING cond]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupBy {
    pub expressions: Vec<Expr>,
    pub having: Option<Expr>,
}

impl GroupBy {
    pub const CLASSNAME: &'static str = "GroupBy";

    pub fn new(expressions: impl IntoIterator<Item = Expr>) -> Self {
        Self {
            expressions: expressions.into_iter().collect(),
            having: None,
        }
    }

    pub fn with_having(mut self, having: impl Into<Expr>) -> Self {
        self.having = Some(having.into());
        self
    }
}

impl SqlNode for GroupBy {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.expressions.is_empty() {
            return Err(IrError::Incomplete {
                node: Self::CLASSNAME,
                message: "at least one grouping expression is required".to_string(),
            });
        }
        self.expressions
            .iter()
            .try_for_each(|e| e.check_slot(Self::CLASSNAME, "GROUP BY"))?;
        match &self.having {
            Some(having) => having.check_slot(Self::CLASSNAME, "HAVING"),
            None => Ok(()),
        }
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .list(
                "expressions",
                self.expressions.iter().map(SqlNode::json_value).collect(),
            )
            .opt("having", self.having.as_ref().map(SqlNode::json_value))
            .finish()
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GROUP BY {}", List(&self.expressions, ", "))?;
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        Ok(())
    }
}

/// `LIMIT n [OFFSET m]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limit {
    pub limit: u64,
    pub offset: Option<u64>,
}

impl Limit {
    pub const CLASSNAME: &'static str = "Limit";
}

impl SqlNode for Limit {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        Ok(())
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("limit", self.limit)
            .opt("offset", self.offset)
            .finish()
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LIMIT {}", self.limit)?;
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

fn revive_all<T>(
    json: &JsonReader<'_>,
    key: &str,
    convert: fn(Node) -> IrResult<T>,
) -> IrResult<Vec<T>> {
    json.list(key)?
        .iter()
        .map(|v| convert(json.registry().revive(v)?))
        .collect()
}

fn revive_opt<T>(
    json: &JsonReader<'_>,
    key: &str,
    convert: fn(Node) -> IrResult<T>,
) -> IrResult<Option<T>> {
    json.get(key)
        .map(|v| convert(json.registry().revive(v)?))
        .transpose()
}

pub(crate) fn revive_query(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(Query::CLASSNAME, map, registry);
    let query = Query {
        distinct: json.flag("distinct")?,
        select: revive_all(&json, "select", Node::into_result_column)?,
        from: revive_all(&json, "from", Node::into_from_table)?,
        where_clause: json.opt_expr("where")?,
        group_by: revive_opt(&json, "groupBy", Node::into_group_by)?,
        order: revive_all(&json, "order", Node::into_order_by)?,
        limit: revive_opt(&json, "limit", Node::into_limit)?,
    };
    Ok(Node::Statement(query.into()))
}

pub(crate) fn revive_result_column(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(ResultColumn::CLASSNAME, map, registry);
    Ok(Node::ResultColumn(ResultColumn {
        expression: json.expr_or_unknown("expression")?,
        alias: json.opt_str("$as")?.map(str::to_string),
    }))
}

pub(crate) fn revive_order_by(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(OrderBy::CLASSNAME, map, registry);
    let direction = match json.opt_str("order")? {
        Some(direction) => SortDirection::parse(direction)?,
        None => SortDirection::default(),
    };
    Ok(Node::OrderBy(OrderBy::new(
        json.expr_or_unknown("expression")?,
        direction,
    )))
}

pub(crate) fn revive_group_by(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(GroupBy::CLASSNAME, map, registry);
    Ok(Node::GroupBy(GroupBy {
        expressions: json.exprs("expressions")?,
        having: json.opt_expr("having")?,
    }))
}

pub(crate) fn revive_limit(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(Limit::CLASSNAME, map, registry);
    let limit = json.opt_u64("limit")?.ok_or(IrError::MissingField {
        node: Limit::CLASSNAME,
        field: "limit",
    })?;
    Ok(Node::Limit(Limit {
        limit,
        offset: json.opt_u64("offset")?,
    }))
}
