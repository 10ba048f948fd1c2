// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Table References
//!
//! Data sources that can appear in a FROM clause:
//!
//! - [`SchemaTable`]: a named table, optionally schema-qualified and
//!   optionally wrapped in a table-valued function
//! - [`QueryTable`]: a derived table (sub-query with an alias)
//! - [`RemoteTable`]: rows fetched from a remote endpoint
//!
//! A [`FromTable`] pairs one base table with an ordered list of
//! [`JoinClause`]s.
//!
//! ```sql
//! FROM `Student` `s` LEFT JOIN `Class` `c` ON (`s`.`class_id` = `c`.`id`)
//! ```
//!
//! During validation every table registers its alias (or its table name when
//! it has none) in the current [`Scope`]; two tables with the same name in
//! one FROM clause are rejected.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ddl::ColumnDef;
use crate::error::{IrError, IrResult};
use crate::expr::{Expr, GroupExpr};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode};
use crate::query::Query;
use crate::registry::NodeRegistry;
use crate::render::{Ident, Qualified};
use crate::scope::Scope;

/// Key under which table aliases are serialized
const ALIAS: &str = "$as";

/// Name a table is locked and tracked under
pub(crate) fn qualified_name(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", schema, name),
        None => name.to_string(),
    }
}

fn require_alias(node: &'static str, alias: &str) -> IrResult<()> {
    if alias.is_empty() {
        return Err(IrError::MissingAlias(node));
    }
    Ok(())
}

/// `` [function(]`schema`.`table`[)] [`alias`] ``
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTable {
    pub schema: Option<String>,
    pub table: String,
    pub function: Option<String>,
    pub alias: Option<String>,
}

impl SchemaTable {
    pub const CLASSNAME: &'static str = "SchemaTable";

    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            function: None,
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Wrap the table in a table-valued function; such a table needs an alias
    pub fn with_function(mut self, function: impl Into<String>, alias: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self.alias = Some(alias.into());
        self
    }
}

impl SqlNode for SchemaTable {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.table.is_empty() {
            return Err(IrError::MissingField {
                node: Self::CLASSNAME,
                field: "table",
            });
        }
        if self.function.is_some() && self.alias.as_deref().is_none_or(str::is_empty) {
            return Err(IrError::MissingAlias(Self::CLASSNAME));
        }
        Ok(())
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .opt("function", self.function.clone())
            .opt("schema", self.schema.clone())
            .set("table", self.table.clone())
            .opt(ALIAS, self.alias.clone())
            .finish()
    }
}

impl fmt::Display for SchemaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = Qualified(self.schema.as_deref(), &self.table);
        match &self.function {
            Some(function) => write!(f, "{}({})", function, table)?,
            None => write!(f, "{}", table)?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " {}", Ident(alias))?;
        }
        Ok(())
    }
}

/// Derived table: `` (SELECT ...) `alias` ``
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTable {
    pub query: Box<Query>,
    pub alias: String,
}

impl QueryTable {
    pub const CLASSNAME: &'static str = "QueryTable";

    pub fn new(query: Query, alias: impl Into<String>) -> Self {
        Self {
            query: Box::new(query),
            alias: alias.into(),
        }
    }
}

impl SqlNode for QueryTable {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        require_alias(Self::CLASSNAME, &self.alias)?;
        self.query.check()
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("query", self.query.json_value())
            .set(ALIAS, self.alias.clone())
            .finish()
    }
}

impl fmt::Display for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.query, Ident(&self.alias))
    }
}

/// Rows fetched from a remote endpoint: `` FETCH({...}) `alias` ``
///
/// `columns` describe the shape the remote call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTable {
    pub request_config: Value,
    pub columns: Vec<ColumnDef>,
    pub alias: String,
}

impl RemoteTable {
    pub const CLASSNAME: &'static str = "RemoteTable";

    pub fn new(request_config: Value, columns: Vec<ColumnDef>, alias: impl Into<String>) -> Self {
        Self {
            request_config,
            columns,
            alias: alias.into(),
        }
    }
}

impl SqlNode for RemoteTable {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.request_config.is_null() {
            return Err(IrError::MissingField {
                node: Self::CLASSNAME,
                field: "requestConfig",
            });
        }
        require_alias(Self::CLASSNAME, &self.alias)?;
        self.columns.iter().try_for_each(SqlNode::check)
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("requestConfig", self.request_config.clone())
            .list(
                "columns",
                self.columns.iter().map(SqlNode::json_value).collect(),
            )
            .set(ALIAS, self.alias.clone())
            .finish()
    }
}

impl fmt::Display for RemoteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FETCH({}) {}", self.request_config, Ident(&self.alias))
    }
}

/// Any table-like data source
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    Schema(SchemaTable),
    Query(QueryTable),
    Remote(RemoteTable),
}

impl Table {
    /// Name registered in the scope: the alias if set, else the table name
    pub fn name(&self) -> &str {
        match self {
            Table::Schema(t) => t.alias.as_deref().unwrap_or(&t.table),
            Table::Query(t) => &t.alias,
            Table::Remote(t) => &t.alias,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Table::Schema(t) => t.alias.as_deref(),
            Table::Query(t) => Some(&t.alias),
            Table::Remote(t) => Some(&t.alias),
        }
    }

    /// Check nested queries and register this table's name in `scope`
    pub fn validate(&self, scope: &mut Scope) -> IrResult<()> {
        if let Table::Query(t) = self {
            t.query.validate_in(&mut Scope::new())?;
        }
        scope.register(self.name())
    }

    pub(crate) fn collect_reads(&self, reads: &mut BTreeSet<String>) {
        match self {
            Table::Schema(t) => {
                reads.insert(qualified_name(t.schema.as_deref(), &t.table));
            }
            Table::Query(t) => t.query.collect_reads(reads),
            Table::Remote(_) => {}
        }
    }
}

impl SqlNode for Table {
    fn classname(&self) -> &'static str {
        match self {
            Table::Schema(t) => t.classname(),
            Table::Query(t) => t.classname(),
            Table::Remote(t) => t.classname(),
        }
    }

    fn check(&self) -> IrResult<()> {
        match self {
            Table::Schema(t) => t.check(),
            Table::Query(t) => t.check(),
            Table::Remote(t) => t.check(),
        }
    }

    fn json_value(&self) -> Value {
        match self {
            Table::Schema(t) => t.json_value(),
            Table::Query(t) => t.json_value(),
            Table::Remote(t) => t.json_value(),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Schema(t) => fmt::Display::fmt(t, f),
            Table::Query(t) => fmt::Display::fmt(t, f),
            Table::Remote(t) => fmt::Display::fmt(t, f),
        }
    }
}

impl From<SchemaTable> for Table {
    fn from(t: SchemaTable) -> Self {
        Table::Schema(t)
    }
}

impl From<QueryTable> for Table {
    fn from(t: QueryTable) -> Self {
        Table::Query(t)
    }
}

impl From<RemoteTable> for Table {
    fn from(t: RemoteTable) -> Self {
        Table::Remote(t)
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        Table::Schema(SchemaTable::new(name))
    }
}

/// Join type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinOperator {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinOperator::Inner => "INNER",
            JoinOperator::Left => "LEFT",
            JoinOperator::Right => "RIGHT",
            JoinOperator::Full => "FULL",
            JoinOperator::Cross => "CROSS",
        }
    }

    pub fn parse(operator: &str) -> IrResult<Self> {
        match operator.to_ascii_uppercase().as_str() {
            "INNER" => Ok(JoinOperator::Inner),
            "LEFT" => Ok(JoinOperator::Left),
            "RIGHT" => Ok(JoinOperator::Right),
            "FULL" => Ok(JoinOperator::Full),
            "CROSS" => Ok(JoinOperator::Cross),
            _ => Err(IrError::UnsupportedOperator {
                node: JoinClause::CLASSNAME,
                operator: operator.to_string(),
            }),
        }
    }
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn check_join(operator: JoinOperator, has_condition: bool) -> IrResult<()> {
    match (operator, has_condition) {
        (JoinOperator::Cross, true) => Err(IrError::InvalidJoin {
            operator: operator.to_string(),
            message: "CROSS JOIN cannot have an ON condition".to_string(),
        }),
        (JoinOperator::Cross, false) | (_, true) => Ok(()),
        (_, false) => Err(IrError::InvalidJoin {
            operator: operator.to_string(),
            message: "ON condition is required".to_string(),
        }),
    }
}

/// `<operator> JOIN <table> [ON (<condition>)]`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub operator: JoinOperator,
    pub table: Table,
    pub on: Option<Expr>,
}

impl JoinClause {
    pub const CLASSNAME: &'static str = "JoinClause";

    /// Several conditions are combined into a single `AND` group
    pub fn new(
        operator: JoinOperator,
        table: impl Into<Table>,
        conditions: impl IntoIterator<Item = Expr>,
    ) -> IrResult<Self> {
        let mut conditions: Vec<Expr> = conditions.into_iter().collect();
        check_join(operator, !conditions.is_empty())?;
        let on = match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Expr::Group(GroupExpr::and(conditions))),
        };
        Ok(Self {
            operator,
            table: table.into(),
            on,
        })
    }

    pub fn cross(table: impl Into<Table>) -> Self {
        Self {
            operator: JoinOperator::Cross,
            table: table.into(),
            on: None,
        }
    }
}

impl SqlNode for JoinClause {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        check_join(self.operator, self.on.is_some())?;
        self.table.check()?;
        match &self.on {
            Some(on) => on.check_slot(Self::CLASSNAME, "ON"),
            None => Ok(()),
        }
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("operator", self.operator.as_str())
            .set("table", self.table.json_value())
            .opt("$on", self.on.as_ref().map(SqlNode::json_value))
            .finish()
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} JOIN {}", self.operator, self.table)?;
        match &self.on {
            Some(on @ Expr::Group(_)) => write!(f, " ON {}", on),
            Some(on) => write!(f, " ON ({})", on),
            None => Ok(()),
        }
    }
}

/// One FROM item: a base table followed by its joins
#[derive(Debug, Clone, PartialEq)]
pub struct FromTable {
    pub table: Table,
    pub joins: Vec<JoinClause>,
}

impl FromTable {
    pub const CLASSNAME: &'static str = "FromTable";

    pub fn new(table: impl Into<Table>) -> Self {
        Self {
            table: table.into(),
            joins: Vec::new(),
        }
    }

    pub fn join(mut self, join: JoinClause) -> Self {
        self.joins.push(join);
        self
    }

    pub fn is_joined(&self) -> bool {
        !self.joins.is_empty()
    }

    /// Register the base table and every joined table in `scope`, then check
    /// each ON condition against the names visible so far
    pub fn validate(&self, scope: &mut Scope) -> IrResult<()> {
        self.table.validate(scope)?;
        for join in &self.joins {
            join.table.validate(scope)?;
            if let Some(on) = &join.on {
                on.validate(scope)?;
            }
        }
        Ok(())
    }

    pub(crate) fn collect_reads(&self, reads: &mut BTreeSet<String>) {
        self.table.collect_reads(reads);
        for join in &self.joins {
            join.table.collect_reads(reads);
            if let Some(on) = &join.on {
                on.collect_reads(reads);
            }
        }
    }
}

impl SqlNode for FromTable {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        self.table.check()?;
        self.joins.iter().try_for_each(SqlNode::check)
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("table", self.table.json_value())
            .list(
                "joinClauses",
                self.joins.iter().map(SqlNode::json_value).collect(),
            )
            .finish()
    }
}

impl fmt::Display for FromTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        Ok(())
    }
}

impl From<Table> for FromTable {
    fn from(table: Table) -> Self {
        FromTable::new(table)
    }
}

impl From<SchemaTable> for FromTable {
    fn from(table: SchemaTable) -> Self {
        FromTable::new(table)
    }
}

impl From<&str> for FromTable {
    fn from(name: &str) -> Self {
        FromTable::new(name)
    }
}

pub(crate) fn revive_schema_table(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(SchemaTable::CLASSNAME, map, registry);
    let table = SchemaTable {
        schema: json.opt_str("schema")?.map(str::to_string),
        table: json.str("table")?.to_string(),
        function: json.opt_str("function")?.map(str::to_string),
        alias: json.opt_str(ALIAS)?.map(str::to_string),
    };
    table.check()?;
    Ok(Node::Table(table.into()))
}

fn alias_of(json: &JsonReader<'_>, node: &'static str) -> IrResult<String> {
    json.opt_str(ALIAS)?
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .ok_or(IrError::MissingAlias(node))
}

pub(crate) fn revive_query_table(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(QueryTable::CLASSNAME, map, registry);
    let alias = alias_of(&json, QueryTable::CLASSNAME)?;
    let query = json.get("query").ok_or(IrError::MissingField {
        node: QueryTable::CLASSNAME,
        field: "query",
    })?;
    Ok(Node::Table(
        QueryTable::new(registry.revive_query(query)?, alias).into(),
    ))
}

pub(crate) fn revive_remote_table(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(RemoteTable::CLASSNAME, map, registry);
    let alias = alias_of(&json, RemoteTable::CLASSNAME)?;
    let request_config = json
        .get("requestConfig")
        .cloned()
        .ok_or(IrError::MissingField {
            node: RemoteTable::CLASSNAME,
            field: "requestConfig",
        })?;
    let columns = json
        .list("columns")?
        .iter()
        .map(|c| registry.revive(c)?.into_column_def())
        .collect::<IrResult<Vec<_>>>()?;
    Ok(Node::Table(
        RemoteTable::new(request_config, columns, alias).into(),
    ))
}

pub(crate) fn revive_join_clause(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(JoinClause::CLASSNAME, map, registry);
    let operator = match json.opt_str("operator")? {
        Some(operator) => JoinOperator::parse(operator)?,
        None => JoinOperator::default(),
    };
    let table = json.get("table").ok_or(IrError::MissingField {
        node: JoinClause::CLASSNAME,
        field: "table",
    })?;
    let conditions = match json.get("$on") {
        None => Vec::new(),
        Some(Value::Array(_)) => json.exprs("$on")?,
        Some(on) => vec![registry.revive_expr(on)?],
    };
    Ok(Node::JoinClause(JoinClause::new(
        operator,
        registry.revive_table(table)?,
        conditions,
    )?))
}

pub(crate) fn revive_from_table(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(FromTable::CLASSNAME, map, registry);
    let table = json.get("table").ok_or(IrError::MissingField {
        node: FromTable::CLASSNAME,
        field: "table",
    })?;
    let joins = json
        .list("joinClauses")?
        .iter()
        .map(|j| registry.revive(j)?.into_join_clause())
        .collect::<IrResult<Vec<_>>>()?;
    Ok(Node::FromTable(FromTable {
        table: registry.revive_table(table)?,
        joins,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryExpr, col_of, value};
    use serde_json::json;

    fn on(left: (&str, &str), right: (&str, &str)) -> Expr {
        BinaryExpr::new("=", col_of(left.0, left.1), col_of(right.0, right.1))
            .unwrap()
            .into()
    }

    #[test]
    fn test_schema_table_rendering() {
        assert_eq!(SchemaTable::new("Student").to_string(), "`Student`");
        assert_eq!(
            SchemaTable::new("Student")
                .with_schema("school")
                .with_alias("s")
                .to_string(),
            "`school`.`Student` `s`"
        );
        assert_eq!(
            SchemaTable::new("events")
                .with_function("UNNEST", "e")
                .to_sql()
                .unwrap(),
            "UNNEST(`events`) `e`"
        );
    }

    #[test]
    fn test_function_table_requires_alias() {
        let mut table = SchemaTable::new("events").with_function("UNNEST", "e");
        table.alias = None;
        assert_eq!(
            table.check(),
            Err(IrError::MissingAlias(SchemaTable::CLASSNAME))
        );

        let json = json!({"classname": "SchemaTable", "table": "events", "function": "UNNEST"});
        assert!(NodeRegistry::global().revive(&json).is_err());
    }

    #[test]
    fn test_remote_table_rendering() {
        let table = RemoteTable::new(json!({"url": "http://x"}), Vec::new(), "r");
        assert_eq!(table.to_sql().unwrap(), "FETCH({\"url\":\"http://x\"}) `r`");
    }

    #[test]
    fn test_remote_table_requires_alias() {
        let json = json!({"classname": "RemoteTable", "requestConfig": {"url": "http://x"}});
        assert_eq!(
            NodeRegistry::global().revive(&json),
            Err(IrError::MissingAlias(RemoteTable::CLASSNAME))
        );
    }

    #[test]
    fn test_cross_join_rejects_on() {
        let err = JoinClause::new(
            JoinOperator::Cross,
            "Class",
            [on(("s", "class_id"), ("Class", "id"))],
        )
        .unwrap_err();
        assert!(matches!(err, IrError::InvalidJoin { .. }));
        assert_eq!(JoinClause::cross("Class").to_string(), "CROSS JOIN `Class`");
    }

    #[test]
    fn test_left_join_requires_on() {
        let err = JoinClause::new(JoinOperator::Left, "Class", Vec::new()).unwrap_err();
        assert!(matches!(err, IrError::InvalidJoin { .. }));
    }

    #[test]
    fn test_join_conditions_are_and_grouped() {
        let join = JoinClause::new(
            JoinOperator::Inner,
            SchemaTable::new("Class").with_alias("c"),
            [
                on(("s", "class_id"), ("c", "id")),
                BinaryExpr::new("=", col_of("c", "open"), value(true))
                    .unwrap()
                    .into(),
            ],
        )
        .unwrap();
        assert_eq!(
            join.to_sql().unwrap(),
            "INNER JOIN `Class` `c` ON (`s`.`class_id` = `c`.`id` AND `c`.`open` = true)"
        );
    }

    #[test]
    fn test_from_table_scope() {
        let from = FromTable::new(SchemaTable::new("Student").with_alias("s")).join(
            JoinClause::new(
                JoinOperator::Left,
                SchemaTable::new("Class").with_alias("c"),
                [on(("s", "class_id"), ("c", "id"))],
            )
            .unwrap(),
        );
        let mut scope = Scope::new();
        from.validate(&mut scope).unwrap();
        assert_eq!(scope.tables(), ["s".to_string(), "c".to_string()]);
        assert_eq!(
            from.to_sql().unwrap(),
            "`Student` `s` LEFT JOIN `Class` `c` ON (`s`.`class_id` = `c`.`id`)"
        );
    }

    #[test]
    fn test_duplicate_alias_in_join() {
        let from = FromTable::new(SchemaTable::new("Student").with_alias("s"))
            .join(JoinClause::cross(SchemaTable::new("Class").with_alias("s")));
        assert_eq!(
            from.validate(&mut Scope::new()),
            Err(IrError::DuplicateAlias("s".to_string()))
        );
    }

    #[test]
    fn test_on_condition_must_resolve() {
        let from = FromTable::new(SchemaTable::new("Student").with_alias("s")).join(
            JoinClause::new(
                JoinOperator::Inner,
                SchemaTable::new("Class").with_alias("c"),
                [on(("s", "class_id"), ("x", "id"))],
            )
            .unwrap(),
        );
        assert_eq!(
            from.validate(&mut Scope::new()),
            Err(IrError::UnknownTable("x".to_string()))
        );
    }

    #[test]
    fn test_revive_join_with_on_array() {
        let json = json!({
            "classname": "JoinClause",
            "operator": "LEFT",
            "table": {"classname": "SchemaTable", "table": "Class", "$as": "c"},
            "$on": [
                on(("s", "class_id"), ("c", "id")).to_json().unwrap(),
                on(("s", "year"), ("c", "year")).to_json().unwrap()
            ]
        });
        let join = NodeRegistry::global()
            .revive(&json)
            .unwrap()
            .into_join_clause()
            .unwrap();
        assert!(matches!(join.on, Some(Expr::Group(_))));
    }
}
