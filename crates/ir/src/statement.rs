// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statements
//!
//! [`Statement`] is the top-level unit the engine executes: a SELECT
//! [`Query`], a data-modifying statement ([`Insert`], [`Update`],
//! [`Delete`]) or a definition statement from [`ddl`](crate::ddl).
//!
//! Besides validation and rendering, a statement reports the tables it
//! touches through [`Statement::table_access`], which the lock manager uses
//! to decide which table locks to take.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value, json};

use crate::ddl::{CreateSchema, CreateTable, DropSchema, DropTable};
use crate::error::{IrError, IrResult};
use crate::expr::{Expr, GroupExpr};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode, require_name};
use crate::query::Query;
use crate::registry::NodeRegistry;
use crate::render::{Ident, List, Qualified};
use crate::scope::Scope;
use crate::table::qualified_name;

/// Tables a statement reads and writes, by table name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableAccess {
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
}

impl TableAccess {
    fn write(name: String) -> Self {
        Self {
            reads: BTreeSet::new(),
            writes: BTreeSet::from([name]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }
}

/// Any executable statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(Box<Query>),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    CreateTable(CreateTable),
    CreateSchema(CreateSchema),
    DropTable(DropTable),
    DropSchema(DropSchema),
}

macro_rules! each_statement {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Statement::Query($inner) => $body,
            Statement::Insert($inner) => $body,
            Statement::Update($inner) => $body,
            Statement::Delete($inner) => $body,
            Statement::CreateTable($inner) => $body,
            Statement::CreateSchema($inner) => $body,
            Statement::DropTable($inner) => $body,
            Statement::DropSchema($inner) => $body,
        }
    };
}

impl Statement {
    /// Revive a statement from a JSON document using the global registry
    pub fn from_json_str(json: &str) -> IrResult<Statement> {
        NodeRegistry::global().revive_str(json)?.into_statement()
    }

    /// Canonical JSON document of this statement
    pub fn to_json_string(&self) -> IrResult<String> {
        let json = self.to_json()?;
        serde_json::to_string(&json).map_err(|e| IrError::invalid_json(self.classname(), e.to_string()))
    }

    /// Structural check followed by scope validation
    pub fn validate(&self) -> IrResult<()> {
        self.check()?;
        match self {
            Statement::Query(q) => q.validate_in(&mut Scope::new()),
            Statement::Insert(i) => i.validate_scope(),
            Statement::Update(u) => u.validate_scope(),
            Statement::Delete(d) => d.validate_scope(),
            Statement::CreateTable(t) => match &t.query {
                Some(q) => q.validate_in(&mut Scope::new()),
                None => Ok(()),
            },
            Statement::CreateSchema(_) | Statement::DropTable(_) | Statement::DropSchema(_) => {
                Ok(())
            }
        }
    }

    /// Tables read and written; a sub-query contributes reads
    pub fn table_access(&self) -> TableAccess {
        match self {
            Statement::Query(q) => {
                let mut access = TableAccess::default();
                q.collect_reads(&mut access.reads);
                access
            }
            Statement::Insert(i) => {
                let mut access = TableAccess::write(i.table_name());
                match &i.source {
                    InsertSource::Values(rows) => rows
                        .iter()
                        .flatten()
                        .for_each(|e| e.collect_reads(&mut access.reads)),
                    InsertSource::Query(q) => q.collect_reads(&mut access.reads),
                }
                access
            }
            Statement::Update(u) => {
                let mut access = TableAccess::write(u.table_name());
                let values = u.set.iter().map(|(_, e)| e);
                for expression in values.chain(u.where_clause.iter()) {
                    expression.collect_reads(&mut access.reads);
                }
                access
            }
            Statement::Delete(d) => {
                let mut access = TableAccess::write(d.table_name());
                if let Some(condition) = &d.where_clause {
                    condition.collect_reads(&mut access.reads);
                }
                access
            }
            Statement::CreateTable(t) => {
                let mut access = TableAccess::write(t.table_name());
                if let Some(q) = &t.query {
                    q.collect_reads(&mut access.reads);
                }
                access
            }
            Statement::DropTable(t) => TableAccess::write(t.table_name()),
            Statement::CreateSchema(_) | Statement::DropSchema(_) => TableAccess::default(),
        }
    }
}

impl SqlNode for Statement {
    fn classname(&self) -> &'static str {
        each_statement!(self, s => s.classname())
    }

    fn check(&self) -> IrResult<()> {
        each_statement!(self, s => s.check())
    }

    fn json_value(&self) -> Value {
        each_statement!(self, s => s.json_value())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        each_statement!(self, s => write!(f, "{}", s))
    }
}

impl From<Query> for Statement {
    fn from(q: Query) -> Self {
        Statement::Query(Box::new(q))
    }
}

macro_rules! impl_from_statement {
    ($($ty:ident),* $(,)?) => {
        $(impl From<$ty> for Statement {
            fn from(s: $ty) -> Self {
                Statement::$ty(s)
            }
        })*
    };
}

impl_from_statement!(Insert, Update, Delete, CreateTable, CreateSchema, DropTable, DropSchema);

/// Scope holding only the statement's target table
fn target_scope(name: &str) -> IrResult<Scope> {
    let mut scope = Scope::new();
    scope.register(name)?;
    Ok(scope)
}

/// Rows supplied to an INSERT
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Query(Box<Query>),
}

impl Default for InsertSource {
    fn default() -> Self {
        InsertSource::Values(Vec::new())
    }
}

/// `INSERT INTO t [(columns)] VALUES (...), (...)` or `INSERT INTO t [(columns)] SELECT ...`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Insert {
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
}

impl Insert {
    pub const CLASSNAME: &'static str = "Insert";

    pub fn builder(name: impl Into<String>) -> InsertBuilder {
        InsertBuilder {
            insert: Insert {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn table_name(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }

    /// Arity every row (or the query projection) must have, if known
    fn expected_arity(&self) -> Option<usize> {
        if !self.columns.is_empty() {
            return Some(self.columns.len());
        }
        match &self.source {
            InsertSource::Values(rows) => rows.first().map(Vec::len),
            InsertSource::Query(_) => None,
        }
    }

    fn check_arity(&self) -> IrResult<()> {
        let Some(expected) = self.expected_arity() else {
            return Ok(());
        };
        match &self.source {
            InsertSource::Values(rows) => {
                if let Some(row) = rows.iter().find(|r| r.len() != expected) {
                    return Err(IrError::ArityMismatch {
                        expected,
                        found: row.len(),
                    });
                }
            }
            InsertSource::Query(q) if !q.select.is_empty() && q.select.len() != expected => {
                return Err(IrError::ArityMismatch {
                    expected,
                    found: q.select.len(),
                });
            }
            InsertSource::Query(_) => {}
        }
        Ok(())
    }

    fn validate_scope(&self) -> IrResult<()> {
        match &self.source {
            InsertSource::Values(rows) => {
                let scope = target_scope(&self.name)?;
                rows.iter().flatten().try_for_each(|e| e.validate(&scope))
            }
            InsertSource::Query(q) => q.validate_in(&mut Scope::new()),
        }
    }
}

impl SqlNode for Insert {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        require_name(Self::CLASSNAME, &self.name)?;
        match &self.source {
            InsertSource::Values(rows) => {
                if rows.is_empty() {
                    return Err(IrError::Incomplete {
                        node: Self::CLASSNAME,
                        message: "no values to insert".to_string(),
                    });
                }
                rows.iter()
                    .flatten()
                    .try_for_each(|e| e.check_slot(Self::CLASSNAME, "value"))?;
            }
            InsertSource::Query(q) => q.check()?,
        }
        self.check_arity()
    }

    fn json_value(&self) -> Value {
        let writer = JsonWriter::new(Self::CLASSNAME)
            .opt("schema", self.schema.clone())
            .set("name", self.name.clone())
            .list(
                "columns",
                self.columns.iter().cloned().map(Value::String).collect(),
            );
        match &self.source {
            InsertSource::Values(rows) => writer.list(
                "values",
                rows.iter()
                    .map(|row| Value::Array(row.iter().map(SqlNode::json_value).collect()))
                    .collect(),
            ),
            InsertSource::Query(q) => writer.set("query", q.json_value()),
        }
        .finish()
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "INSERT INTO {}",
            Qualified(self.schema.as_deref(), &self.name)
        )?;
        if !self.columns.is_empty() {
            let columns: Vec<Ident<'_>> = self.columns.iter().map(|c| Ident(c)).collect();
            write!(f, " ({})", List(&columns, ", "))?;
        }
        match &self.source {
            InsertSource::Values(rows) => {
                write!(f, " VALUES ")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({})", List(row, ", "))?;
                }
                Ok(())
            }
            InsertSource::Query(q) => write!(f, " {}", q),
        }
    }
}

/// Builder for [`Insert`]; every setter keeps the column/row arities consistent
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    insert: Insert,
}

impl InsertBuilder {
    pub fn schema(&mut self, schema: impl Into<String>) -> &mut Self {
        self.insert.schema = Some(schema.into());
        self
    }

    pub fn columns(
        &mut self,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> IrResult<&mut Self> {
        let mut candidate = self.insert.clone();
        candidate.columns = columns.into_iter().map(Into::into).collect();
        candidate.check_arity()?;
        self.insert = candidate;
        Ok(self)
    }

    /// Append one row of values; replaces a previously set query source
    pub fn values(&mut self, row: impl IntoIterator<Item = Expr>) -> IrResult<&mut Self> {
        let row: Vec<Expr> = row.into_iter().collect();
        if let Some(expected) = self.insert.expected_arity() {
            if row.len() != expected {
                return Err(IrError::ArityMismatch {
                    expected,
                    found: row.len(),
                });
            }
        }
        match &mut self.insert.source {
            InsertSource::Values(rows) => rows.push(row),
            source @ InsertSource::Query(_) => *source = InsertSource::Values(vec![row]),
        }
        Ok(self)
    }

    /// `INSERT INTO ... SELECT`; replaces any rows added so far
    pub fn query(&mut self, query: Query) -> IrResult<&mut Self> {
        let mut candidate = self.insert.clone();
        candidate.source = InsertSource::Query(Box::new(query));
        candidate.check_arity()?;
        self.insert = candidate;
        Ok(self)
    }

    pub fn build(&self) -> Insert {
        self.insert.clone()
    }
}

/// `UPDATE t SET a = e, ... [WHERE cond]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    pub schema: Option<String>,
    pub name: String,
    pub set: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

impl Update {
    pub const CLASSNAME: &'static str = "Update";

    pub fn builder(name: impl Into<String>) -> UpdateBuilder {
        UpdateBuilder {
            update: Update {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn table_name(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }

    fn validate_scope(&self) -> IrResult<()> {
        let scope = target_scope(&self.name)?;
        for (_, value) in &self.set {
            value.validate(&scope)?;
        }
        match &self.where_clause {
            Some(condition) => condition.validate(&scope),
            None => Ok(()),
        }
    }
}

impl SqlNode for Update {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        require_name(Self::CLASSNAME, &self.name)?;
        if self.set.is_empty() {
            return Err(IrError::Incomplete {
                node: Self::CLASSNAME,
                message: "at least one assignment is required".to_string(),
            });
        }
        for (column, value) in &self.set {
            if column.is_empty() {
                return Err(IrError::MissingField {
                    node: Self::CLASSNAME,
                    field: "column",
                });
            }
            value.check_slot(Self::CLASSNAME, "SET")?;
        }
        match &self.where_clause {
            Some(condition) => condition.check_slot(Self::CLASSNAME, "WHERE"),
            None => Ok(()),
        }
    }

    fn json_value(&self) -> Value {
        let set = self
            .set
            .iter()
            .map(|(column, value)| json!({ "column": column, "value": value.json_value() }))
            .collect();
        JsonWriter::new(Self::CLASSNAME)
            .opt("schema", self.schema.clone())
            .set("name", self.name.clone())
            .list("set", set)
            .opt("where", self.where_clause.as_ref().map(SqlNode::json_value))
            .finish()
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UPDATE {} SET ",
            Qualified(self.schema.as_deref(), &self.name)
        )?;
        for (i, (column, value)) in self.set.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", Ident(column), value)?;
        }
        if let Some(condition) = &self.where_clause {
            write!(f, " WHERE {}", condition)?;
        }
        Ok(())
    }
}

/// Builder for [`Update`]
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    update: Update,
}

impl UpdateBuilder {
    pub fn schema(&mut self, schema: impl Into<String>) -> &mut Self {
        self.update.schema = Some(schema.into());
        self
    }

    /// Assign `value` to `column`; a repeated column replaces the earlier value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Expr>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.update.set.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = value,
            None => self.update.set.push((column, value)),
        }
        self
    }

    pub fn where_clause(&mut self, condition: impl Into<Expr>) -> &mut Self {
        let existing = self.update.where_clause.take();
        self.update.where_clause = Some(GroupExpr::conjoin(existing, condition.into()));
        self
    }

    pub fn build(&self) -> Update {
        self.update.clone()
    }
}

/// `DELETE FROM t [WHERE cond]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Delete {
    pub database: Option<String>,
    pub name: String,
    pub where_clause: Option<Expr>,
}

impl Delete {
    pub const CLASSNAME: &'static str = "Delete";

    pub fn builder(name: impl Into<String>) -> DeleteBuilder {
        DeleteBuilder {
            delete: Delete {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn table_name(&self) -> String {
        qualified_name(self.database.as_deref(), &self.name)
    }

    fn validate_scope(&self) -> IrResult<()> {
        let scope = target_scope(&self.name)?;
        match &self.where_clause {
            Some(condition) => condition.validate(&scope),
            None => Ok(()),
        }
    }
}

impl SqlNode for Delete {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        require_name(Self::CLASSNAME, &self.name)?;
        match &self.where_clause {
            Some(condition) => condition.check_slot(Self::CLASSNAME, "WHERE"),
            None => Ok(()),
        }
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .opt("database", self.database.clone())
            .set("name", self.name.clone())
            .opt("where", self.where_clause.as_ref().map(SqlNode::json_value))
            .finish()
    }
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DELETE FROM {}",
            Qualified(self.database.as_deref(), &self.name)
        )?;
        if let Some(condition) = &self.where_clause {
            write!(f, " WHERE {}", condition)?;
        }
        Ok(())
    }
}

/// Builder for [`Delete`]
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    delete: Delete,
}

impl DeleteBuilder {
    pub fn database(&mut self, database: impl Into<String>) -> &mut Self {
        self.delete.database = Some(database.into());
        self
    }

    /// Add a condition; repeated calls extend one flat `AND` group
    pub fn where_clause(&mut self, condition: impl Into<Expr>) -> &mut Self {
        let existing = self.delete.where_clause.take();
        self.delete.where_clause = Some(GroupExpr::conjoin(existing, condition.into()));
        self
    }

    pub fn build(&self) -> Delete {
        self.delete.clone()
    }
}

pub(crate) fn revive_insert(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(Insert::CLASSNAME, map, registry);
    let source = match json.get("query") {
        Some(query) => InsertSource::Query(Box::new(registry.revive_query(query)?)),
        None => InsertSource::Values(
            json.list("values")?
                .iter()
                .map(|row| match row {
                    Value::Array(values) => values
                        .iter()
                        .map(|v| registry.revive_expr(v))
                        .collect::<IrResult<Vec<Expr>>>(),
                    other => Err(IrError::invalid_json(
                        Insert::CLASSNAME,
                        format!("each row must be an array, found {}", other),
                    )),
                })
                .collect::<IrResult<Vec<Vec<Expr>>>>()?,
        ),
    };
    let insert = Insert {
        schema: json.opt_str("schema")?.map(str::to_string),
        name: json.str("name")?.to_string(),
        columns: json.strings("columns")?,
        source,
    };
    insert.check_arity()?;
    Ok(Node::Statement(insert.into()))
}

pub(crate) fn revive_update(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(Update::CLASSNAME, map, registry);
    let set = json
        .list("set")?
        .iter()
        .map(|assignment| -> IrResult<(String, Expr)> {
            let assignment = assignment.as_object().ok_or_else(|| {
                IrError::invalid_json(Update::CLASSNAME, "each assignment must be an object")
            })?;
            let assignment = JsonReader::new(Update::CLASSNAME, assignment, registry);
            Ok((
                assignment.str("column")?.to_string(),
                assignment.expr_or_unknown("value")?,
            ))
        })
        .collect::<IrResult<Vec<_>>>()?;
    let update = Update {
        schema: json.opt_str("schema")?.map(str::to_string),
        name: json.str("name")?.to_string(),
        set,
        where_clause: json.opt_expr("where")?,
    };
    Ok(Node::Statement(update.into()))
}

pub(crate) fn revive_delete(map: &Map<String, Value>, registry: &NodeRegistry) -> IrResult<Node> {
    let json = JsonReader::new(Delete::CLASSNAME, map, registry);
    let delete = Delete {
        database: json.opt_str("database")?.map(str::to_string),
        name: json.str("name")?.to_string(),
        where_clause: json.opt_expr("where")?,
    };
    Ok(Node::Statement(delete.into()))
}
