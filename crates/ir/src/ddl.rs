// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Definition statements
//!
//! CREATE / DROP for tables and schemas, plus the column and constraint
//! definitions they are made of.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS `Student` (
//!   `id` INTEGER PRIMARY KEY NOT NULL AUTO_INCREMENT,
//!   `name` VARCHAR(64) NOT NULL,
//!   `nickname` VARCHAR(64) DEFAULT null
//! )
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{IrError, IrResult};
use crate::json::{JsonReader, JsonWriter};
use crate::node::{Node, SqlNode, require_name};
use crate::query::Query;
use crate::registry::NodeRegistry;
use crate::render::{Ident, List, Qualified};
use crate::table::qualified_name;

/// Column definition
///
/// A primary key column is always `NOT NULL`. A nullable column carries a
/// default value, written as `DEFAULT <json>` in place of `NOT NULL`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: String,
    pub length: Option<u64>,
    pub primary_key: bool,
    pub default_value: Value,
    pub not_null: bool,
    pub auto_increment: bool,
    pub options: Vec<String>,
}

impl ColumnDef {
    pub const CLASSNAME: &'static str = "ColumnDef";

    /// Nullable column defaulting to `NULL`
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            length: None,
            primary_key: false,
            default_value: Value::Null,
            not_null: false,
            auto_increment: false,
            options: Vec::new(),
        }
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Mark as PRIMARY KEY, which also makes the column NOT NULL
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self.default_value = Value::Null;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self.default_value = Value::Null;
        self
    }

    /// Allow NULL with the given default; rejected on a PRIMARY KEY column
    pub fn nullable(mut self, default_value: impl Into<Value>) -> IrResult<Self> {
        if self.primary_key {
            return Err(IrError::NullablePrimaryKey(self.name));
        }
        self.not_null = false;
        self.default_value = default_value.into();
        Ok(self)
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Extra option written verbatim after the definition, e.g. `UNIQUE`
    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }
}

impl SqlNode for ColumnDef {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.name.is_empty() {
            return Err(IrError::MissingField {
                node: Self::CLASSNAME,
                field: "name",
            });
        }
        if self.type_name.is_empty() {
            return Err(IrError::MissingField {
                node: Self::CLASSNAME,
                field: "type",
            });
        }
        if self.primary_key && !self.not_null {
            return Err(IrError::NullablePrimaryKey(self.name.clone()));
        }
        Ok(())
    }

    fn json_value(&self) -> Value {
        let default_value = (!self.default_value.is_null()).then(|| self.default_value.clone());
        JsonWriter::new(Self::CLASSNAME)
            .set("name", self.name.clone())
            .set("type", self.type_name.clone())
            .opt("length", self.length)
            .flag("primaryKey", self.primary_key)
            .opt("defaultValue", default_value)
            .flag("notNull", self.not_null)
            .flag("autoIncrement", self.auto_increment)
            .list(
                "options",
                self.options.iter().cloned().map(Value::String).collect(),
            )
            .finish()
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", Ident(&self.name), self.type_name)?;
        if let Some(length) = self.length {
            write!(f, "({})", length)?;
        }
        if self.primary_key {
            write!(f, " PRIMARY KEY")?;
        }
        if self.not_null {
            write!(f, " NOT NULL")?;
        } else {
            // JSON text of the default, so NULL is written `null`
            write!(f, " DEFAULT {}", self.default_value)?;
        }
        if self.auto_increment {
            write!(f, " AUTO_INCREMENT")?;
        }
        for option in &self.options {
            write!(f, " {}", option)?;
        }
        Ok(())
    }
}

/// Table-level `PRIMARY KEY (...)` constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

impl PrimaryKeyConstraint {
    pub const CLASSNAME: &'static str = "PrimaryKeyConstraint";

    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl SqlNode for PrimaryKeyConstraint {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.columns.is_empty() {
            return Err(IrError::MissingField {
                node: Self::CLASSNAME,
                field: "columns",
            });
        }
        Ok(())
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .opt("name", self.name.clone())
            .list(
                "columns",
                self.columns.iter().cloned().map(Value::String).collect(),
            )
            .finish()
    }
}

impl fmt::Display for PrimaryKeyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {} ", Ident(name))?;
        }
        let columns: Vec<Ident<'_>> = self.columns.iter().map(|c| Ident(c)).collect();
        write!(f, "PRIMARY KEY ({})", List(&columns, ", "))
    }
}

/// `CREATE TABLE [IF NOT EXISTS] name (columns, constraints) [AS query]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateTable {
    pub schema: Option<String>,
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<PrimaryKeyConstraint>,
    pub query: Option<Box<Query>>,
}

impl CreateTable {
    pub const CLASSNAME: &'static str = "CreateTable";

    pub fn builder(name: impl Into<String>) -> CreateTableBuilder {
        CreateTableBuilder {
            table: CreateTable {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Name the table is tracked under
    pub fn table_name(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }

    fn primary_key_count(&self) -> usize {
        self.columns.iter().filter(|c| c.primary_key).count() + self.constraints.len()
    }

    fn check_definitions(&self) -> IrResult<()> {
        let mut seen = BTreeSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(IrError::DuplicateColumn(column.name.clone()));
            }
        }
        if self.primary_key_count() > 1 {
            return Err(IrError::MultiplePrimaryKeys(self.name.clone()));
        }
        // with AS query the column list may be partial
        if self.query.is_none() {
            for constraint in &self.constraints {
                if let Some(missing) = constraint.columns.iter().find(|c| !seen.contains(c.as_str())) {
                    return Err(IrError::UnknownColumn(missing.clone()));
                }
            }
        }
        Ok(())
    }
}

impl SqlNode for CreateTable {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        if self.name.is_empty() {
            return Err(IrError::MissingField {
                node: Self::CLASSNAME,
                field: "name",
            });
        }
        if self.columns.is_empty() && self.query.is_none() {
            return Err(IrError::Incomplete {
                node: Self::CLASSNAME,
                message: "a table needs column definitions or a query".to_string(),
            });
        }
        self.columns.iter().try_for_each(SqlNode::check)?;
        self.constraints.iter().try_for_each(SqlNode::check)?;
        self.check_definitions()?;
        match &self.query {
            Some(query) => query.check(),
            None => Ok(()),
        }
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .opt("schema", self.schema.clone())
            .set("name", self.name.clone())
            .flag("ifNotExists", self.if_not_exists)
            .list(
                "columns",
                self.columns.iter().map(SqlNode::json_value).collect(),
            )
            .list(
                "constraints",
                self.constraints.iter().map(SqlNode::json_value).collect(),
            )
            .opt("query", self.query.as_ref().map(|q| q.json_value()))
            .finish()
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE TABLE ")?;
        if self.if_not_exists {
            write!(f, "IF NOT EXISTS ")?;
        }
        write!(f, "{}", Qualified(self.schema.as_deref(), &self.name))?;
        if !self.columns.is_empty() || !self.constraints.is_empty() {
            write!(f, " ({}", List(&self.columns, ", "))?;
            for constraint in &self.constraints {
                if !self.columns.is_empty() {
                    write!(f, ", ")?;
                }
                write!(f, "{}", constraint)?;
            }
            write!(f, ")")?;
        }
        if let Some(query) = &self.query {
            write!(f, " AS {}", query)?;
        }
        Ok(())
    }
}

/// Builder for [`CreateTable`]
///
/// Column and constraint setters enforce unique column names and a single
/// primary key as they go.
#[derive(Debug, Clone)]
pub struct CreateTableBuilder {
    table: CreateTable,
}

impl CreateTableBuilder {
    pub fn schema(&mut self, schema: impl Into<String>) -> &mut Self {
        self.table.schema = Some(schema.into());
        self
    }

    pub fn if_not_exists(&mut self, if_not_exists: bool) -> &mut Self {
        self.table.if_not_exists = if_not_exists;
        self
    }

    pub fn column(&mut self, column: ColumnDef) -> IrResult<&mut Self> {
        column.check()?;
        if self.table.columns.iter().any(|c| c.name == column.name) {
            return Err(IrError::DuplicateColumn(column.name));
        }
        if column.primary_key && self.table.primary_key_count() > 0 {
            return Err(IrError::MultiplePrimaryKeys(self.table.name.clone()));
        }
        self.table.columns.push(column);
        Ok(self)
    }

    pub fn primary_key(&mut self, constraint: PrimaryKeyConstraint) -> IrResult<&mut Self> {
        constraint.check()?;
        if self.table.primary_key_count() > 0 {
            return Err(IrError::MultiplePrimaryKeys(self.table.name.clone()));
        }
        if let Some(missing) = constraint
            .columns
            .iter()
            .find(|name| !self.table.columns.iter().any(|c| &c.name == *name))
        {
            return Err(IrError::UnknownColumn(missing.clone()));
        }
        self.table.constraints.push(constraint);
        Ok(self)
    }

    /// `CREATE TABLE ... AS query`
    pub fn query(&mut self, query: Query) -> &mut Self {
        self.table.query = Some(Box::new(query));
        self
    }

    pub fn build(&self) -> CreateTable {
        self.table.clone()
    }
}

/// `CREATE SCHEMA [IF NOT EXISTS] name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSchema {
    pub name: String,
    pub if_not_exists: bool,
}

impl CreateSchema {
    pub const CLASSNAME: &'static str = "CreateSchema";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_not_exists: false,
        }
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

/// `DROP TABLE [IF EXISTS] name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub schema: Option<String>,
    pub name: String,
    pub if_exists: bool,
}

impl DropTable {
    pub const CLASSNAME: &'static str = "DropTable";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            if_exists: false,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Name the table is tracked under
    pub fn table_name(&self) -> String {
        qualified_name(self.schema.as_deref(), &self.name)
    }
}

/// `DROP SCHEMA [IF EXISTS] name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropSchema {
    pub name: String,
    pub if_exists: bool,
}

impl DropSchema {
    pub const CLASSNAME: &'static str = "DropSchema";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_exists: false,
        }
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }
}

impl SqlNode for CreateSchema {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        require_name(Self::CLASSNAME, &self.name)
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("name", self.name.clone())
            .flag("ifNotExists", self.if_not_exists)
            .finish()
    }
}

impl fmt::Display for CreateSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let if_not_exists = if self.if_not_exists { "IF NOT EXISTS " } else { "" };
        write!(f, "CREATE SCHEMA {}{}", if_not_exists, Ident(&self.name))
    }
}

impl SqlNode for DropTable {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        require_name(Self::CLASSNAME, &self.name)
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .opt("schema", self.schema.clone())
            .set("name", self.name.clone())
            .flag("ifExists", self.if_exists)
            .finish()
    }
}

impl fmt::Display for DropTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let if_exists = if self.if_exists { "IF EXISTS " } else { "" };
        write!(
            f,
            "DROP TABLE {}{}",
            if_exists,
            Qualified(self.schema.as_deref(), &self.name)
        )
    }
}

impl SqlNode for DropSchema {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn check(&self) -> IrResult<()> {
        require_name(Self::CLASSNAME, &self.name)
    }

    fn json_value(&self) -> Value {
        JsonWriter::new(Self::CLASSNAME)
            .set("name", self.name.clone())
            .flag("ifExists", self.if_exists)
            .finish()
    }
}

impl fmt::Display for DropSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let if_exists = if self.if_exists { "IF EXISTS " } else { "" };
        write!(f, "DROP SCHEMA {}{}", if_exists, Ident(&self.name))
    }
}

pub(crate) fn revive_column_def(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(ColumnDef::CLASSNAME, map, registry);
    let mut column = ColumnDef::new(json.str("name")?, json.str("type")?);
    column.length = json.opt_u64("length")?;
    column.default_value = json.get("defaultValue").cloned().unwrap_or(Value::Null);
    column.not_null = json.flag("notNull")?;
    column.auto_increment = json.flag("autoIncrement")?;
    column.options = json.strings("options")?;
    if json.flag("primaryKey")? {
        column = column.primary_key();
    }
    Ok(Node::ColumnDef(column))
}

pub(crate) fn revive_primary_key(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(PrimaryKeyConstraint::CLASSNAME, map, registry);
    Ok(Node::PrimaryKey(PrimaryKeyConstraint {
        name: json.opt_str("name")?.map(str::to_string),
        columns: json.strings("columns")?,
    }))
}

pub(crate) fn revive_create_table(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(CreateTable::CLASSNAME, map, registry);
    let columns = json
        .list("columns")?
        .iter()
        .map(|c| registry.revive(c)?.into_column_def())
        .collect::<IrResult<Vec<_>>>()?;
    let constraints = json
        .list("constraints")?
        .iter()
        .map(|c| registry.revive(c)?.into_primary_key())
        .collect::<IrResult<Vec<_>>>()?;
    let query = json
        .get("query")
        .map(|q| registry.revive_query(q))
        .transpose()?;
    let table = CreateTable {
        schema: json.opt_str("schema")?.map(str::to_string),
        name: json.str("name")?.to_string(),
        if_not_exists: json.flag("ifNotExists")?,
        columns,
        constraints,
        query: query.map(Box::new),
    };
    table.check_definitions()?;
    Ok(Node::Statement(table.into()))
}

pub(crate) fn revive_create_schema(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(CreateSchema::CLASSNAME, map, registry);
    let schema = CreateSchema {
        name: json.str("name")?.to_string(),
        if_not_exists: json.flag("ifNotExists")?,
    };
    Ok(Node::Statement(schema.into()))
}

pub(crate) fn revive_drop_table(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(DropTable::CLASSNAME, map, registry);
    let table = DropTable {
        schema: json.opt_str("schema")?.map(str::to_string),
        name: json.str("name")?.to_string(),
        if_exists: json.flag("ifExists")?,
    };
    Ok(Node::Statement(table.into()))
}

pub(crate) fn revive_drop_schema(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> IrResult<Node> {
    let json = JsonReader::new(DropSchema::CLASSNAME, map, registry);
    let schema = DropSchema {
        name: json.str("name")?.to_string(),
        if_exists: json.flag("ifExists")?,
    };
    Ok(Node::Statement(schema.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_def_rendering() {
        let id = ColumnDef::new("id", "INTEGER").primary_key().auto_increment();
        assert_eq!(
            id.to_sql().unwrap(),
            "`id` INTEGER PRIMARY KEY NOT NULL AUTO_INCREMENT"
        );

        let name = ColumnDef::new("name", "VARCHAR")
            .with_length(64)
            .nullable("unknown")
            .unwrap()
            .option("UNIQUE");
        assert_eq!(
            name.to_sql().unwrap(),
            "`name` VARCHAR(64) DEFAULT \"unknown\" UNIQUE"
        );

        assert_eq!(
            ColumnDef::new("note", "TEXT").to_sql().unwrap(),
            "`note` TEXT DEFAULT null"
        );
    }

    #[test]
    fn test_primary_key_cannot_be_nullable() {
        let err = ColumnDef::new("id", "INTEGER")
            .primary_key()
            .nullable(Value::Null)
            .unwrap_err();
        assert_eq!(err, IrError::NullablePrimaryKey("id".to_string()));
    }

    #[test]
    fn test_revived_primary_key_is_not_null() {
        let json = json!({
            "classname": "ColumnDef",
            "name": "id",
            "type": "INTEGER",
            "primaryKey": true,
            "notNull": false
        });
        let column = NodeRegistry::global()
            .revive(&json)
            .unwrap()
            .into_column_def()
            .unwrap();
        assert!(column.primary_key);
        assert!(column.not_null);
    }

    #[test]
    fn test_nameless_column_fails_check() {
        assert!(ColumnDef::new("", "INTEGER").check().is_err());
    }

    #[test]
    fn test_create_table_rendering() {
        let table = CreateTable::builder("Student")
            .if_not_exists(true)
            .column(ColumnDef::new("id", "INTEGER"))
            .unwrap()
            .column(ColumnDef::new("name", "VARCHAR").with_length(64).not_null())
            .unwrap()
            .primary_key(PrimaryKeyConstraint::new(["id"]))
            .unwrap()
            .build();
        assert_eq!(
            table.to_sql().unwrap(),
            "CREATE TABLE IF NOT EXISTS `Student` (`id` INTEGER DEFAULT null, \
             `name` VARCHAR(64) NOT NULL, PRIMARY KEY (`id`))"
        );
    }

    #[test]
    fn test_create_table_rejects_duplicates() {
        let mut builder = CreateTable::builder("Student");
        builder.column(ColumnDef::new("id", "INTEGER").primary_key()).unwrap();
        assert_eq!(
            builder.column(ColumnDef::new("id", "TEXT")).unwrap_err(),
            IrError::DuplicateColumn("id".to_string())
        );
        assert_eq!(
            builder
                .column(ColumnDef::new("code", "TEXT").primary_key())
                .unwrap_err(),
            IrError::MultiplePrimaryKeys("Student".to_string())
        );
        assert!(
            builder
                .primary_key(PrimaryKeyConstraint::new(["id"]))
                .is_err()
        );
        assert_eq!(builder.build().columns.len(), 1);
    }

    #[test]
    fn test_constraint_columns_must_exist() {
        let mut builder = CreateTable::builder("Student");
        builder.column(ColumnDef::new("id", "INTEGER")).unwrap();
        assert_eq!(
            builder
                .primary_key(PrimaryKeyConstraint::new(["student_id"]))
                .unwrap_err(),
            IrError::UnknownColumn("student_id".to_string())
        );
    }

    #[test]
    fn test_schema_statements() {
        assert_eq!(
            CreateSchema::new("school").if_not_exists().to_sql().unwrap(),
            "CREATE SCHEMA IF NOT EXISTS `school`"
        );
        assert_eq!(
            DropSchema::new("school").if_exists().to_sql().unwrap(),
            "DROP SCHEMA IF EXISTS `school`"
        );
        assert_eq!(
            DropTable::new("Student")
                .with_schema("school")
                .to_sql()
                .unwrap(),
            "DROP TABLE `school`.`Student`"
        );
    }

    #[test]
    fn test_empty_name_is_missing() {
        let missing = |node| IrError::MissingField { node, field: "name" };
        assert_eq!(DropTable::new("").check(), Err(missing(DropTable::CLASSNAME)));
        assert_eq!(CreateSchema::new("").to_sql(), Err(missing(CreateSchema::CLASSNAME)));
    }
}
