// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Node registry
//!
//! Maps a `classname` tag to the constructor that revives that node kind
//! from its JSON object. Constructors revive nested tagged fields through the
//! same registry, so a whole statement tree can be rebuilt from one call to
//! [`NodeRegistry::revive`].
//!
//! The registry also carries the [`Dialect`] whose operator whitelist revived
//! expressions are checked against.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde_json::{Map, Value};
use tracing::warn;

use crate::ddl;
use crate::dialect::Dialect;
use crate::error::{IrError, IrResult};
use crate::expr::{self, Expr};
use crate::json::tagged_object;
use crate::node::Node;
use crate::query::{self, Query};
use crate::statement::{self, Statement};
use crate::table::{self, Table};

/// Revives one node kind from its JSON object
pub type Constructor = fn(&Map<String, Value>, &NodeRegistry) -> IrResult<Node>;

const BUILTINS: &[(&str, Constructor)] = &[
    // expressions
    ("Value", expr::revive_value),
    ("ColumnExpression", expr::revive_column),
    ("Variable", expr::revive_variable),
    ("BinaryExpression", expr::revive_binary),
    ("BetweenExpression", expr::revive_between),
    ("InExpression", expr::revive_in),
    ("IsNullExpression", expr::revive_is_null),
    ("ExistsExpression", expr::revive_exists),
    ("CaseExpression", expr::revive_case),
    ("FunctionExpression", expr::revive_function),
    ("MathExpression", expr::revive_math),
    ("GroupExpression", expr::revive_group),
    // tables
    ("SchemaTable", table::revive_schema_table),
    ("QueryTable", table::revive_query_table),
    ("RemoteTable", table::revive_remote_table),
    ("FromTable", table::revive_from_table),
    ("JoinClause", table::revive_join_clause),
    // query parts
    ("ResultColumn", query::revive_result_column),
    ("OrderBy", query::revive_order_by),
    ("GroupBy", query::revive_group_by),
    ("Limit", query::revive_limit),
    // statements
    ("Query", query::revive_query),
    ("Insert", statement::revive_insert),
    ("Update", statement::revive_update),
    ("Delete", statement::revive_delete),
    // definitions
    ("ColumnDef", ddl::revive_column_def),
    ("PrimaryKeyConstraint", ddl::revive_primary_key),
    ("CreateTable", ddl::revive_create_table),
    ("CreateSchema", ddl::revive_create_schema),
    ("DropTable", ddl::revive_drop_table),
    ("DropSchema", ddl::revive_drop_schema),
];

/// Tag → constructor map used to revive tagged JSON
#[derive(Clone)]
pub struct NodeRegistry {
    constructors: HashMap<String, Constructor>,
    dialect: Dialect,
}

impl NodeRegistry {
    /// Registry without any constructor
    pub fn empty(dialect: Dialect) -> Self {
        Self {
            constructors: HashMap::new(),
            dialect,
        }
    }

    /// Fresh registry holding every built-in node kind
    pub fn with_dialect(dialect: Dialect) -> Self {
        let mut registry = Self::empty(dialect);
        for (tag, constructor) in BUILTINS {
            registry.constructors.insert(tag.to_string(), *constructor);
        }
        registry
    }

    /// Process-wide registry with all built-ins for the default dialect
    pub fn global() -> &'static NodeRegistry {
        static GLOBAL: OnceLock<NodeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| NodeRegistry::with_dialect(Dialect::default()))
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Associate `tag` with `constructor`, returning the one it replaces
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        constructor: Constructor,
    ) -> Option<Constructor> {
        let tag = tag.into();
        let previous = self.constructors.insert(tag.clone(), constructor);
        if previous.is_some() {
            warn!(tag = %tag, "Replacing previously registered node constructor");
        }
        previous
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags in no particular order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Revive any node from tagged JSON
    pub fn revive(&self, json: &Value) -> IrResult<Node> {
        let (tag, map) = tagged_object(json)?;
        let constructor = self
            .constructors
            .get(tag)
            .ok_or_else(|| IrError::KindNotFound(tag.to_string()))?;
        constructor(map, self)
    }

    /// Parse a JSON document and revive the node it holds
    pub fn revive_str(&self, json: &str) -> IrResult<Node> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| IrError::invalid_json("document", e.to_string()))?;
        self.revive(&value)
    }

    pub fn revive_expr(&self, json: &Value) -> IrResult<Expr> {
        self.revive(json)?.into_expr()
    }

    pub fn revive_table(&self, json: &Value) -> IrResult<Table> {
        self.revive(json)?.into_table()
    }

    pub fn revive_statement(&self, json: &Value) -> IrResult<Statement> {
        self.revive(json)?.into_statement()
    }

    pub fn revive_query(&self, json: &Value) -> IrResult<Query> {
        self.revive(json)?.into_query()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_dialect(Dialect::default())
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("NodeRegistry")
            .field("dialect", &self.dialect)
            .field("tags", &tags)
            .finish()
    }
}
