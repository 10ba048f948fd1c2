// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Lock Manager
//!
//! Engine-side registry of [`TableLock`]s keyed by table name, and the
//! statement-level entry point that takes every lock a statement needs.
//!
//! ## Lock ordering
//!
//! A statement's tables are locked in lexicographic name order, so two
//! statements touching the same tables always request them in the same order.
//! A table that is both read and written takes only the write lock.
//!
//! ## Dropped tables
//!
//! A dropped table's lock stays registered in its closed state, so every
//! later statement on that name fails with [`LockError::Closed`]. Only a
//! CREATE TABLE statement (or [`LockManager::create_table`]) replaces it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use typed_sql_ir::{Statement, TableAccess};

use crate::config::LockConfig;
use crate::error::{LockError, LockResult};
use crate::lock::{LockKind, SessionId, TableLock};

/// Registry of table locks
#[derive(Debug, Default)]
pub struct LockManager {
    config: LockConfig,
    tables: Mutex<HashMap<String, Arc<TableLock>>>,
}

impl LockManager {
    pub fn new(config: LockConfig) -> Self {
        Self {
            config,
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Lock for `name`, created on first reference
    pub fn table(&self, name: &str) -> Arc<TableLock> {
        let mut tables = self.tables.lock();
        if let Some(lock) = tables.get(name) {
            return lock.clone();
        }
        info!(table = %name, "Registered table lock");
        let lock = Arc::new(TableLock::new(name));
        tables.insert(name.to_string(), lock.clone());
        lock
    }

    /// Fresh lock for a table being (re)created; an open lock is kept as is
    pub fn create_table(&self, name: &str) -> Arc<TableLock> {
        let mut tables = self.tables.lock();
        if let Some(lock) = tables.get(name).filter(|lock| !lock.is_closed()) {
            return lock.clone();
        }
        info!(table = %name, "Registered table lock");
        let lock = Arc::new(TableLock::new(name));
        tables.insert(name.to_string(), lock.clone());
        lock
    }

    pub fn get(&self, name: &str) -> LockResult<Arc<TableLock>> {
        self.tables
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| LockError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.lock().contains_key(name)
    }

    /// Close the table's lock on behalf of `session`; the closed lock stays registered
    pub async fn drop_table(&self, name: &str, session: SessionId) -> LockResult<()> {
        let lock = self.get(name)?;
        lock.close(session).await?;
        info!(table = %name, session = %session, "Dropped table lock");
        Ok(())
    }

    /// Take every lock `statement` needs
    pub async fn acquire(
        &self,
        statement: &Statement,
        session: SessionId,
    ) -> LockResult<StatementPermit> {
        if let Statement::CreateTable(create) = statement {
            self.create_table(&create.table_name());
        }
        self.acquire_access(&statement.table_access(), session).await
    }

    /// Take read locks for `access.reads` and write locks for `access.writes`
    pub async fn acquire_access(
        &self,
        access: &TableAccess,
        session: SessionId,
    ) -> LockResult<StatementPermit> {
        let mut plan: BTreeMap<&str, LockKind> = BTreeMap::new();
        for name in &access.reads {
            plan.insert(name, LockKind::Read);
        }
        for name in &access.writes {
            plan.insert(name, LockKind::Write);
        }

        // on error the partially filled permit releases what it holds
        let mut permit = StatementPermit {
            session,
            held: Vec::with_capacity(plan.len()),
        };
        for (name, kind) in plan {
            let lock = self.table(name);
            self.lock_one(&lock, kind, session).await?;
            permit.held.push((lock, kind));
        }
        debug!(session = %session, tables = permit.held.len(), "Acquired statement locks");
        Ok(permit)
    }

    async fn lock_one(&self, lock: &TableLock, kind: LockKind, session: SessionId) -> LockResult<()> {
        match self.config.acquire_timeout {
            None => lock.lock(kind, session).await,
            Some(timeout) => match tokio::time::timeout(timeout, lock.lock(kind, session)).await {
                Ok(result) => result,
                Err(_) => Err(LockError::Timeout {
                    table: lock.name().to_string(),
                    kind,
                    timeout,
                }),
            },
        }
    }
}

/// Locks held by one session for one statement; released on drop
#[derive(Debug)]
pub struct StatementPermit {
    session: SessionId,
    held: Vec<(Arc<TableLock>, LockKind)>,
}

impl StatementPermit {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Held locks as `(table, kind)`, in acquisition order
    pub fn tables(&self) -> impl Iterator<Item = (&str, LockKind)> {
        self.held.iter().map(|(lock, kind)| (lock.name(), *kind))
    }

    pub fn release(mut self) {
        self.release_all();
    }

    fn release_all(&mut self) {
        // reverse acquisition order
        while let Some((lock, kind)) = self.held.pop() {
            lock.release(kind, self.session);
        }
    }
}

impl Drop for StatementPermit {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn access(reads: &[&str], writes: &[&str]) -> TableAccess {
        TableAccess {
            reads: reads.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            writes: writes.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_table_created_on_first_reference() {
        let manager = LockManager::default();
        assert_eq!(
            manager.get("Student").unwrap_err(),
            LockError::NotFound("Student".to_string())
        );
        let lock = manager.table("Student");
        assert!(Arc::ptr_eq(&lock, &manager.table("Student")));
        assert!(manager.get("Student").is_ok());
    }

    #[tokio::test]
    async fn test_write_supersedes_read() {
        let manager = LockManager::default();
        let permit = manager
            .acquire_access(&access(&["Student", "Class"], &["Student"]), SessionId(1))
            .await
            .unwrap();
        let tables: Vec<_> = permit.tables().collect();
        assert_eq!(
            tables,
            vec![("Class", LockKind::Read), ("Student", LockKind::Write)]
        );
        drop(permit);
        assert!(manager.table("Student").state().writing.is_empty());
        assert!(manager.table("Class").state().reading.is_empty());
    }

    #[tokio::test]
    async fn test_drop_table_keeps_closed_lock() {
        let manager = LockManager::default();
        let lock = manager.table("Student");
        manager.drop_table("Student", SessionId(1)).await.unwrap();
        assert!(lock.is_closed());
        assert!(manager.contains("Student"));
        assert!(Arc::ptr_eq(&lock, &manager.table("Student")));
        assert_eq!(
            manager.drop_table("Student", SessionId(1)).await,
            Err(LockError::Closed("Student".to_string()))
        );
        assert!(matches!(
            manager.drop_table("Class", SessionId(1)).await,
            Err(LockError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_table_replaces_closed_lock() {
        let manager = LockManager::default();
        let open = manager.create_table("Student");
        assert!(Arc::ptr_eq(&open, &manager.create_table("Student")));

        manager.drop_table("Student", SessionId(1)).await.unwrap();
        let fresh = manager.create_table("Student");
        assert!(!fresh.is_closed());
        assert!(!Arc::ptr_eq(&open, &fresh));
        assert!(Arc::ptr_eq(&fresh, &manager.table("Student")));
    }
}
