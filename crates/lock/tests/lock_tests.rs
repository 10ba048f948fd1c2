// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for table locks driven by IR statements

use std::sync::Arc;
use std::time::Duration;

use typed_sql_ir::{
    BinaryExpr, ColumnDef, CreateTable, Delete, InExpr, Insert, Query, SchemaTable, Statement,
    Update, col, value,
};
use typed_sql_lock::{LockConfig, LockError, LockKind, LockManager, SessionId};
use typed_sql_test_utils::init_tracing;

fn select_students() -> Statement {
    Query::builder().from("Student").build().into()
}

fn update_student() -> Statement {
    Update::builder("Student")
        .set("name", value("Kenny"))
        .where_clause(BinaryExpr::new("=", col("id"), value(1)).unwrap())
        .build()
        .into()
}

#[tokio::test]
async fn test_reader_then_writer_is_fifo() {
    init_tracing();
    let manager = Arc::new(LockManager::default());
    let a = SessionId::next();
    let b = SessionId::next();

    let reading = manager.acquire(&select_students(), a).await.unwrap();
    let writer = tokio::spawn({
        let manager = manager.clone();
        async move { manager.acquire(&update_student(), b).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!writer.is_finished());

    reading.release();
    let writing = writer.await.unwrap().unwrap();
    assert_eq!(
        writing.tables().collect::<Vec<_>>(),
        vec![("Student", LockKind::Write)]
    );
}

#[tokio::test]
async fn test_sub_query_tables_are_read_locked() {
    let manager = LockManager::default();
    let banned = Query::builder()
        .select(col("student_id"))
        .from(SchemaTable::new("Banned"))
        .build();
    let delete: Statement = Delete::builder("Student")
        .where_clause(InExpr::new(col("id"), banned).unwrap())
        .build()
        .into();

    let permit = manager.acquire(&delete, SessionId::next()).await.unwrap();
    assert_eq!(
        permit.tables().collect::<Vec<_>>(),
        vec![("Banned", LockKind::Read), ("Student", LockKind::Write)]
    );
    assert_eq!(manager.table("Banned").state().reading.len(), 1);
}

#[tokio::test]
async fn test_concurrent_readers() {
    let manager = Arc::new(LockManager::default());
    let first = manager
        .acquire(&select_students(), SessionId::next())
        .await
        .unwrap();
    let second = manager
        .acquire(&select_students(), SessionId::next())
        .await
        .unwrap();
    assert_eq!(manager.table("Student").state().reading.len(), 2);
    drop(first);
    drop(second);
    assert!(manager.table("Student").state().reading.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_acquire_timeout_cancels_request() {
    let config = LockConfig::new().with_acquire_timeout(Duration::from_millis(100));
    let manager = LockManager::new(config);
    let holder = manager
        .acquire(&update_student(), SessionId::next())
        .await
        .unwrap();

    let insert: Statement = Insert::builder("Student")
        .values([value(1)])
        .unwrap()
        .build()
        .into();
    let err = manager
        .acquire(&insert, SessionId::next())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LockError::Timeout {
            table: "Student".to_string(),
            kind: LockKind::Write,
            timeout: Duration::from_millis(100),
        }
    );
    assert!(manager.table("Student").state().requesting_write.is_empty());
    drop(holder);
}

#[tokio::test]
async fn test_dropped_table_rejects_statements() {
    let manager = LockManager::default();
    let student = manager.table("Student");
    manager
        .drop_table("Student", SessionId::next())
        .await
        .unwrap();

    assert_eq!(
        student.read(SessionId::next()).await,
        Err(LockError::Closed("Student".to_string()))
    );
    assert_eq!(
        manager.acquire(&select_students(), SessionId::next()).await.unwrap_err(),
        LockError::Closed("Student".to_string())
    );
    assert!(manager.get("Student").unwrap().is_closed());
}

#[tokio::test]
async fn test_create_table_reopens_dropped_table() {
    let manager = LockManager::default();
    manager.table("Student");
    manager
        .drop_table("Student", SessionId::next())
        .await
        .unwrap();

    let mut create = CreateTable::builder("Student");
    create
        .column(ColumnDef::new("id", "INTEGER").primary_key())
        .unwrap();
    let create: Statement = create.build().into();
    let permit = manager.acquire(&create, SessionId::next()).await.unwrap();
    assert_eq!(
        permit.tables().collect::<Vec<_>>(),
        vec![("Student", LockKind::Write)]
    );
    permit.release();

    let reading = manager.acquire(&select_students(), SessionId::next()).await.unwrap();
    assert_eq!(
        reading.tables().collect::<Vec<_>>(),
        vec![("Student", LockKind::Read)]
    );
}

#[tokio::test]
async fn test_failed_acquire_releases_earlier_locks() {
    let manager = LockManager::default();
    // "Applicant" sorts before "Student"; the closed Student lock fails the statement
    let closed = manager.table("Student");
    closed.close(SessionId::next()).await.unwrap();

    let source = Query::builder().from("Applicant").build();
    let insert: Statement = Insert::builder("Student")
        .query(source)
        .unwrap()
        .build()
        .into();
    assert!(matches!(
        manager.acquire(&insert, SessionId::next()).await,
        Err(LockError::Closed(_))
    ));
    assert!(manager.table("Applicant").state().reading.is_empty());
}
