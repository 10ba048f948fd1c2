// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Typed SQL Lock
//!
//! Per-table read/write locks arbitrating concurrent sessions while an
//! engine executes [`typed_sql_ir::Statement`]s.
//!
//! ```
//! use typed_sql_ir::{Delete, Statement};
//! use typed_sql_lock::{LockConfig, LockManager, SessionId};
//!
//! # tokio_test_block_on(async {
//! let manager = LockManager::new(LockConfig::default());
//! let delete: Statement = Delete::builder("Student").build().into();
//! let permit = manager.acquire(&delete, SessionId::next()).await.unwrap();
//! // ... execute the statement ...
//! permit.release();
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lock;
pub mod manager;

pub use config::LockConfig;
pub use error::{LockError, LockResult};
pub use lock::{LockKind, LockState, SessionId, TableLock};
pub use manager::{LockManager, StatementPermit};
