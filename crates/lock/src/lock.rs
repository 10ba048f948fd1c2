// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Table Lock
//!
//! A cooperative read/write lock guarding one table, shared by every session
//! of the engine.
//!
//! ## State
//!
//! Four session queues plus a `closed` flag:
//!
//! ```text
//! requesting_read  ──(read enabled, at head)──▶  reading
//! requesting_write ──(write enabled, at head)──▶ writing
//! ```
//!
//! - A read is enabled while no writer is waiting or active.
//! - A write is enabled while nobody is reading or writing.
//! - Within one kind, sessions are admitted in request order.
//!
//! Readers and writers are not ordered against each other: a steady stream
//! of readers keeps a waiting writer out until the readers drain.
//!
//! ## Closing
//!
//! [`TableLock::close`] marks the table closed and then takes the write lock
//! for the closing session. Requests made after that fail immediately with
//! [`LockError::Closed`], and requests already waiting fail when they next
//! re-check. That includes a writer queued ahead of the closer: it is not
//! granted the table first, so nothing runs against a table once its drop
//! has started.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::debug;

use crate::error::{LockError, LockResult};

/// Identifier of an engine session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        SessionId(id)
    }

    /// Allocate a process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SessionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Kind of access requested on a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKind {
    Read,
    Write,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Read => write!(f, "read"),
            LockKind::Write => write!(f, "write"),
        }
    }
}

/// Snapshot of a table lock's queues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockState {
    pub requesting_read: VecDeque<SessionId>,
    pub reading: VecDeque<SessionId>,
    pub requesting_write: VecDeque<SessionId>,
    pub writing: VecDeque<SessionId>,
    pub closed: bool,
}

impl LockState {
    pub fn read_enabled(&self) -> bool {
        self.requesting_write.is_empty() && self.writing.is_empty()
    }

    pub fn write_enabled(&self) -> bool {
        self.reading.is_empty() && self.writing.is_empty()
    }

    fn pending_mut(&mut self, kind: LockKind) -> &mut VecDeque<SessionId> {
        match kind {
            LockKind::Read => &mut self.requesting_read,
            LockKind::Write => &mut self.requesting_write,
        }
    }

    /// Move `session` from the pending queue to the active one if admissible
    fn try_admit(&mut self, kind: LockKind, session: SessionId) -> bool {
        let enabled = match kind {
            LockKind::Read => self.read_enabled(),
            LockKind::Write => self.write_enabled(),
        };
        let pending = self.pending_mut(kind);
        if !enabled || pending.front() != Some(&session) {
            return false;
        }
        pending.pop_front();
        match kind {
            LockKind::Read => self.reading.push_back(session),
            LockKind::Write => self.writing.push_back(session),
        }
        true
    }
}

fn remove_first(queue: &mut VecDeque<SessionId>, session: SessionId) -> bool {
    match queue.iter().position(|s| *s == session) {
        Some(index) => queue.remove(index).is_some(),
        None => false,
    }
}

/// Read/write lock for one table
pub struct TableLock {
    name: String,
    state: Mutex<LockState>,
    changed: Notify,
}

impl TableLock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LockState::default()),
            changed: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Clone of the current queues and flag
    pub fn state(&self) -> LockState {
        self.state.lock().clone()
    }

    /// Wait for shared access to the table
    pub async fn read(&self, session: SessionId) -> LockResult<()> {
        self.acquire(LockKind::Read, session, false).await
    }

    /// Wait for exclusive access to the table
    pub async fn write(&self, session: SessionId) -> LockResult<()> {
        self.acquire(LockKind::Write, session, false).await
    }

    pub async fn lock(&self, kind: LockKind, session: SessionId) -> LockResult<()> {
        self.acquire(kind, session, false).await
    }

    /// Returns whether `session` was reading
    pub fn release_read(&self, session: SessionId) -> bool {
        let released = remove_first(&mut self.state.lock().reading, session);
        if released {
            debug!(table = %self.name, session = %session, "Released read lock");
            self.changed.notify_waiters();
        }
        released
    }

    /// Returns whether `session` held the write lock
    pub fn release_write(&self, session: SessionId) -> bool {
        let released = {
            let mut state = self.state.lock();
            if state.writing.front() == Some(&session) {
                state.writing.pop_front();
                true
            } else {
                false
            }
        };
        if released {
            debug!(table = %self.name, session = %session, "Released write lock");
            self.changed.notify_waiters();
        }
        released
    }

    pub fn release(&self, kind: LockKind, session: SessionId) -> bool {
        match kind {
            LockKind::Read => self.release_read(session),
            LockKind::Write => self.release_write(session),
        }
    }

    /// Mark the table closed and take the write lock for `session`
    pub async fn close(&self, session: SessionId) -> LockResult<()> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(LockError::Closed(self.name.clone()));
            }
            state.closed = true;
        }
        debug!(table = %self.name, session = %session, "Closing table lock");
        // waiters fail on their next re-check
        self.changed.notify_waiters();
        self.acquire(LockKind::Write, session, true).await
    }

    /// Withdraw every pending request of `session`; returns whether any existed
    pub fn cancel(&self, session: SessionId) -> bool {
        let cancelled = {
            let mut state = self.state.lock();
            let read = remove_first(&mut state.requesting_read, session);
            let write = remove_first(&mut state.requesting_write, session);
            read || write
        };
        if cancelled {
            debug!(table = %self.name, session = %session, "Cancelled pending lock request");
            self.changed.notify_waiters();
        }
        cancelled
    }

    async fn acquire(&self, kind: LockKind, session: SessionId, closing: bool) -> LockResult<()> {
        {
            let mut state = self.state.lock();
            if state.closed && !closing {
                return Err(LockError::Closed(self.name.clone()));
            }
            state.pending_mut(kind).push_back(session);
        }
        debug!(table = %self.name, session = %session, kind = %kind, "Requested lock");

        let mut pending = PendingRequest {
            lock: self,
            kind,
            session,
            armed: true,
        };
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // register before checking so a concurrent release is not missed
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.closed && !closing {
                    remove_first(state.pending_mut(kind), session);
                    drop(state);
                    pending.armed = false;
                    self.changed.notify_waiters();
                    return Err(LockError::Closed(self.name.clone()));
                }
                if state.try_admit(kind, session) {
                    drop(state);
                    pending.armed = false;
                    debug!(table = %self.name, session = %session, kind = %kind, "Acquired lock");
                    // admission can unblock the next reader in line
                    self.changed.notify_waiters();
                    return Ok(());
                }
            }
            notified.await;
        }
    }
}

impl fmt::Debug for TableLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableLock")
            .field("name", &self.name)
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Removes the queued request if the acquiring future is dropped early
struct PendingRequest<'a> {
    lock: &'a TableLock,
    kind: LockKind,
    session: SessionId,
    armed: bool,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let removed = remove_first(self.lock.state.lock().pending_mut(self.kind), self.session);
        if removed {
            debug!(
                table = %self.lock.name,
                session = %self.session,
                kind = %self.kind,
                "Dropped pending lock request"
            );
            self.lock.changed.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    const A: SessionId = SessionId(1);
    const B: SessionId = SessionId(2);
    const C: SessionId = SessionId(3);

    #[tokio::test]
    async fn test_readers_share() {
        let lock = TableLock::new("Student");
        lock.read(A).await.unwrap();
        lock.read(B).await.unwrap();
        assert_eq!(lock.state().reading, VecDeque::from([A, B]));
        assert!(lock.release_read(A));
        assert!(!lock.release_read(A));
        assert!(lock.release_read(B));
    }

    #[tokio::test]
    async fn test_writer_waits_for_reader() {
        let lock = Arc::new(TableLock::new("Student"));
        lock.read(A).await.unwrap();

        let writer = tokio::spawn({
            let lock = lock.clone();
            async move { lock.write(B).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());
        assert_eq!(lock.state().requesting_write, VecDeque::from([B]));

        lock.release_read(A);
        writer.await.unwrap().unwrap();
        assert_eq!(lock.state().writing, VecDeque::from([B]));
    }

    #[tokio::test]
    async fn test_pending_writer_blocks_new_readers() {
        let lock = Arc::new(TableLock::new("Student"));
        lock.read(A).await.unwrap();
        let writer = tokio::spawn({
            let lock = lock.clone();
            async move { lock.write(B).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let reader = tokio::spawn({
            let lock = lock.clone();
            async move { lock.read(C).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        lock.release_read(A);
        writer.await.unwrap().unwrap();
        assert!(!reader.is_finished());
        lock.release_write(B);
        reader.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_release_write_requires_holder() {
        let lock = TableLock::new("Student");
        lock.write(A).await.unwrap();
        assert!(!lock.release_write(B));
        assert!(lock.release_write(A));
        assert!(!lock.release_write(A));
    }

    #[tokio::test]
    async fn test_close_rejects_later_requests() {
        let lock = TableLock::new("Student");
        lock.close(A).await.unwrap();
        assert!(lock.is_closed());
        assert_eq!(lock.state().writing, VecDeque::from([A]));
        assert_eq!(lock.read(B).await, Err(LockError::Closed("Student".to_string())));
        assert_eq!(lock.write(B).await, Err(LockError::Closed("Student".to_string())));
        assert_eq!(lock.close(B).await, Err(LockError::Closed("Student".to_string())));
    }

    #[tokio::test]
    async fn test_close_fails_waiting_requests() {
        let lock = Arc::new(TableLock::new("Student"));
        lock.write(A).await.unwrap();
        let reader = tokio::spawn({
            let lock = lock.clone();
            async move { lock.read(B).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let closer = tokio::spawn({
            let lock = lock.clone();
            async move { lock.close(C).await }
        });
        assert_eq!(
            reader.await.unwrap(),
            Err(LockError::Closed("Student".to_string()))
        );
        assert!(lock.state().requesting_read.is_empty());

        lock.release_write(A);
        closer.await.unwrap().unwrap();
        assert_eq!(lock.state().writing, VecDeque::from([C]));
    }

    #[tokio::test]
    async fn test_close_fails_writer_queued_ahead() {
        let lock = Arc::new(TableLock::new("Student"));
        lock.read(A).await.unwrap();
        let writer = tokio::spawn({
            let lock = lock.clone();
            async move { lock.write(B).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(lock.state().requesting_write, VecDeque::from([B]));

        let closer = tokio::spawn({
            let lock = lock.clone();
            async move { lock.close(C).await }
        });
        assert_eq!(
            writer.await.unwrap(),
            Err(LockError::Closed("Student".to_string()))
        );

        lock.release_read(A);
        closer.await.unwrap().unwrap();
        assert_eq!(lock.state().writing, VecDeque::from([C]));
    }

    #[tokio::test]
    async fn test_cancel_and_drop_remove_pending() {
        let lock = Arc::new(TableLock::new("Student"));
        lock.write(A).await.unwrap();

        let waiting = tokio::spawn({
            let lock = lock.clone();
            async move { lock.read(B).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(lock.cancel(B));
        assert!(!lock.cancel(B));
        waiting.abort();

        let timed_out = tokio::time::timeout(Duration::from_millis(20), lock.write(C)).await;
        assert!(timed_out.is_err());
        assert!(lock.state().requesting_write.is_empty());
    }
}
