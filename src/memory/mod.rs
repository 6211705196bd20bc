//! In-memory document store
//!
//! A complete [`StoreClient`] over named collections of JSON documents. It
//! backs the crate's tests and suits embedding and prototyping. Sessions get
//! snapshot-style transactions: writes go to a private working copy and are
//! replayed onto the shared collections when the transaction commits.
//!
//! Faults can be injected per [`StoreOp`] to exercise failure paths.

mod collection;
mod ops;
mod session;

pub use collection::MemoryCollection;
pub use session::MemorySession;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::document::Document;
use crate::store::{StoreClient, StoreError, StoreOp, StoreResult};

#[derive(Debug, Clone)]
enum FaultMode {
    Once(StoreError),
    Always(StoreError),
}

#[derive(Default)]
pub(crate) struct StoreState {
    collections: RwLock<HashMap<String, Vec<JsonValue>>>,
    faults: Mutex<HashMap<StoreOp, FaultMode>>,
    next_session_id: AtomicU64,
    sessions_started: AtomicU64,
    sessions_released: AtomicU64,
    transactions_started: AtomicU64,
    commits: AtomicU64,
    aborts: AtomicU64,
}

impl StoreState {
    /// Fails with the fault armed for `op`, consuming it if it was one-shot.
    pub(crate) fn check_fault(&self, op: StoreOp) -> StoreResult<()> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        match faults.get(&op).cloned() {
            Some(FaultMode::Once(err)) => {
                faults.remove(&op);
                Err(err)
            }
            Some(FaultMode::Always(err)) => Err(err),
            None => Ok(()),
        }
    }

    fn arm(&self, op: StoreOp, mode: FaultMode) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op, mode);
    }
}

/// Counters of store-side session activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub sessions_started: u64,
    pub sessions_released: u64,
    pub transactions_started: u64,
    pub commits: u64,
    pub aborts: u64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Store Stats: {}/{} sessions released, {} transactions, {} commits, {} aborts",
            self.sessions_released,
            self.sessions_started,
            self.transactions_started,
            self.commits,
            self.aborts
        )
    }
}

/// Shared in-memory store. Clones refer to the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The collection named by `D::COLLECTION`.
    pub fn collection<D: Document>(&self) -> MemoryCollection<D> {
        self.collection_named(D::COLLECTION)
    }

    pub fn collection_named<D: Document>(&self, name: impl Into<String>) -> MemoryCollection<D> {
        MemoryCollection::new(name.into(), Arc::clone(&self.state))
    }

    /// Names of collections holding committed data, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        let collections = self.state.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of committed documents in `collection`.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.state
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Committed JSON images of the documents in `collection`.
    pub async fn documents(&self, collection: &str) -> Vec<JsonValue> {
        self.state
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes the next call of `op` fail with [`StoreError::Injected`].
    pub fn fail_next(&self, op: StoreOp) {
        self.fail_next_with(op, StoreError::Injected(op));
    }

    pub fn fail_next_with(&self, op: StoreOp, err: StoreError) {
        self.state.arm(op, FaultMode::Once(err));
    }

    /// Makes every call of `op` fail until the faults are cleared.
    pub fn fail_always(&self, op: StoreOp) {
        self.state.arm(op, FaultMode::Always(StoreError::Injected(op)));
    }

    pub fn clear_faults(&self) {
        self.state
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn stats(&self) -> StoreStats {
        let state = &self.state;
        StoreStats {
            sessions_started: state.sessions_started.load(Ordering::SeqCst),
            sessions_released: state.sessions_released.load(Ordering::SeqCst),
            transactions_started: state.transactions_started.load(Ordering::SeqCst),
            commits: state.commits.load(Ordering::SeqCst),
            aborts: state.aborts.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    type Session = MemorySession;

    async fn start_session(&self) -> StoreResult<MemorySession> {
        self.state.check_fault(StoreOp::StartSession)?;
        let id = self.state.next_session_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.sessions_started.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession::new(id, Arc::clone(&self.state)))
    }
}
