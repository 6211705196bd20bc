use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use super::StoreState;
use super::ops::{self, WriteEffect, WriteOp};
use crate::filter::Filter;
use crate::store::{FindOptions, StoreError, StoreOp, StoreResult, StoreSession};

#[derive(Default)]
struct SessionTx {
    active: bool,
    /// Collections written by this transaction.
    working: HashMap<String, WorkingSet>,
}

impl SessionTx {
    fn clear(&mut self) {
        self.active = false;
        self.working.clear();
    }
}

/// One collection as this transaction sees it.
struct WorkingSet {
    key_field: &'static str,
    /// Committed documents when the transaction first wrote the collection.
    base: Vec<JsonValue>,
    documents: Vec<JsonValue>,
    /// Keys of every document the transaction inserted, replaced or removed.
    touched: Vec<JsonValue>,
}

impl WorkingSet {
    fn new(key_field: &'static str, committed: Vec<JsonValue>) -> Self {
        Self {
            key_field,
            base: committed.clone(),
            documents: committed,
            touched: Vec::new(),
        }
    }

    fn image<'a>(documents: &'a [JsonValue], key_field: &str, key: &JsonValue) -> Option<&'a JsonValue> {
        ops::position_of(documents, key_field, key).map(|index| &documents[index])
    }

    /// Publishes the touched documents into `committed`.
    ///
    /// Fails without changing `committed` when another writer changed a
    /// touched document after this transaction read it.
    fn publish(&self, name: &str, committed: &mut Vec<JsonValue>) -> StoreResult<()> {
        for key in &self.touched {
            let read = Self::image(&self.base, self.key_field, key);
            let current = Self::image(committed, self.key_field, key);
            if read != current {
                return Err(StoreError::Transaction(format!(
                    "write conflict on commit: '{}' key {} changed since it was read",
                    name, key
                )));
            }
        }

        for key in &self.touched {
            let written = Self::image(&self.documents, self.key_field, key).cloned();
            match (ops::position_of(committed, self.key_field, key), written) {
                (Some(index), Some(document)) => committed[index] = document,
                (Some(index), None) => {
                    committed.remove(index);
                }
                (None, Some(document)) => committed.push(document),
                (None, None) => {}
            }
        }
        Ok(())
    }
}

/// Store session of a [`MemoryStore`](super::MemoryStore).
///
/// Lock order is transaction first, then the shared collections.
pub struct MemorySession {
    id: u64,
    state: Arc<StoreState>,
    tx: Mutex<SessionTx>,
    released: AtomicBool,
}

impl MemorySession {
    pub(crate) fn new(id: u64, state: Arc<StoreState>) -> Self {
        Self {
            id,
            state,
            tx: Mutex::new(SessionTx::default()),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub(crate) fn belongs_to(&self, state: &Arc<StoreState>) -> bool {
        Arc::ptr_eq(&self.state, state)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_released() {
            return Err(StoreError::Session(format!(
                "session {} has been released",
                self.id
            )));
        }
        Ok(())
    }

    fn no_transaction(&self) -> StoreError {
        StoreError::Transaction(format!("session {} has no transaction in progress", self.id))
    }

    /// Applies `op` to this transaction's view of `collection` and logs it.
    pub(crate) async fn write(
        &self,
        collection: &str,
        key_field: &'static str,
        op: WriteOp,
    ) -> StoreResult<WriteEffect> {
        self.ensure_open()?;
        let mut tx = self.tx.lock().await;
        if !tx.active {
            return Err(self.no_transaction());
        }

        if !tx.working.contains_key(collection) {
            let committed = self
                .state
                .collections
                .read()
                .await
                .get(collection)
                .cloned()
                .unwrap_or_default();
            tx.working
                .insert(collection.to_string(), WorkingSet::new(key_field, committed));
        }

        let working = tx
            .working
            .get_mut(collection)
            .ok_or_else(|| StoreError::Transaction("working copy missing".into()))?;
        let applied = ops::apply(&mut working.documents, key_field, &op)?;
        for key in applied.keys {
            if !working.touched.contains(&key) {
                working.touched.push(key);
            }
        }
        Ok(applied.effect)
    }

    /// Reads `collection` as this transaction sees it.
    pub(crate) async fn select(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<JsonValue>> {
        self.ensure_open()?;
        let tx = self.tx.lock().await;
        if !tx.active {
            return Err(self.no_transaction());
        }

        if let Some(working) = tx.working.get(collection) {
            return Ok(ops::select(&working.documents, filter, options));
        }
        let collections = self.state.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| ops::select(documents, filter, options))
            .unwrap_or_default())
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn begin_transaction(&self) -> StoreResult<()> {
        self.ensure_open()?;
        self.state.check_fault(StoreOp::BeginTransaction)?;
        let mut tx = self.tx.lock().await;
        if tx.active {
            return Err(StoreError::Transaction(format!(
                "session {} already has a transaction in progress",
                self.id
            )));
        }
        tx.active = true;
        self.state.transactions_started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit_transaction(&self) -> StoreResult<()> {
        self.ensure_open()?;
        self.state.check_fault(StoreOp::Commit)?;
        let mut tx = self.tx.lock().await;
        if !tx.active {
            return Err(self.no_transaction());
        }

        // First writer wins: every touched document is checked against the
        // committed data before anything is published.
        let mut collections = self.state.collections.write().await;
        let mut staged = Vec::with_capacity(tx.working.len());
        for (name, working) in &tx.working {
            let mut documents = collections.get(name).cloned().unwrap_or_default();
            working.publish(name, &mut documents)?;
            staged.push((name.clone(), documents));
        }
        collections.extend(staged);
        drop(collections);

        tx.clear();
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort_transaction(&self) -> StoreResult<()> {
        self.ensure_open()?;
        self.state.check_fault(StoreOp::Abort)?;
        let mut tx = self.tx.lock().await;
        if !tx.active {
            return Err(self.no_transaction());
        }
        tx.clear();
        self.state.aborts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        // Anything uncommitted is discarded. A held lock means an operation
        // is still in flight; it fails on its next call through this session.
        if let Ok(mut tx) = self.tx.try_lock() {
            tx.clear();
        }
        self.state.sessions_released.fetch_add(1, Ordering::SeqCst);
    }
}
