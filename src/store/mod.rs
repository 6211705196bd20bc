//! Store gateway
//!
//! The traits a document-store driver implements so the session manager and
//! the CRUD provider can run on top of it. Everything here is expressed in
//! store terms: faults are [`StoreError`]s and sessions are the driver's own
//! handles. Translation into the caller-facing taxonomy happens one layer up.

mod error;

pub use error::{StoreError, StoreOp, StoreResult};

use async_trait::async_trait;

use crate::document::Document;
use crate::filter::Filter;

/// Factory for store sessions.
#[async_trait]
pub trait StoreClient: Send + Sync {
    type Session: StoreSession + 'static;

    async fn start_session(&self) -> StoreResult<Self::Session>;
}

/// A store-side transactional context.
#[async_trait]
pub trait StoreSession: Send + Sync {
    async fn begin_transaction(&self) -> StoreResult<()>;

    async fn commit_transaction(&self) -> StoreResult<()>;

    async fn abort_transaction(&self) -> StoreResult<()>;

    /// Disposes the session. An unfinished transaction is discarded.
    fn release(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOptions {
    pub upsert: bool,
}

impl ReplaceOptions {
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// What a single `replace_one` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub matched: u64,
    pub modified: u64,
    pub upserted: bool,
}

/// Pagination applied by the store after filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One collection of documents of type `D`.
///
/// Every operation takes an optional session. With a session the operation
/// joins that session's transaction; without one it runs on its own and is
/// committed immediately by the store.
#[async_trait]
pub trait StoreCollection<D: Document>: Send + Sync {
    type Session: StoreSession;

    fn name(&self) -> &str;

    async fn insert_one(&self, document: D, session: Option<&Self::Session>) -> StoreResult<()>;

    async fn insert_many(
        &self,
        documents: Vec<D>,
        session: Option<&Self::Session>,
    ) -> StoreResult<()>;

    async fn replace_one(
        &self,
        filter: &Filter,
        document: D,
        options: ReplaceOptions,
        session: Option<&Self::Session>,
    ) -> StoreResult<ReplaceOutcome>;

    async fn delete_one(&self, filter: &Filter, session: Option<&Self::Session>)
    -> StoreResult<u64>;

    async fn delete_many(
        &self,
        filter: &Filter,
        session: Option<&Self::Session>,
    ) -> StoreResult<u64>;

    async fn find(
        &self,
        filter: &Filter,
        options: FindOptions,
        session: Option<&Self::Session>,
    ) -> StoreResult<Vec<D>>;

    async fn count(&self, filter: &Filter, session: Option<&Self::Session>) -> StoreResult<u64> {
        let documents = self.find(filter, FindOptions::default(), session).await?;
        Ok(documents.len() as u64)
    }
}
