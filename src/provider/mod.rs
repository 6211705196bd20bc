//! Generic CRUD provider
//!
//! [`CollectionProvider`] layers the caller-facing semantics over a
//! [`StoreCollection`]: not-found and precondition outcomes, per-document key
//! matching for batch writes, and reduction of store faults to
//! [`DataError`]. It holds no per-call state.

mod blocking;
mod config;

pub use blocking::BlockingCollection;
pub use config::ProviderConfig;

use std::marker::PhantomData;

use futures::future::try_join_all;
use tracing::{Instrument, Level, debug_span, event};

use crate::core::{DataError, Result};
use crate::document::Document;
use crate::filter::Filter;
use crate::session::SessionHandle;
use crate::store::{FindOptions, ReplaceOptions, ReplaceOutcome, StoreCollection, StoreError};

pub struct CollectionProvider<D, G> {
    gateway: G,
    config: ProviderConfig,
    _marker: PhantomData<fn() -> D>,
}

impl<D, G> CollectionProvider<D, G>
where
    D: Document,
    G: StoreCollection<D>,
{
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            config: ProviderConfig::default(),
            _marker: PhantomData,
        }
    }

    pub fn with_config(gateway: G, config: ProviderConfig) -> Result<Self> {
        config.validate().map_err(DataError::InvalidConfig)?;
        Ok(Self {
            gateway,
            config,
            _marker: PhantomData,
        })
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn collection_name(&self) -> &str {
        self.gateway.name()
    }

    /// Synchronous view over this provider.
    pub fn blocking(&self) -> BlockingCollection<'_, D, G> {
        BlockingCollection::new(self)
    }

    /// Inserts one document and returns its key.
    pub async fn insert(
        &self,
        document: D,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<D::Key> {
        let span = debug_span!("provider.insert", collection = %self.gateway.name());
        async move {
            let session = store_session(session)?;
            let key = document.key();
            self.gateway
                .insert_one(document, session)
                .await
                .map_err(|err| self.fault("insert", err))?;
            Ok(key)
        }
        .instrument(span)
        .await
    }

    /// Inserts a batch; keys come back in input order.
    pub async fn insert_many(
        &self,
        documents: Vec<D>,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<D::Key>> {
        let span = debug_span!(
            "provider.insert_many",
            collection = %self.gateway.name(),
            count = documents.len()
        );
        async move {
            let session = store_session(session)?;
            if documents.is_empty() {
                return Ok(Vec::new());
            }
            let keys: Vec<D::Key> = documents.iter().map(Document::key).collect();
            self.gateway
                .insert_many(documents, session)
                .await
                .map_err(|err| self.fault("insert_many", err))?;
            Ok(keys)
        }
        .instrument(span)
        .await
    }

    /// Documents matching every filter in `filters`.
    ///
    /// An empty result is reported as [`DataError::NotFound`].
    pub async fn find(
        &self,
        filters: &[Filter],
        options: FindOptions,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<D>> {
        let span = debug_span!("provider.find", collection = %self.gateway.name());
        async move {
            let session = store_session(session)?;
            let filter = Filter::all_of(filters.iter().cloned());
            let documents = self
                .gateway
                .find(&filter, options, session)
                .await
                .map_err(|err| self.fault("find", err))?;
            if documents.is_empty() {
                event!(Level::DEBUG, filter = %filter, "no matching documents");
                return Err(DataError::NotFound);
            }
            Ok(documents)
        }
        .instrument(span)
        .await
    }

    /// Like [`find`](Self::find), mapping every match through `projection`.
    pub async fn find_projected<R, F>(
        &self,
        filters: &[Filter],
        projection: F,
        options: FindOptions,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<R>>
    where
        F: Fn(D) -> R,
    {
        let documents = self.find(filters, options, session).await?;
        Ok(documents.into_iter().map(projection).collect())
    }

    pub async fn count(
        &self,
        filters: &[Filter],
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<u64> {
        let span = debug_span!("provider.count", collection = %self.gateway.name());
        async move {
            let session = store_session(session)?;
            let filter = Filter::all_of(filters.iter().cloned());
            self.gateway
                .count(&filter, session)
                .await
                .map_err(|err| self.fault("count", err))
        }
        .instrument(span)
        .await
    }

    /// Replaces the first document matching `filter`.
    ///
    /// Fails with [`DataError::OperationFailed`] when nothing matches; no
    /// document is inserted in that case.
    pub async fn update(
        &self,
        document: D,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<D::Key> {
        let span = debug_span!("provider.update", collection = %self.gateway.name());
        async move {
            let session = store_session(session)?;
            let key = document.key();
            let outcome = self
                .gateway
                .replace_one(filter, document, ReplaceOptions::default(), session)
                .await
                .map_err(|err| self.fault("update", err))?;
            if outcome.matched == 0 {
                return Err(no_match(&key));
            }
            Ok(key)
        }
        .instrument(span)
        .await
    }

    /// Updates each document against `filter AND key == document.key()`.
    ///
    /// Every document must match; otherwise the call fails with
    /// [`DataError::OperationFailed`]. Without a session the documents that
    /// did match stay replaced; pass a session to make the batch all or
    /// nothing.
    pub async fn update_many(
        &self,
        documents: Vec<D>,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<D::Key>> {
        let span = debug_span!(
            "provider.update_many",
            collection = %self.gateway.name(),
            count = documents.len()
        );
        async move {
            let session = store_session(session)?;
            let keys: Vec<D::Key> = documents.iter().map(Document::key).collect();
            let outcomes = self
                .replace_each(documents, filter, ReplaceOptions::default(), session)
                .await
                .map_err(|err| self.fault("update_many", err))?;
            if let Some((key, _)) = keys
                .iter()
                .zip(&outcomes)
                .find(|(_, outcome)| outcome.matched == 0)
            {
                return Err(no_match(key));
            }
            Ok(keys)
        }
        .instrument(span)
        .await
    }

    /// Replaces the first match of `filter`, inserting `document` if none.
    pub async fn upsert(
        &self,
        document: D,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<D::Key> {
        let span = debug_span!("provider.upsert", collection = %self.gateway.name());
        async move {
            let session = store_session(session)?;
            let key = document.key();
            self.gateway
                .replace_one(filter, document, ReplaceOptions::upsert(), session)
                .await
                .map_err(|err| self.fault("upsert", err))?;
            Ok(key)
        }
        .instrument(span)
        .await
    }

    /// Upserts each document against `filter AND key == document.key()`.
    pub async fn upsert_many(
        &self,
        documents: Vec<D>,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<D::Key>> {
        let span = debug_span!(
            "provider.upsert_many",
            collection = %self.gateway.name(),
            count = documents.len()
        );
        async move {
            let session = store_session(session)?;
            let keys: Vec<D::Key> = documents.iter().map(Document::key).collect();
            self.replace_each(documents, filter, ReplaceOptions::upsert(), session)
                .await
                .map_err(|err| self.fault("upsert_many", err))?;
            Ok(keys)
        }
        .instrument(span)
        .await
    }

    /// Removes the first document matching `filter`. Zero is not an error.
    pub async fn delete(
        &self,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<u64> {
        let span = debug_span!("provider.delete", collection = %self.gateway.name());
        async move {
            let session = store_session(session)?;
            self.gateway
                .delete_one(filter, session)
                .await
                .map_err(|err| self.fault("delete", err))
        }
        .instrument(span)
        .await
    }

    pub async fn delete_many(
        &self,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<u64> {
        let span = debug_span!("provider.delete_many", collection = %self.gateway.name());
        async move {
            let session = store_session(session)?;
            self.gateway
                .delete_many(filter, session)
                .await
                .map_err(|err| self.fault("delete_many", err))
        }
        .instrument(span)
        .await
    }

    /// One `replace_one` per document, each narrowed to that document's key.
    ///
    /// Inside a session the calls run in order; a transaction admits one
    /// operation at a time. Otherwise they run concurrently and the first
    /// failure fails the batch.
    async fn replace_each(
        &self,
        documents: Vec<D>,
        filter: &Filter,
        options: ReplaceOptions,
        session: Option<&G::Session>,
    ) -> std::result::Result<Vec<ReplaceOutcome>, StoreError> {
        let targeted: Vec<(Filter, D)> = documents
            .into_iter()
            .map(|document| (filter.clone().and(Filter::key::<D>(&document.key())), document))
            .collect();

        match session {
            Some(session) => {
                let mut outcomes = Vec::with_capacity(targeted.len());
                for (filter, document) in targeted {
                    let outcome = self
                        .gateway
                        .replace_one(&filter, document, options, Some(session))
                        .await?;
                    outcomes.push(outcome);
                }
                Ok(outcomes)
            }
            None => {
                let gateway = &self.gateway;
                try_join_all(targeted.into_iter().map(|(filter, document)| async move {
                    gateway.replace_one(&filter, document, options, None).await
                }))
                .await
            }
        }
    }

    fn fault(&self, operation: &'static str, err: StoreError) -> DataError {
        event!(
            Level::ERROR,
            collection = %self.gateway.name(),
            operation,
            error = %err,
            "store operation failed"
        );
        DataError::from_store(operation, &self.config.error_message, &err)
    }
}

fn store_session<S>(session: Option<&SessionHandle<S>>) -> Result<Option<&S>> {
    session.map(SessionHandle::active_session).transpose()
}

fn no_match<K: std::fmt::Debug>(key: &K) -> DataError {
    DataError::OperationFailed(format!("no document matched the update for key {:?}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCollection, MemoryStore};
    use crate::store::StoreOp;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
        label: String,
        qty: i64,
    }

    impl Document for Item {
        type Key = i64;
        const COLLECTION: &'static str = "items";

        fn key(&self) -> i64 {
            self.id
        }
    }

    fn item(id: i64, label: &str, qty: i64) -> Item {
        Item {
            id,
            label: label.to_string(),
            qty,
        }
    }

    fn provider(store: &MemoryStore) -> CollectionProvider<Item, MemoryCollection<Item>> {
        CollectionProvider::new(store.collection::<Item>())
    }

    #[tokio::test]
    async fn test_find_conjoins_filters_and_paginates() {
        let store = MemoryStore::new();
        let items = provider(&store);
        items
            .insert_many(
                vec![item(1, "a", 5), item(2, "b", 10), item(3, "c", 15), item(4, "d", 20)],
                None,
            )
            .await
            .unwrap();

        let found = items
            .find(
                &[Filter::gt("qty", 5), Filter::lt("qty", 20)],
                FindOptions::default(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(found, vec![item(2, "b", 10), item(3, "c", 15)]);

        let page = items
            .find_projected(
                &[],
                |item| item.label,
                FindOptions::default().skip(1).limit(2),
                None,
            )
            .await
            .unwrap();
        assert_eq!(page, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_find_without_match_is_not_found() {
        let store = MemoryStore::new();
        let err = provider(&store)
            .find(&[Filter::eq("id", 1)], FindOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err, DataError::NotFound);
    }

    #[tokio::test]
    async fn test_store_fault_is_reduced_to_internal() {
        let store = MemoryStore::new();
        let items = CollectionProvider::with_config(
            store.collection::<Item>(),
            ProviderConfig::new().error_message("items unavailable"),
        )
        .unwrap();
        store.fail_next(StoreOp::Insert);

        let err = items.insert(item(1, "a", 1), None).await.unwrap_err();
        assert_eq!(err, DataError::internal("insert", "items unavailable"));
    }

    #[tokio::test]
    async fn test_store_cancellation_keeps_its_kind() {
        let store = MemoryStore::new();
        store.fail_next_with(StoreOp::Count, StoreError::Cancelled("deadline".into()));

        let err = provider(&store).count(&[], None).await.unwrap_err();
        assert_eq!(err, DataError::Cancelled("deadline".into()));
    }

    #[tokio::test]
    async fn test_empty_batches_skip_the_store() {
        let store = MemoryStore::new();
        store.fail_always(StoreOp::Insert);
        store.fail_always(StoreOp::Replace);
        let items = provider(&store);

        assert!(items.insert_many(Vec::new(), None).await.unwrap().is_empty());
        assert!(
            items
                .upsert_many(Vec::new(), &Filter::All, None)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_update_many_requires_every_document_to_match() {
        let store = MemoryStore::new();
        let items = provider(&store);
        items.insert(item(1, "a", 1), None).await.unwrap();

        let err = items
            .update_many(vec![item(1, "a2", 1), item(2, "b2", 2)], &Filter::All, None)
            .await
            .unwrap_err();
        assert!(err.is_operation_failed());
        assert_eq!(
            store.documents("items").await,
            vec![serde_json::json!({"id": 1, "label": "a2", "qty": 1})]
        );
    }

    #[tokio::test]
    async fn test_update_many_in_session_is_all_or_nothing() {
        let store = MemoryStore::new();
        let manager = crate::session::SessionManager::new(std::sync::Arc::new(store.clone()));
        let items = provider(&store);
        items.insert(item(1, "a", 1), None).await.unwrap();

        let err = manager
            .execute(|session| {
                let items = &items;
                async move {
                    items
                        .update_many(vec![item(1, "a2", 1), item(2, "b2", 2)], &Filter::All, Some(&session))
                        .await?;
                    Ok(())
                }
            })
            .await
            .unwrap_err();

        assert!(err.is_operation_failed());
        assert_eq!(
            store.documents("items").await,
            vec![serde_json::json!({"id": 1, "label": "a", "qty": 1})]
        );
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let store = MemoryStore::new();
        let result = CollectionProvider::<Item, _>::with_config(
            store.collection::<Item>(),
            ProviderConfig::new().error_message("  "),
        );
        assert!(matches!(result, Err(DataError::InvalidConfig(_))));
    }
}
