use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::StoreState;
use super::ops::{self, WriteEffect, WriteOp};
use super::session::MemorySession;
use crate::document::Document;
use crate::filter::Filter;
use crate::store::{
    FindOptions, ReplaceOptions, ReplaceOutcome, StoreCollection, StoreError, StoreOp, StoreResult,
};

/// Typed view of one named collection in a [`MemoryStore`](super::MemoryStore).
pub struct MemoryCollection<D> {
    name: String,
    state: Arc<StoreState>,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Clone for MemoryCollection<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            _marker: PhantomData,
        }
    }
}

impl<D: Document> MemoryCollection<D> {
    pub(crate) fn new(name: String, state: Arc<StoreState>) -> Self {
        Self {
            name,
            state,
            _marker: PhantomData,
        }
    }

    fn encode(document: &D) -> StoreResult<JsonValue> {
        Ok(serde_json::to_value(document)?)
    }

    fn decode(documents: Vec<JsonValue>) -> StoreResult<Vec<D>> {
        documents
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(StoreError::from))
            .collect()
    }

    async fn write(
        &self,
        op: WriteOp,
        session: Option<&MemorySession>,
    ) -> StoreResult<WriteEffect> {
        match session {
            Some(session) => {
                self.check_session(session)?;
                session.write(&self.name, D::KEY_FIELD, op).await
            }
            None => {
                let mut collections = self.state.collections.write().await;
                let documents = collections.entry(self.name.clone()).or_default();
                ops::apply(documents, D::KEY_FIELD, &op).map(|applied| applied.effect)
            }
        }
    }

    async fn select(
        &self,
        filter: &Filter,
        options: FindOptions,
        session: Option<&MemorySession>,
    ) -> StoreResult<Vec<JsonValue>> {
        match session {
            Some(session) => {
                self.check_session(session)?;
                session.select(&self.name, filter, options).await
            }
            None => {
                let collections = self.state.collections.read().await;
                Ok(collections
                    .get(&self.name)
                    .map(|documents| ops::select(documents, filter, options))
                    .unwrap_or_default())
            }
        }
    }

    fn check_session(&self, session: &MemorySession) -> StoreResult<()> {
        if !session.belongs_to(&self.state) {
            return Err(StoreError::Session(format!(
                "session {} belongs to a different store",
                session.id()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<D: Document> StoreCollection<D> for MemoryCollection<D> {
    type Session = MemorySession;

    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, document: D, session: Option<&MemorySession>) -> StoreResult<()> {
        self.state.check_fault(StoreOp::Insert)?;
        let encoded = Self::encode(&document)?;
        self.write(WriteOp::Insert(vec![encoded]), session).await?;
        Ok(())
    }

    async fn insert_many(
        &self,
        documents: Vec<D>,
        session: Option<&MemorySession>,
    ) -> StoreResult<()> {
        self.state.check_fault(StoreOp::Insert)?;
        let encoded = documents
            .iter()
            .map(Self::encode)
            .collect::<StoreResult<Vec<_>>>()?;
        self.write(WriteOp::Insert(encoded), session).await?;
        Ok(())
    }

    async fn replace_one(
        &self,
        filter: &Filter,
        document: D,
        options: ReplaceOptions,
        session: Option<&MemorySession>,
    ) -> StoreResult<ReplaceOutcome> {
        self.state.check_fault(StoreOp::Replace)?;
        let op = WriteOp::Replace {
            filter: filter.clone(),
            document: Self::encode(&document)?,
            upsert: options.upsert,
        };
        Ok(self.write(op, session).await?.replaced())
    }

    async fn delete_one(&self, filter: &Filter, session: Option<&MemorySession>) -> StoreResult<u64> {
        self.state.check_fault(StoreOp::Delete)?;
        let effect = self.write(WriteOp::DeleteOne(filter.clone()), session).await?;
        Ok(effect.deleted())
    }

    async fn delete_many(
        &self,
        filter: &Filter,
        session: Option<&MemorySession>,
    ) -> StoreResult<u64> {
        self.state.check_fault(StoreOp::Delete)?;
        let effect = self.write(WriteOp::DeleteMany(filter.clone()), session).await?;
        Ok(effect.deleted())
    }

    async fn find(
        &self,
        filter: &Filter,
        options: FindOptions,
        session: Option<&MemorySession>,
    ) -> StoreResult<Vec<D>> {
        self.state.check_fault(StoreOp::Find)?;
        let documents = self.select(filter, options, session).await?;
        Self::decode(documents)
    }

    async fn count(&self, filter: &Filter, session: Option<&MemorySession>) -> StoreResult<u64> {
        self.state.check_fault(StoreOp::Count)?;
        let documents = self.select(filter, FindOptions::default(), session).await?;
        Ok(documents.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u32,
        text: String,
    }

    impl Document for Note {
        type Key = u32;
        const COLLECTION: &'static str = "notes";

        fn key(&self) -> u32 {
            self.id
        }
    }

    fn note(id: u32, text: &str) -> Note {
        Note {
            id,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_autocommit_round_trip() {
        let store = MemoryStore::new();
        let notes = store.collection::<Note>();

        notes
            .insert_many(vec![note(1, "a"), note(2, "b")], None)
            .await
            .unwrap();
        let found = notes.find(&Filter::eq("id", 2), FindOptions::default(), None).await.unwrap();

        assert_eq!(found, vec![note(2, "b")]);
        assert_eq!(notes.count(&Filter::All, None).await.unwrap(), 2);
        assert_eq!(store.collection_names().await, vec!["notes".to_string()]);
    }

    #[tokio::test]
    async fn test_injected_fault_blocks_operation() {
        let store = MemoryStore::new();
        let notes = store.collection::<Note>();
        store.fail_next(StoreOp::Insert);

        let err = notes.insert_one(note(1, "a"), None).await.unwrap_err();
        assert_eq!(err, StoreError::Injected(StoreOp::Insert));
        assert_eq!(store.document_count("notes").await, 0);
    }

    #[tokio::test]
    async fn test_foreign_session_is_rejected() {
        use crate::store::{StoreClient, StoreSession};

        let store = MemoryStore::new();
        let other = MemoryStore::new();
        let session = other.start_session().await.unwrap();
        session.begin_transaction().await.unwrap();

        let err = store
            .collection::<Note>()
            .insert_one(note(1, "a"), Some(&session))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Session(_)));
    }
}
