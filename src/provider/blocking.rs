use super::CollectionProvider;
use crate::core::Result;
use crate::document::Document;
use crate::filter::Filter;
use crate::runtime;
use crate::session::SessionHandle;
use crate::store::{FindOptions, StoreCollection};

/// Synchronous mirror of [`CollectionProvider`].
///
/// Each call blocks the current thread until the async operation finishes.
/// Usable from plain threads and from inside a tokio runtime alike.
pub struct BlockingCollection<'a, D, G> {
    provider: &'a CollectionProvider<D, G>,
}

impl<'a, D, G> BlockingCollection<'a, D, G>
where
    D: Document,
    G: StoreCollection<D>,
{
    pub(crate) fn new(provider: &'a CollectionProvider<D, G>) -> Self {
        Self { provider }
    }

    pub fn insert(&self, document: D, session: Option<&SessionHandle<G::Session>>) -> Result<D::Key> {
        runtime::block_on(self.provider.insert(document, session))?
    }

    pub fn insert_many(
        &self,
        documents: Vec<D>,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<D::Key>> {
        runtime::block_on(self.provider.insert_many(documents, session))?
    }

    pub fn find(
        &self,
        filters: &[Filter],
        options: FindOptions,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<D>> {
        runtime::block_on(self.provider.find(filters, options, session))?
    }

    pub fn find_projected<R, F>(
        &self,
        filters: &[Filter],
        projection: F,
        options: FindOptions,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(D) -> R + Send,
    {
        runtime::block_on(
            self.provider
                .find_projected(filters, projection, options, session),
        )?
    }

    pub fn count(&self, filters: &[Filter], session: Option<&SessionHandle<G::Session>>) -> Result<u64> {
        runtime::block_on(self.provider.count(filters, session))?
    }

    pub fn update(
        &self,
        document: D,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<D::Key> {
        runtime::block_on(self.provider.update(document, filter, session))?
    }

    pub fn update_many(
        &self,
        documents: Vec<D>,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<D::Key>> {
        runtime::block_on(self.provider.update_many(documents, filter, session))?
    }

    pub fn upsert(
        &self,
        document: D,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<D::Key> {
        runtime::block_on(self.provider.upsert(document, filter, session))?
    }

    pub fn upsert_many(
        &self,
        documents: Vec<D>,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<Vec<D::Key>> {
        runtime::block_on(self.provider.upsert_many(documents, filter, session))?
    }

    pub fn delete(&self, filter: &Filter, session: Option<&SessionHandle<G::Session>>) -> Result<u64> {
        runtime::block_on(self.provider.delete(filter, session))?
    }

    pub fn delete_many(
        &self,
        filter: &Filter,
        session: Option<&SessionHandle<G::Session>>,
    ) -> Result<u64> {
        runtime::block_on(self.provider.delete_many(filter, session))?
    }
}
