//! Everything application code usually needs, in one import.
//!
//! `use docsession::prelude::*;` brings in the document model, filters,
//! sessions and the CRUD provider. Driver authors implementing the store
//! traits import from [`crate::store`] instead.

pub use crate::{
    CollectionProvider, DataError, Document, Filter, FindOptions, MemoryStore, ProviderConfig,
    Result, SessionConfig, SessionHandle, SessionManager, new_comb_id,
};
