// ============================================================================
// docsession Library
// ============================================================================
//
// Transactional sessions and generic CRUD over a document store.
//
//   SessionManager ──(SessionHandle)──> CollectionProvider ──> StoreCollection
//         │                                                        ▲
//         └──────────────> StoreClient / StoreSession ─────────────┘
//
// The store traits are implemented by a driver adapter; `memory` ships a
// complete in-process implementation.
// ============================================================================

extern crate self as docsession;

pub mod core;
pub mod document;
pub mod filter;
pub mod id;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod store;
mod runtime;

// Re-export main types for convenience
pub use core::{DataError, Result, Value};
pub use document::Document;
pub use docsession_derive::Document;
pub use filter::{CompareOp, Filter};
pub use id::{CombIdGenerator, comb_id_at, comb_id_from, comb_id_with_timestamp, extract_timestamp, new_comb_id};

// Sessions and CRUD
pub use provider::{BlockingCollection, CollectionProvider, ProviderConfig};
pub use session::{
    SessionConfig, SessionHandle, SessionId, SessionManager, SessionState, SessionStats,
};

// Store gateway
pub use memory::{MemoryStore, StoreStats};
pub use store::{
    FindOptions, ReplaceOptions, ReplaceOutcome, StoreClient, StoreCollection, StoreError,
    StoreOp, StoreResult, StoreSession,
};
