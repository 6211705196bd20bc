use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::hash::Hash;

use crate::core::Value;

/// A stored record: a unique key plus arbitrary domain fields.
///
/// The key is assigned before the document is first persisted and is never
/// changed afterwards. Stores see documents through their serde image, so
/// `KEY_FIELD` must be the *serialized* name of the key field.
///
/// Usually derived:
///
/// ```
/// use docsession::Document;
/// use serde::{Deserialize, Serialize};
/// use uuid::Uuid;
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Document)]
/// #[document(collection = "users")]
/// struct User {
///     #[document(key)]
///     id: Uuid,
///     name: String,
/// }
///
/// assert_eq!(User::KEY_FIELD, "id");
/// assert_eq!(User::COLLECTION, "users");
/// ```
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + Into<Value> + 'static;

    /// Serialized name of the key field.
    const KEY_FIELD: &'static str = "id";

    /// Default collection name for this document type.
    const COLLECTION: &'static str;

    fn key(&self) -> Self::Key;
}
