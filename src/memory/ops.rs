use serde_json::Value as JsonValue;

use crate::filter::Filter;
use crate::store::{FindOptions, ReplaceOutcome, StoreError, StoreResult};

/// A write against one collection, as applied directly or logged by a
/// transaction for replay on commit.
#[derive(Debug, Clone)]
pub(crate) enum WriteOp {
    Insert(Vec<JsonValue>),
    Replace {
        filter: Filter,
        document: JsonValue,
        upsert: bool,
    },
    DeleteOne(Filter),
    DeleteMany(Filter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteEffect {
    Inserted(usize),
    Replaced(ReplaceOutcome),
    Deleted(u64),
}

impl WriteEffect {
    pub(crate) fn replaced(self) -> ReplaceOutcome {
        match self {
            Self::Replaced(outcome) => outcome,
            _ => ReplaceOutcome::default(),
        }
    }

    pub(crate) fn deleted(self) -> u64 {
        match self {
            Self::Deleted(count) => count,
            _ => 0,
        }
    }
}

fn key_of<'a>(document: &'a JsonValue, key_field: &str) -> StoreResult<&'a JsonValue> {
    match document.get(key_field) {
        Some(key) if !key.is_null() => Ok(key),
        _ => Err(StoreError::Serialization(format!(
            "document has no '{}' key field",
            key_field
        ))),
    }
}

/// A write's effect plus the keys of every document it inserted, replaced
/// or removed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Applied {
    pub(crate) effect: WriteEffect,
    pub(crate) keys: Vec<JsonValue>,
}

impl Applied {
    fn new(effect: WriteEffect, keys: Vec<JsonValue>) -> Self {
        Self { effect, keys }
    }
}

fn key_or_null(document: &JsonValue, key_field: &str) -> JsonValue {
    document.get(key_field).cloned().unwrap_or(JsonValue::Null)
}

fn contains_key(documents: &[JsonValue], key_field: &str, key: &JsonValue) -> bool {
    position_of(documents, key_field, key).is_some()
}

/// Index of the document whose key field equals `key`.
pub(crate) fn position_of(documents: &[JsonValue], key_field: &str, key: &JsonValue) -> Option<usize> {
    documents
        .iter()
        .position(|document| document.get(key_field) == Some(key))
}

/// Applies one write to `documents`.
///
/// Each write is atomic: on error `documents` is left untouched.
pub(crate) fn apply(
    documents: &mut Vec<JsonValue>,
    key_field: &str,
    op: &WriteOp,
) -> StoreResult<Applied> {
    match op {
        WriteOp::Insert(batch) => {
            let mut seen = Vec::with_capacity(batch.len());
            for document in batch {
                let key = key_of(document, key_field)?;
                if contains_key(documents, key_field, key) || seen.contains(&key) {
                    return Err(StoreError::DuplicateKey(key.to_string()));
                }
                seen.push(key);
            }
            let keys = seen.into_iter().cloned().collect();
            documents.extend(batch.iter().cloned());
            Ok(Applied::new(WriteEffect::Inserted(batch.len()), keys))
        }
        WriteOp::Replace {
            filter,
            document,
            upsert,
        } => {
            let new_key = key_of(document, key_field)?;
            match documents.iter().position(|existing| filter.matches(existing)) {
                Some(index) => {
                    if documents[index].get(key_field) != Some(new_key) {
                        return Err(StoreError::ImmutableKey(new_key.to_string()));
                    }
                    let modified = documents[index] != *document;
                    documents[index] = document.clone();
                    Ok(Applied::new(
                        WriteEffect::Replaced(ReplaceOutcome {
                            matched: 1,
                            modified: u64::from(modified),
                            upserted: false,
                        }),
                        vec![new_key.clone()],
                    ))
                }
                None if *upsert => {
                    if contains_key(documents, key_field, new_key) {
                        return Err(StoreError::DuplicateKey(new_key.to_string()));
                    }
                    documents.push(document.clone());
                    Ok(Applied::new(
                        WriteEffect::Replaced(ReplaceOutcome {
                            matched: 0,
                            modified: 0,
                            upserted: true,
                        }),
                        vec![new_key.clone()],
                    ))
                }
                None => Ok(Applied::new(
                    WriteEffect::Replaced(ReplaceOutcome::default()),
                    Vec::new(),
                )),
            }
        }
        WriteOp::DeleteOne(filter) => {
            match documents.iter().position(|existing| filter.matches(existing)) {
                Some(index) => {
                    let removed = documents.remove(index);
                    Ok(Applied::new(
                        WriteEffect::Deleted(1),
                        vec![key_or_null(&removed, key_field)],
                    ))
                }
                None => Ok(Applied::new(WriteEffect::Deleted(0), Vec::new())),
            }
        }
        WriteOp::DeleteMany(filter) => {
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(documents)
                .into_iter()
                .partition(|existing| filter.matches(existing));
            *documents = kept;
            let keys = removed
                .iter()
                .map(|document| key_or_null(document, key_field))
                .collect();
            Ok(Applied::new(WriteEffect::Deleted(removed.len() as u64), keys))
        }
    }
}

/// Matching documents in insertion order, paginated.
pub(crate) fn select(documents: &[JsonValue], filter: &Filter, options: FindOptions) -> Vec<JsonValue> {
    documents
        .iter()
        .filter(|document| filter.matches(document))
        .skip(options.skip.unwrap_or(0))
        .take(options.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}
