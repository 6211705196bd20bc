use std::fmt;
use thiserror::Error;

/// Store operations, used to tag faults and to target fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    StartSession,
    BeginTransaction,
    Commit,
    Abort,
    Insert,
    Replace,
    Delete,
    Find,
    Count,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartSession => "start_session",
            Self::BeginTransaction => "begin_transaction",
            Self::Commit => "commit",
            Self::Abort => "abort",
            Self::Insert => "insert",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::Find => "find",
            Self::Count => "count",
        };
        f.write_str(name)
    }
}

/// Faults raised by a store gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Document key is immutable: {0}")]
    ImmutableKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Injected fault on {0}")]
    Injected(StoreOp),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
