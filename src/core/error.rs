use thiserror::Error;

use crate::store::StoreError;

/// Error taxonomy shared by the session manager and the CRUD provider.
///
/// Store faults never cross this boundary as-is: they are logged where they
/// are caught and reduced to [`DataError::Internal`] carrying only the
/// operation tag and a generic message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("No matching documents found")]
    NotFound,

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Internal error in '{operation}': {message}")]
    Internal {
        operation: &'static str,
        message: String,
    },

    #[error("Session lifecycle error: {0}")]
    SessionLifecycle(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    pub fn internal(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Internal {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_operation_failed(&self) -> bool {
        matches!(self, Self::OperationFailed(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Maps a store fault onto the caller-facing taxonomy.
    ///
    /// Cancellation keeps its own kind; every other fault becomes an
    /// internal error that does not carry the fault itself.
    pub(crate) fn from_store(operation: &'static str, message: &str, err: &StoreError) -> Self {
        match err {
            StoreError::Cancelled(reason) => Self::Cancelled(reason.clone()),
            _ => Self::internal(operation, message),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for DataError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::SessionLifecycle(format!("session pool lock poisoned: {err}"))
    }
}
