use std::collections::HashMap;
use std::sync::RwLock;

use super::handle::SessionHandle;
use super::state::SessionId;
use crate::core::{DataError, Result};

/// Registry of live sessions keyed by their correlation id.
///
/// Safe for concurrent register/lookup/remove; callers need no locking of
/// their own. Every acquisition uses a fresh id, so an entry lives exactly
/// as long as its unit of work.
pub struct SessionPool<S> {
    sessions: RwLock<HashMap<SessionId, SessionHandle<S>>>,
}

impl<S> SessionPool<S> {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Whether one more session fits under `max_sessions`.
    pub fn has_capacity(&self, max_sessions: Option<usize>) -> Result<bool> {
        let sessions = self.sessions.read()?;
        Ok(max_sessions.is_none_or(|max| sessions.len() < max))
    }

    /// Registers a session if the pool has room for it.
    ///
    /// Returns `Ok(false)` when the pool is full. A duplicate id means the
    /// pool invariant is broken and is reported as a lifecycle error.
    pub fn try_register(
        &self,
        handle: SessionHandle<S>,
        max_sessions: Option<usize>,
    ) -> Result<bool> {
        let mut sessions = self.sessions.write()?;
        if max_sessions.is_some_and(|max| sessions.len() >= max) {
            return Ok(false);
        }

        let id = handle.id();
        if sessions.contains_key(&id) {
            return Err(DataError::SessionLifecycle(format!(
                "session {} is already registered",
                id
            )));
        }
        sessions.insert(id, handle);
        Ok(true)
    }

    pub fn get(&self, id: SessionId) -> Option<SessionHandle<S>> {
        self.sessions.read().ok()?.get(&id).cloned()
    }

    pub fn remove(&self, id: SessionId) -> Option<SessionHandle<S>> {
        match self.sessions.write() {
            Ok(mut sessions) => sessions.remove(&id),
            Err(poisoned) => poisoned.into_inner().remove(&id),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|sessions| sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .map(|sessions| sessions.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl<S> Default for SessionPool<S> {
    fn default() -> Self {
        Self::new()
    }
}
