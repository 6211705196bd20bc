use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::state::{SessionId, SessionState};
use crate::core::{DataError, Result};
use crate::store::StoreSession;

struct SessionCell<S> {
    id: SessionId,
    session: S,
    state: Mutex<SessionState>,
    created_at: Instant,
}

/// A managed store session, as handed to a unit of work.
///
/// Cloning is cheap and every clone refers to the same session. Pass it to
/// provider operations to run them inside the session's transaction. Once
/// the session manager has finished the unit of work the handle is
/// `Released` and provider calls through it are refused.
pub struct SessionHandle<S> {
    inner: Arc<SessionCell<S>>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for SessionHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl<S> SessionHandle<S> {
    pub(crate) fn new(id: SessionId, session: S) -> Self {
        Self {
            inner: Arc::new(SessionCell {
                id,
                session,
                state: Mutex::new(SessionState::Created),
                created_at: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::TransactionActive
    }

    pub fn age(&self) -> Duration {
        self.inner.created_at.elapsed()
    }

    /// The store session, provided a transaction is in progress on it.
    pub(crate) fn active_session(&self) -> Result<&S> {
        let state = self.state();
        if state != SessionState::TransactionActive {
            return Err(DataError::SessionLifecycle(format!(
                "session {} is {}; operations require an active transaction",
                self.inner.id, state
            )));
        }
        Ok(&self.inner.session)
    }

    pub(crate) fn store_session(&self) -> &S {
        &self.inner.session
    }

    pub(crate) fn transition(&self, next: SessionState) -> Result<()> {
        let mut state = self.lock_state();
        if !state.can_transition_to(next) {
            return Err(DataError::SessionLifecycle(format!(
                "session {} cannot move from {} to {}",
                self.inner.id, *state, next
            )));
        }
        *state = next;
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // The state is a plain enum; a poisoned guard still holds a valid value.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: StoreSession> SessionHandle<S> {
    /// Marks the session released and disposes the store session.
    ///
    /// Returns `false` if it was already released; the store session is
    /// disposed exactly once.
    pub(crate) fn release(&self) -> bool {
        {
            let mut state = self.lock_state();
            if state.is_terminal() {
                return false;
            }
            *state = SessionState::Released;
        }
        self.inner.session.release();
        true
    }
}
