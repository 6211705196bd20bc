// ============================================================================
// Session State Management
// ============================================================================
//
// Every managed session walks one path:
//
//   Created ──begin──> TransactionActive ──commit──> Committed ──┐
//      │                      │ └──────abort──────> Aborted ─────┤
//      │                      └──(commit call failed)────────────┤
//      └────────────────(begin failed)───────────────────────────┴──> Released
//
// Released is terminal. Only one of commit/abort is ever applied.
//
// ============================================================================

use std::fmt;
use uuid::Uuid;

use crate::id::new_comb_id;

/// Process-local correlation id of a managed session.
///
/// Used only for pool bookkeeping and logs; it is unrelated to document
/// keys and to any store-side session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh id (a comb identifier, so ids sort by creation time).
    pub fn new() -> Self {
        SessionId(new_comb_id())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Created,
    TransactionActive,
    Committed,
    Aborted,
    Released,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created, TransactionActive)
                | (Created, Released)
                | (TransactionActive, Committed)
                | (TransactionActive, Aborted)
                | (TransactionActive, Released)
                | (Committed, Released)
                | (Aborted, Released)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Released)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::TransactionActive => "transaction-active",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}
