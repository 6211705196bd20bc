//! Transactional session management
//!
//! [`SessionManager`] owns the whole life of a store session: acquisition,
//! transaction begin, commit or abort, and release. Units of work receive a
//! [`SessionHandle`] and pass it to provider operations explicitly.

mod config;
mod handle;
mod manager;
mod pool;
mod state;

pub use config::SessionConfig;
pub use handle::SessionHandle;
pub use manager::{SessionManager, SessionStats};
pub use pool::SessionPool;
pub use state::{SessionId, SessionState};
