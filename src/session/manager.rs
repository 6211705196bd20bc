use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{Instrument, Level, event, info_span};

use super::config::SessionConfig;
use super::handle::SessionHandle;
use super::pool::SessionPool;
use super::state::{SessionId, SessionState};
use crate::core::{DataError, Result};
use crate::runtime;
use crate::store::{StoreClient, StoreSession};

/// Runs units of work inside store transactions.
///
/// Each call acquires a fresh session, begins a transaction, hands a
/// [`SessionHandle`] to the unit of work and then commits on `Ok` or aborts
/// on `Err`. The session is released afterwards no matter how the unit of
/// work ended, including panics and cancellation of the returned future.
///
/// # Examples
///
/// ```
/// use docsession::{CollectionProvider, Document, MemoryStore, SessionManager};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Document)]
/// #[document(collection = "accounts")]
/// struct Account {
///     #[document(key)]
///     id: i64,
///     balance: i64,
/// }
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let manager = SessionManager::new(Arc::new(store.clone()));
/// let accounts = CollectionProvider::new(store.collection::<Account>());
///
/// let key = manager
///     .transaction(|session| {
///         let accounts = &accounts;
///         async move {
///             accounts
///                 .insert(Account { id: 1, balance: 100 }, Some(&session))
///                 .await
///         }
///     })
///     .await?;
///
/// assert_eq!(key, 1);
/// assert_eq!(accounts.count(&[], None).await?, 1);
/// # Ok::<(), docsession::DataError>(())
/// # }).unwrap();
/// ```
pub struct SessionManager<C: StoreClient> {
    client: Arc<C>,
    pool: Arc<SessionPool<C::Session>>,
    config: SessionConfig,
    counters: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    acquired: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
    fatal: AtomicU64,
}

/// Snapshot of the manager's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub max_sessions: Option<usize>,
    pub acquired: u64,
    pub committed: u64,
    pub aborted: u64,
    /// Commit or abort calls the store rejected.
    pub fatal: u64,
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let max = self
            .max_sessions
            .map_or_else(|| "unbounded".to_string(), |max| max.to_string());
        write!(
            f,
            "Session Stats: {} active (max {}), {} acquired, {} committed, {} aborted, {} fatal",
            self.active_sessions, max, self.acquired, self.committed, self.aborted, self.fatal
        )
    }
}

enum WorkOutcome<T> {
    Completed(Result<T>),
    Panicked(String),
    TimedOut(Duration),
}

impl<T> WorkOutcome<T> {
    fn from_unwind(result: std::result::Result<Result<T>, Box<dyn Any + Send>>) -> Self {
        match result {
            Ok(result) => Self::Completed(result),
            Err(payload) => Self::Panicked(panic_message(payload.as_ref())),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<C: StoreClient> SessionManager<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            pool: Arc::new(SessionPool::new()),
            config: SessionConfig::default(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_config(client: Arc<C>, config: SessionConfig) -> Result<Self> {
        config.validate().map_err(DataError::InvalidConfig)?;
        Ok(Self {
            config,
            ..Self::new(client)
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of sessions currently registered in the pool.
    pub fn active_sessions(&self) -> usize {
        self.pool.len()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_sessions: self.pool.len(),
            max_sessions: self.config.max_sessions,
            acquired: self.counters.acquired.load(Ordering::SeqCst),
            committed: self.counters.committed.load(Ordering::SeqCst),
            aborted: self.counters.aborted.load(Ordering::SeqCst),
            fatal: self.counters.fatal.load(Ordering::SeqCst),
        }
    }

    /// Runs `work` in a transaction and returns its value.
    ///
    /// If `transaction_timeout` is configured and elapses, the unit of work is
    /// dropped, the transaction aborted and [`DataError::Cancelled`] returned.
    pub async fn transaction<T, F, Fut>(&self, work: F) -> Result<T>
    where
        F: FnOnce(SessionHandle<C::Session>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let handle = self.acquire().await?;
        let span = info_span!("session.transaction", session_id = %handle.id());
        let mut guard = ReleaseGuard::new(Arc::clone(&self.pool), handle.clone());

        async move {
            if let Err(err) = self.begin(&handle).await {
                guard.release();
                return Err(err);
            }

            let unit = handle.clone();
            let guarded = AssertUnwindSafe(async move { work(unit).await }).catch_unwind();
            let outcome = match self.config.transaction_timeout {
                Some(limit) => match tokio::time::timeout(limit, guarded).await {
                    Ok(result) => WorkOutcome::from_unwind(result),
                    Err(_) => WorkOutcome::TimedOut(limit),
                },
                None => WorkOutcome::from_unwind(guarded.await),
            };

            let result = self.finish(&handle, outcome).await;
            guard.release();
            result
        }
        .instrument(span)
        .await
    }

    /// Runs `work` in a transaction for its side effects only.
    pub async fn execute<F, Fut>(&self, work: F) -> Result<()>
    where
        F: FnOnce(SessionHandle<C::Session>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.transaction(work).await
    }

    /// Synchronous form of [`transaction`](Self::transaction).
    ///
    /// `work` runs on the calling thread; store calls block on the async
    /// core. A running synchronous unit of work cannot be interrupted, so
    /// `transaction_timeout` does not apply here.
    pub fn transaction_blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(SessionHandle<C::Session>) -> Result<T>,
    {
        let handle = runtime::block_on(self.acquire())??;
        let span = info_span!("session.transaction", session_id = %handle.id());
        let _enter = span.enter();
        let mut guard = ReleaseGuard::new(Arc::clone(&self.pool), handle.clone());

        if let Err(err) = runtime::block_on(self.begin(&handle)).and_then(|begun| begun) {
            guard.release();
            return Err(err);
        }

        let unit = handle.clone();
        let outcome = WorkOutcome::from_unwind(catch_unwind(AssertUnwindSafe(move || work(unit))));

        let result = runtime::block_on(self.finish(&handle, outcome)).and_then(|done| done);
        guard.release();
        result
    }

    /// Synchronous form of [`execute`](Self::execute).
    pub fn execute_blocking<F>(&self, work: F) -> Result<()>
    where
        F: FnOnce(SessionHandle<C::Session>) -> Result<()>,
    {
        self.transaction_blocking(work)
    }

    async fn acquire(&self) -> Result<SessionHandle<C::Session>> {
        let start = Instant::now();

        loop {
            if self.pool.has_capacity(self.config.max_sessions)? {
                let id = SessionId::new();
                let session = self.client.start_session().await.map_err(|err| {
                    event!(Level::ERROR, session_id = %id, error = %err, "store session could not be started");
                    DataError::SessionLifecycle(format!("failed to start session {}: {}", id, err))
                })?;

                let handle = SessionHandle::new(id, session);
                if self
                    .pool
                    .try_register(handle.clone(), self.config.max_sessions)?
                {
                    self.counters.acquired.fetch_add(1, Ordering::SeqCst);
                    event!(Level::INFO, session_id = %id, active = self.pool.len(), "session created");
                    return Ok(handle);
                }

                // Another caller took the last slot between the check and the insert.
                handle.release();
            }

            if start.elapsed() > self.config.acquire_timeout {
                event!(
                    Level::WARN,
                    active = self.pool.len(),
                    timeout_ms = self.config.acquire_timeout.as_millis() as u64,
                    "session pool exhausted"
                );
                return Err(DataError::SessionLifecycle(
                    "session pool timeout: no session slot available".into(),
                ));
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn begin(&self, handle: &SessionHandle<C::Session>) -> Result<()> {
        if let Err(err) = handle.store_session().begin_transaction().await {
            event!(Level::ERROR, session_id = %handle.id(), error = %err, "transaction could not be started");
            return Err(DataError::from_store(
                "session.begin",
                "transaction could not be started",
                &err,
            ));
        }
        handle.transition(SessionState::TransactionActive)
    }

    async fn finish<T>(&self, handle: &SessionHandle<C::Session>, outcome: WorkOutcome<T>) -> Result<T> {
        match outcome {
            WorkOutcome::Completed(Ok(value)) => {
                self.commit(handle).await?;
                Ok(value)
            }
            WorkOutcome::Completed(Err(err)) => {
                event!(Level::DEBUG, session_id = %handle.id(), error = %err, "unit of work failed");
                self.abort(handle).await;
                Err(err)
            }
            WorkOutcome::Panicked(message) => {
                event!(Level::ERROR, session_id = %handle.id(), panic = %message, "unit of work panicked");
                self.abort(handle).await;
                Err(DataError::internal(
                    "session.unit_of_work",
                    "unit of work panicked",
                ))
            }
            WorkOutcome::TimedOut(limit) => {
                event!(
                    Level::WARN,
                    session_id = %handle.id(),
                    timeout_ms = limit.as_millis() as u64,
                    "unit of work timed out"
                );
                self.abort(handle).await;
                Err(DataError::Cancelled(format!(
                    "unit of work exceeded {} ms",
                    limit.as_millis()
                )))
            }
        }
    }

    async fn commit(&self, handle: &SessionHandle<C::Session>) -> Result<()> {
        match handle.store_session().commit_transaction().await {
            Ok(()) => {
                handle.transition(SessionState::Committed)?;
                self.counters.committed.fetch_add(1, Ordering::SeqCst);
                event!(Level::DEBUG, session_id = %handle.id(), "transaction committed");
                Ok(())
            }
            Err(err) => {
                // No abort after a failed commit; release discards whatever is left.
                self.counters.fatal.fetch_add(1, Ordering::SeqCst);
                event!(Level::ERROR, session_id = %handle.id(), fatal = true, error = %err, "transaction commit failed");
                Err(DataError::from_store(
                    "session.commit",
                    "transaction commit failed",
                    &err,
                ))
            }
        }
    }

    async fn abort(&self, handle: &SessionHandle<C::Session>) {
        match handle.store_session().abort_transaction().await {
            Ok(()) => {
                if let Err(err) = handle.transition(SessionState::Aborted) {
                    event!(Level::WARN, session_id = %handle.id(), error = %err, "abort bookkeeping failed");
                }
                self.counters.aborted.fetch_add(1, Ordering::SeqCst);
                event!(Level::DEBUG, session_id = %handle.id(), "transaction aborted");
            }
            Err(err) => {
                self.counters.fatal.fetch_add(1, Ordering::SeqCst);
                event!(Level::ERROR, session_id = %handle.id(), fatal = true, error = %err, "transaction abort failed");
            }
        }
    }
}

impl<C: StoreClient> Clone for SessionManager<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Releases a session on every exit path.
///
/// The manager releases explicitly once the outcome is settled. Dropping an
/// unreleased guard means the unit-of-work future was cancelled; the session
/// is released then, leaving any open transaction to be discarded by the
/// store.
struct ReleaseGuard<S: StoreSession> {
    pool: Arc<SessionPool<S>>,
    handle: Option<SessionHandle<S>>,
}

impl<S: StoreSession> ReleaseGuard<S> {
    fn new(pool: Arc<SessionPool<S>>, handle: SessionHandle<S>) -> Self {
        Self {
            pool,
            handle: Some(handle),
        }
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            Self::release_handle(&self.pool, &handle);
        }
    }

    fn release_handle(pool: &SessionPool<S>, handle: &SessionHandle<S>) {
        let id = handle.id();
        if pool.remove(id).is_none() {
            event!(Level::WARN, session_id = %id, "released session was missing from the pool");
        }
        if handle.release() {
            event!(
                Level::INFO,
                session_id = %id,
                age_ms = handle.age().as_millis() as u64,
                active = pool.len(),
                "session released"
            );
        }
    }
}

impl<S: StoreSession> Drop for ReleaseGuard<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            event!(
                Level::WARN,
                session_id = %handle.id(),
                state = %handle.state(),
                "unit of work dropped before completion; releasing session"
            );
            Self::release_handle(&self.pool, &handle);
        }
    }
}
