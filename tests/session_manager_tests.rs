/// Session manager tests
///
/// Commit/abort exactly-once, release on every exit path, pool limits and
/// the blocking forms.
/// Run with: cargo test --test session_manager_tests
use docsession::{
    CollectionProvider, DataError, Document, Filter, FindOptions, MemoryStore, SessionConfig,
    SessionManager, SessionState, StoreOp,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
struct LedgerEntry {
    #[document(key)]
    id: u64,
    amount: i64,
}

fn entry(id: u64, amount: i64) -> LedgerEntry {
    LedgerEntry { id, amount }
}

fn manager_for(store: &MemoryStore) -> SessionManager<MemoryStore> {
    SessionManager::new(Arc::new(store.clone()))
}

#[test]
fn test_derived_collection_name_is_snake_case() {
    assert_eq!(LedgerEntry::COLLECTION, "ledger_entry");
    assert_eq!(LedgerEntry::KEY_FIELD, "id");
}

#[tokio::test]
async fn test_failure_aborts_and_pool_size_is_restored() {
    let store = MemoryStore::new();
    let manager = manager_for(&store);
    let before = manager.active_sessions();

    let result: Result<(), DataError> = manager
        .transaction(|_| async { Err(DataError::OperationFailed("rejected".into())) })
        .await;

    assert!(result.unwrap_err().is_operation_failed());
    assert_eq!(manager.active_sessions(), before);
    let stats = store.stats();
    assert_eq!((stats.commits, stats.aborts), (0, 1));
    assert_eq!(stats.sessions_started, stats.sessions_released);
}

#[tokio::test]
async fn test_panic_becomes_internal_error() {
    let store = MemoryStore::new();
    let manager = manager_for(&store);

    let err = manager
        .execute(|_| async { panic!("unit of work blew up") })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DataError::internal("session.unit_of_work", "unit of work panicked")
    );
    assert_eq!(manager.active_sessions(), 0);
    assert_eq!(store.stats().aborts, 1);
    assert_eq!(store.stats().sessions_released, 1);
}

#[test]
fn test_panic_in_blocking_form_becomes_internal_error() {
    let store = MemoryStore::new();
    let manager = manager_for(&store);

    let err = manager
        .execute_blocking(|_| panic!("sync unit of work blew up"))
        .unwrap_err();

    assert!(err.is_internal());
    assert_eq!(manager.active_sessions(), 0);
    assert_eq!(store.stats().aborts, 1);
}

#[test]
fn test_blocking_forms_commit_and_abort() {
    let store = MemoryStore::new();
    let manager = manager_for(&store);
    let ledger = CollectionProvider::new(store.collection::<LedgerEntry>());

    let total = manager
        .transaction_blocking(|session| {
            let entries = ledger.blocking();
            entries.insert_many(vec![entry(1, 10), entry(2, 20)], Some(&session))?;
            let found = entries.find(&[], FindOptions::default(), Some(&session))?;
            Ok(found.iter().map(|e| e.amount).sum::<i64>())
        })
        .unwrap();
    assert_eq!(total, 30);

    let err = manager
        .execute_blocking(|session| {
            ledger.blocking().delete_many(&Filter::All, Some(&session))?;
            Err(DataError::OperationFailed("keep the ledger".into()))
        })
        .unwrap_err();
    assert!(err.is_operation_failed());

    assert_eq!(ledger.blocking().count(&[], None).unwrap(), 2);
    let stats = store.stats();
    assert_eq!((stats.commits, stats.aborts), (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_form_inside_runtime() {
    let store = MemoryStore::new();
    let manager = manager_for(&store);
    let ledger = CollectionProvider::new(store.collection::<LedgerEntry>());

    manager
        .execute_blocking(|session| {
            ledger
                .blocking()
                .upsert(entry(7, 70), &Filter::eq("id", 7u32), Some(&session))
                .map(|_| ())
        })
        .unwrap();

    assert_eq!(ledger.count(&[], None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_transaction_timeout_cancels_and_aborts() {
    let store = MemoryStore::new();
    let manager = SessionManager::with_config(
        Arc::new(store.clone()),
        SessionConfig::new().transaction_timeout(Duration::from_millis(20)),
    )
    .unwrap();

    let err = manager
        .execute(|_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(store.stats().aborts, 1);
    assert_eq!(manager.active_sessions(), 0);
}

#[tokio::test]
async fn test_dropped_future_still_releases_session() {
    let store = MemoryStore::new();
    let manager = manager_for(&store);

    let pending = manager.execute(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(20), pending).await;

    assert!(timed_out.is_err());
    assert_eq!(manager.active_sessions(), 0);
    let stats = store.stats();
    assert_eq!(stats.sessions_released, 1);
    assert_eq!((stats.commits, stats.aborts), (0, 0));
}

#[tokio::test]
async fn test_max_sessions_waits_then_times_out() {
    let store = MemoryStore::new();
    let manager = Arc::new(
        SessionManager::with_config(
            Arc::new(store.clone()),
            SessionConfig::new()
                .max_sessions(1)
                .acquire_timeout(Duration::from_millis(50)),
        )
        .unwrap(),
    );

    let holder = Arc::clone(&manager);
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let (started_in, release_in) = (Arc::clone(&started), Arc::clone(&release));
    let task = tokio::spawn(async move {
        holder
            .execute(|_| async move {
                started_in.wait().await;
                release_in.wait().await;
                Ok(())
            })
            .await
    });

    started.wait().await;
    let err = manager.execute(|_| async { Ok(()) }).await.unwrap_err();
    assert!(matches!(err, DataError::SessionLifecycle(_)));

    release.wait().await;
    task.await.unwrap().unwrap();
    assert_eq!(manager.active_sessions(), 0);
    manager.execute(|_| async { Ok(()) }).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_units_of_work_each_commit_once() {
    let store = MemoryStore::new();
    let manager = Arc::new(manager_for(&store));
    let ledger = Arc::new(CollectionProvider::new(store.collection::<LedgerEntry>()));

    let mut handles = Vec::new();
    for id in 0..16u64 {
        let manager = Arc::clone(&manager);
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            manager
                .execute(|session| async move {
                    assert_eq!(session.state(), SessionState::TransactionActive);
                    ledger.insert(entry(id, id as i64), Some(&session)).await?;
                    Ok(())
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = store.stats();
    assert_eq!(stats.commits, 16);
    assert_eq!(stats.aborts, 0);
    assert_eq!(stats.sessions_released, 16);
    assert_eq!(manager.active_sessions(), 0);
    assert_eq!(ledger.count(&[], None).await.unwrap(), 16);
}

#[tokio::test]
async fn test_commit_failure_never_aborts() {
    let store = MemoryStore::new();
    store.fail_next(StoreOp::Commit);
    let manager = manager_for(&store);
    let ledger = CollectionProvider::new(store.collection::<LedgerEntry>());

    let err = manager
        .execute(|session| {
            let ledger = &ledger;
            async move {
                ledger.insert(entry(1, 1), Some(&session)).await?;
                Ok(())
            }
        })
        .await
        .unwrap_err();

    assert!(err.is_internal());
    assert_eq!(store.stats().aborts, 0);
    assert_eq!(store.document_count("ledger_entry").await, 0);
    assert_eq!(manager.stats().fatal, 1);
}

#[tokio::test]
async fn test_stats_track_outcomes() {
    let store = MemoryStore::new();
    let manager = manager_for(&store);

    manager.execute(|_| async { Ok(()) }).await.unwrap();
    let _ = manager
        .execute(|_| async { Err(DataError::NotFound) })
        .await;

    let stats = manager.stats();
    assert_eq!(stats.acquired, 2);
    assert_eq!(stats.committed, 1);
    assert_eq!(stats.aborted, 1);
    assert_eq!(stats.active_sessions, 0);
    assert!(stats.to_string().contains("1 committed"));
}
