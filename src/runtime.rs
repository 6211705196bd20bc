//! Bridge from synchronous callers onto the async core.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::core::{DataError, Result};

static FALLBACK: OnceLock<std::result::Result<Runtime, String>> = OnceLock::new();

fn fallback_runtime() -> Result<&'static Runtime> {
    FALLBACK
        .get_or_init(|| {
            Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .thread_name("docsession-blocking")
                .build()
                .map_err(|err| err.to_string())
        })
        .as_ref()
        .map_err(|err| DataError::internal("runtime.start", err.clone()))
}

/// Drives `future` to completion from synchronous code.
///
/// Inside a multi-thread runtime the current worker is handed over with
/// `block_in_place`. A current-thread runtime cannot be blocked from within,
/// so the future is driven on a helper thread instead. Outside any runtime a
/// private single-worker runtime, shared by all blocking callers, is used.
pub(crate) fn block_on<F>(future: F) -> Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| fallback_runtime().map(|runtime| runtime.block_on(future)))
                .join()
                .map_err(|_| DataError::internal("runtime.block_on", "blocking helper thread panicked"))?
        }),
        Err(_) => Ok(fallback_runtime()?.block_on(future)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_without_runtime() {
        let value = block_on(async { 21 * 2 }).unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_inside_multi_thread_runtime() {
        let value = block_on(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            "done"
        })
        .unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_block_on_inside_current_thread_runtime() {
        let value = block_on(async { vec![1, 2, 3].len() }).unwrap();
        assert_eq!(value, 3);
    }
}
