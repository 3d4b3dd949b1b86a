use super::ResponseCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owned background task that periodically evicts expired cache entries.
///
/// The task lives until [`CacheSweeper::stop`] is called or the sweeper is
/// dropped.
#[derive(Debug)]
pub struct CacheSweeper {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    pub fn start<V>(cache: Arc<ResponseCache<V>>, period: Duration) -> Self
    where
        V: Clone + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; nothing can be stale yet.
            interval.tick().await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        let evicted = cache.sweep();
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = cache.len(), "Cache sweep");
                        }
                    }
                }
            }
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(error) = handle.await
        {
            tracing::warn!(%error, "Cache sweeper task ended abnormally");
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
