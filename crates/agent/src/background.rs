//! Fire-and-forget work that outlives the request.
//!
//! A `BackgroundTask` is best-effort and unordered relative to later
//! turns. Dropping the handle detaches the task; it is never cancelled.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug)]
pub struct BackgroundTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `work` on the current runtime.
    pub fn spawn<F>(name: &'static str, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            handle: tokio::spawn(work),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for completion. For tests and graceful shutdown only; the
    /// response path never waits.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            warn!(task = self.name, error = %e, "Background task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test]
    async fn wait_observes_completion() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let task = BackgroundTask::spawn("flag", async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(task.name(), "flag");
        task.wait().await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropping_the_handle_does_not_cancel() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let task = BackgroundTask::spawn("detached", async move {
            tokio::task::yield_now().await;
            let _ = tx.send(42);
        });
        drop(task);
        assert_eq!(rx.await.unwrap(), 42);
    }
}
