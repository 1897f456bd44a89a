//! Work that outlives the response.
//!
//! Cache writes are scheduled here rather than awaited, so the client
//! response never waits on them.

use std::sync::Mutex;

use futures::future::BoxFuture;

/// A detached unit of work.
pub type BackgroundTask = BoxFuture<'static, ()>;

/// Somewhere to hand detached work.
pub trait BackgroundTasks: Send + Sync {
    fn spawn(&self, task: BackgroundTask);
}

/// Queues tasks until the host drains them.
///
/// Used where the runtime has no executor of its own: the component
/// returns its response first, then calls [`DeferredTasks::drain`].
#[derive(Default)]
pub struct DeferredTasks {
    pending: Mutex<Vec<BackgroundTask>>,
}

impl DeferredTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Run every queued task to completion, including tasks queued while
    /// draining.
    pub async fn drain(&self) {
        loop {
            let batch = match self.pending.lock() {
                Ok(mut pending) => std::mem::take(&mut *pending),
                Err(_) => return,
            };
            if batch.is_empty() {
                return;
            }
            futures::future::join_all(batch).await;
        }
    }
}

impl BackgroundTasks for DeferredTasks {
    fn spawn(&self, task: BackgroundTask) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use futures::FutureExt;

    use super::*;

    #[tokio::test]
    async fn test_deferred_runs_only_on_drain() {
        let tasks = DeferredTasks::new();
        let ran = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let ran = ran.clone();
            tasks.spawn(
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                }
                .boxed(),
            );
        }

        assert_eq!(tasks.pending(), 3);
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        tasks.drain().await;

        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_drain_runs_nested_tasks() {
        let tasks = Arc::new(DeferredTasks::new());
        let ran = Arc::new(AtomicU32::new(0));

        let inner_tasks = tasks.clone();
        let inner_ran = ran.clone();
        tasks.spawn(
            async move {
                let ran = inner_ran.clone();
                inner_tasks.spawn(
                    async move {
                        ran.fetch_add(1, Ordering::SeqCst);
                    }
                    .boxed(),
                );
            }
            .boxed(),
        );

        tasks.drain().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
