//! Per-screen task scope
//!
//! Every subscription a screen starts (the view model, picker sessions,
//! pending saves and prompts) runs as a task registered here. Tearing the
//! scope down cancels all of them at once. Cancelling a task drops its
//! future, which is what dismisses any prompt it was still waiting on.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Default)]
pub struct TaskScope {
    closed: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn handles(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `fut` as a task owned by this scope
    ///
    /// Returns false, without spawning, once the scope has been shut down.
    pub fn spawn<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            debug!("Scope closed, not spawning task");
            return false;
        }

        let mut handles = self.handles();
        handles.retain(|handle| !handle.is_finished());
        handles.push(tokio::spawn(fut));
        true
    }

    /// Number of tasks still running
    pub fn active(&self) -> usize {
        self.handles()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Abort every task without waiting for them to unwind
    pub fn cancel(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for handle in self.handles().iter() {
            handle.abort();
        }
    }

    /// Abort every task and wait until each one has been dropped
    pub async fn shutdown(&self) {
        self.cancel();
        let handles: Vec<_> = self.handles().drain(..).collect();
        let count = handles.len();
        for handle in handles {
            // Cancelled and finished tasks both resolve; nothing to report
            let _ = handle.await;
        }
        debug!(tasks = count, "Scope shut down");
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_shutdown_drops_pending_tasks() {
        let scope = TaskScope::new();
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(dropped.clone());

        scope.spawn(async move {
            let _flag = flag;
            std::future::pending::<()>().await;
        });
        assert_eq!(scope.active(), 1);

        scope.shutdown().await;

        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(scope.active(), 0);
    }

    #[tokio::test]
    async fn test_spawn_after_shutdown_is_refused() {
        let scope = TaskScope::new();
        scope.shutdown().await;

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let spawned = scope.spawn(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!spawned);
        tokio::task::yield_now().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_tasks_are_pruned() {
        let scope = TaskScope::new();
        scope.spawn(async {});
        tokio::time::sleep(Duration::from_millis(1)).await;

        scope.spawn(std::future::pending());

        assert_eq!(scope.active(), 1);
        assert_eq!(scope.handles().len(), 1);
    }

    #[tokio::test]
    async fn test_drop_cancels_tasks() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(dropped.clone());
        {
            let scope = TaskScope::new();
            scope.spawn(async move {
                let _flag = flag;
                std::future::pending::<()>().await;
            });
        }

        // Aborted tasks are dropped the next time the runtime gets control
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(dropped.load(Ordering::SeqCst));
    }
}
