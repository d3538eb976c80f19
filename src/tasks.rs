//! Cancellable delayed work.
//!
//! Every delay or poll the guide schedules is spawned through a [`TaskGroup`]
//! and can be aborted. A newer step selection cancels the group holding the
//! previous selection's pending checks, so a stale highlight can never fire
//! after the user has moved on.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to one spawned piece of delayed work.
#[derive(Debug)]
pub struct TaskHandle {
    label: &'static str,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn `future` on the runtime.
    pub fn spawn<F>(label: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            label,
            handle: tokio::spawn(future),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task. A no-op once it has finished.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            debug!(task = self.label, "Cancelling scheduled task");
            self.handle.abort();
        }
    }
}

/// A set of tasks cancelled together.
#[derive(Debug, Default)]
pub struct TaskGroup {
    tasks: Mutex<Vec<TaskHandle>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` into the group. Finished tasks are pruned on the way.
    pub fn spawn<F>(&self, label: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(TaskHandle::spawn(label, future));
    }

    /// Abort every task in the group. Returns how many were still running.
    pub fn cancel_all(&self) -> usize {
        let tasks: Vec<TaskHandle> = self.lock().drain(..).collect();
        let running = tasks.iter().filter(|t| !t.is_finished()).count();
        for task in &tasks {
            task.cancel();
        }
        running
    }

    /// Number of tasks not yet finished.
    pub fn pending(&self) -> usize {
        self.lock().iter().filter(|t| !t.is_finished()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TaskHandle>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn cancelled_tasks_never_run() {
        let group = TaskGroup::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let fired = Arc::clone(&fired);
            group.spawn("delayed", async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(group.pending(), 3);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(group.cancel_all(), 3);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(group.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_tasks_are_pruned() {
        let group = TaskGroup::new();
        group.spawn("quick", async {});
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(group.pending(), 0);
        assert_eq!(group.cancel_all(), 0);
    }
}
