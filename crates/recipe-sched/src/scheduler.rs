use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinHandle, LocalSet};
use tokio_util::sync::CancellationToken;

use crate::threadpool_budget::ThreadpoolBudget;

/// A handle to a task spawned on the scheduler. `kill` raises a cancellation
/// inside the task at its next suspension point rather than aborting
/// immediately, so the task gets a chance to convert the cancellation into a
/// best-effort cleanup (§4.F).
pub struct TaskHandle<T> {
    join: JoinHandle<T>,
    cancel: CancellationToken,
}

impl<T> TaskHandle<T> {
    /// Request cancellation. The task observes this at its next suspension
    /// point via the `CancellationToken` it was spawned with.
    pub fn kill(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> Result<T, tokio::task::JoinError> {
        self.join.await
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// The cooperative scheduler for one worker process: a single-threaded
/// `tokio` runtime plus a `LocalSet`, so `!Send` step-local state never
/// crosses a thread boundary (§5's Open-Question resolution).
pub struct Scheduler {
    local: LocalSet,
    budget: ThreadpoolBudget,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            local: LocalSet::new(),
            budget: ThreadpoolBudget::default(),
        }
    }

    pub fn budget(&self) -> ThreadpoolBudget {
        self.budget.clone()
    }

    /// Spawn a task on the local set. The returned token is handed to the
    /// task body; callers check it at suspension points to honor `kill`.
    pub fn spawn<F, T>(&self, f: impl FnOnce(CancellationToken) -> F + 'static) -> TaskHandle<T>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let cancel = CancellationToken::new();
        let join = self.local.spawn_local(f(cancel.clone()));
        TaskHandle { join, cancel }
    }

    /// Run the scheduler's local tasks to completion on the current thread.
    pub async fn run_until<F: Future>(&self, f: F) -> F::Output {
        self.local.run_until(f).await
    }

    /// Cooperatively yield control back to the scheduler.
    pub async fn yield_now() {
        tokio::task::yield_now().await;
    }

    /// A scoped resource whose interior races against a duration; on expiry
    /// the interior future is dropped and `Err(Elapsed)` is returned (§4.F).
    pub async fn timeout<F: Future>(duration: Duration, f: F) -> Result<F::Output, Elapsed> {
        tokio::time::timeout(duration, f).await.map_err(|_| Elapsed)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation timed out")]
pub struct Elapsed;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn spawned_task_runs_to_completion() {
        let scheduler = Scheduler::new();
        let handle = scheduler.spawn(|_cancel| async { 42 });
        let result = scheduler.run_until(handle.wait()).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn kill_signals_cancellation_token() {
        let scheduler = Scheduler::new();
        let handle = scheduler.spawn(|cancel| async move {
            cancel.cancelled().await;
            "cancelled"
        });
        handle.kill();
        let result = scheduler.run_until(handle.wait()).await.unwrap();
        assert_eq!(result, "cancelled");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn timeout_elapses_on_slow_future() {
        let result = Scheduler::timeout(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn timeout_completes_on_fast_future() {
        let result = Scheduler::timeout(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
