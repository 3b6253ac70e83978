use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks the scheduler's true-blocking threadpool size. The stream muxer
/// bumps this by two (one reader, one closer) when a pipe close blocks past
/// its guard window, so a leaked child process never deadlocks the rest of
/// the pipeline (§4.B, §4.F).
#[derive(Debug, Clone)]
pub struct ThreadpoolBudget {
    size: Arc<AtomicUsize>,
}

impl ThreadpoolBudget {
    pub fn new(initial: usize) -> Self {
        Self {
            size: Arc::new(AtomicUsize::new(initial)),
        }
    }

    pub fn current(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Grow the budget by `n`. Returns the new size.
    pub fn grow(&self, n: usize) -> usize {
        self.size.fetch_add(n, Ordering::SeqCst) + n
    }
}

impl Default for ThreadpoolBudget {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_leak_penalty() {
        let budget = ThreadpoolBudget::new(4);
        assert_eq!(budget.grow(2), 6);
        assert_eq!(budget.current(), 6);
    }

    #[test]
    fn shared_handle_observes_growth() {
        let budget = ThreadpoolBudget::new(1);
        let clone = budget.clone();
        clone.grow(2);
        assert_eq!(budget.current(), 3);
    }
}
