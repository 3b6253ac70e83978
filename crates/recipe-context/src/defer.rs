use recipe_core::error::EngineError;
use std::cell::Cell;
use std::sync::Arc;
use thiserror::Error;

thread_local! {
    /// Tracks whether a defer scope is already open on this logical thread.
    /// A defer scope cannot be nested directly inside another (§4.E); this
    /// mirrors the Python original's `MultiException.Builder` guard against
    /// re-entrant aggregation.
    static DEFER_DEPTH: Cell<u32> = const { Cell::new(0) };
}

#[derive(Debug, Error)]
pub enum DeferError {
    #[error("a defer scope is already open on this thread; nested defer scopes are not permitted")]
    AlreadyNested,
}

/// Exactly one of {value, failure}. Accessing `value` on a failure re-raises
/// the captured error rather than returning a default (§3).
#[derive(Debug)]
pub enum DeferredResult<T> {
    Value(T),
    Failure(EngineError),
}

impl<T> DeferredResult<T> {
    /// Returns the value, or re-raises (as an `Err`) the captured failure.
    pub fn value(self) -> Result<T, EngineError> {
        match self {
            DeferredResult::Value(v) => Ok(v),
            DeferredResult::Failure(e) => Err(e),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DeferredResult::Failure(_))
    }
}

/// Accumulates successes and captured step failures across a defer scope
/// (§3). Disposed (consumed) when the scope exits; a non-empty failure list
/// raises a single `AggregatedFailure`.
#[derive(Debug, Default)]
pub struct AggregatedResult<T> {
    pub successes: Vec<T>,
    pub failures: Vec<EngineError>,
    pub contains_infra_failure: bool,
}

impl<T> AggregatedResult<T> {
    fn new() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
            contains_infra_failure: false,
        }
    }

    fn record(&mut self, result: DeferredResult<T>) {
        match result {
            DeferredResult::Value(v) => self.successes.push(v),
            DeferredResult::Failure(e) => {
                self.contains_infra_failure = self.contains_infra_failure || e.is_uncatchable();
                self.failures.push(e);
            }
        }
    }

    /// Raise a single `AggregatedFailure` if any failure was captured;
    /// otherwise consume self silently (§4.E "on scope exit ... otherwise
    /// normal fallthrough").
    fn into_result(self) -> Result<Vec<T>, EngineError> {
        if self.failures.is_empty() {
            Ok(self.successes)
        } else {
            Err(EngineError::AggregatedFailure(self.failures))
        }
    }
}

/// A scope in which step-like failures are captured into an `AggregatedResult`
/// instead of unwinding (§4.E). Construction rejects nesting; the scope is
/// consumed (not dropped implicitly) by `finish`, which is the single point
/// that raises the aggregate failure.
pub struct DeferScope<T> {
    aggregated: AggregatedResult<T>,
}

impl<T> DeferScope<T> {
    pub fn enter() -> Result<Self, DeferError> {
        let already_open = DEFER_DEPTH.with(|d| {
            if d.get() > 0 {
                true
            } else {
                d.set(1);
                false
            }
        });
        if already_open {
            return Err(DeferError::AlreadyNested);
        }
        Ok(Self {
            aggregated: AggregatedResult::new(),
        })
    }

    /// Run a step-like closure inside this scope's own (non-deferring)
    /// sub-scope, capturing any failure into the aggregate rather than
    /// propagating it (§4.E: "runs with its own non-deferring sub-scope so
    /// the failure is attributed to the outer aggregator at most once").
    pub fn run(&mut self, f: impl FnOnce() -> Result<T, EngineError>) {
        let outcome = match f() {
            Ok(v) => DeferredResult::Value(v),
            Err(e) => DeferredResult::Failure(e),
        };
        self.aggregated.record(outcome);
    }

    /// Close the scope, raising a single aggregate failure if any step
    /// failed, or returning the collected successes otherwise.
    pub fn finish(self) -> Result<Vec<T>, EngineError> {
        DEFER_DEPTH.with(|d| d.set(0));
        self.aggregated.into_result()
    }
}

/// Convenience wrapper matching the spec's `map_defer_exceptions`-style call
/// shape: open a scope, run each step-like closure, close it.
pub fn defer<T>(steps: Vec<Box<dyn FnOnce() -> Result<T, EngineError>>>) -> Result<Vec<T>, EngineError> {
    let mut scope = DeferScope::enter().map_err(|e| EngineError::InternalError(e.to_string()))?;
    for step in steps {
        scope.run(step);
    }
    scope.finish()
}

/// Marks a method as participating in defer-aggregation when it is called
/// inside a defer scope. Replaces the original's attribute-walking
/// `infer_composite_step` with an explicit opt-in (§9).
pub trait StepLike {
    fn is_step_like(&self) -> bool {
        true
    }
}

pub type SharedDeferScope<T> = Arc<parking_lot::Mutex<DeferScope<T>>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_step(n: i32) -> Result<i32, EngineError> {
        Ok(n)
    }

    fn failing_step(name: &str, retcode: i32) -> Result<i32, EngineError> {
        Err(EngineError::StepFailure {
            name: name.to_string(),
            retcode,
        })
    }

    #[test]
    fn successful_scope_returns_successes() {
        let mut scope: DeferScope<i32> = DeferScope::enter().unwrap();
        scope.run(|| ok_step(1));
        scope.run(|| ok_step(2));
        assert_eq!(scope.finish().unwrap(), vec![1, 2]);
    }

    #[test]
    fn two_failures_raise_one_aggregate_naming_both() {
        let mut scope: DeferScope<i32> = DeferScope::enter().unwrap();
        scope.run(|| failing_step("A", 1));
        scope.run(|| failing_step("B", 2));
        let err = scope.finish().unwrap_err();
        let message = err.to_string();
        match &err {
            EngineError::AggregatedFailure(inner) => assert_eq!(inner.len(), 2),
            other => panic!("expected AggregatedFailure, got {other:?}"),
        }
        assert!(message.contains('A') && message.contains('1'), "message should name step A: {message}");
        assert!(message.contains('B') && message.contains('2'), "message should name step B: {message}");
    }

    #[test]
    fn nested_defer_scope_is_rejected() {
        let _outer: DeferScope<i32> = DeferScope::enter().unwrap();
        let inner = DeferScope::<i32>::enter();
        assert!(matches!(inner, Err(DeferError::AlreadyNested)));
        _outer.finish().unwrap();
    }

    #[test]
    fn scope_can_reenter_after_finish() {
        let scope: DeferScope<i32> = DeferScope::enter().unwrap();
        scope.finish().unwrap();
        let scope2 = DeferScope::<i32>::enter();
        assert!(scope2.is_ok());
    }

    #[test]
    fn deferred_result_value_reraises_failure() {
        let failure: DeferredResult<i32> = DeferredResult::Failure(EngineError::StepFailure {
            name: "x".into(),
            retcode: 1,
        });
        assert!(failure.value().is_err());
    }
}
