use thiserror::Error;

/// Flat taxonomy of every failure kind the engine can produce (§7). One enum
/// per subsystem rather than a deep hierarchy, mirroring the convention used
/// for process exit-code errors elsewhere in this stack.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("step '{name}' failed with retcode {retcode}")]
    StepFailure { name: String, retcode: i32 },

    #[error("step '{name}' warned with retcode {retcode}")]
    StepWarning { name: String, retcode: i32 },

    #[error("infra failure in step '{name}': {reason}")]
    InfraFailure { name: String, reason: String },

    #[error("{} step(s) failed in deferred scope: {}", .0.len(), describe_aggregated(.0))]
    AggregatedFailure(Vec<EngineError>),

    #[error("bad test '{test_name}' in recipe '{recipe_name}': {reason}")]
    BadTest {
        recipe_name: String,
        test_name: String,
        reason: String,
    },

    #[error("recipe '{recipe_name}' test '{test_name}' raised an unmodelled exception: {reason}")]
    CrashMismatch {
        recipe_name: String,
        test_name: String,
        reason: String,
    },

    #[error("internal engine error: {0}")]
    InternalError(String),
}

/// Renders each inner failure as "name (retcode N)" where it has both, or
/// its own Display otherwise, joined for the `AggregatedFailure` message so
/// a deferred-scope failure names every step that failed, not just a count.
fn describe_aggregated(failures: &[EngineError]) -> String {
    failures
        .iter()
        .map(|failure| match failure {
            EngineError::StepFailure { name, retcode } | EngineError::StepWarning { name, retcode } => {
                format!("{name} (retcode {retcode})")
            }
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl EngineError {
    /// Timeouts and cancellations are always infra failures (§5, §7).
    pub fn infra(name: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InfraFailure {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for the kinds that recipe code cannot catch and turn into success.
    pub fn is_uncatchable(&self) -> bool {
        matches!(self, EngineError::InfraFailure { .. } | EngineError::InternalError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infra_failure_is_uncatchable() {
        let err = EngineError::infra("build", "timeout");
        assert!(err.is_uncatchable());
    }

    #[test]
    fn step_failure_is_catchable() {
        let err = EngineError::StepFailure {
            name: "build".into(),
            retcode: 1,
        };
        assert!(!err.is_uncatchable());
    }

    #[test]
    fn aggregated_failure_names_every_inner_step_with_its_retcode() {
        let err = EngineError::AggregatedFailure(vec![
            EngineError::StepFailure { name: "a".into(), retcode: 1 },
            EngineError::StepFailure { name: "b".into(), retcode: 2 },
        ]);
        assert_eq!(
            err.to_string(),
            "2 step(s) failed in deferred scope: a (retcode 1), b (retcode 2)"
        );
    }
}
