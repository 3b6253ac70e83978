//! The machine-readable report emitted via `--json` (§6).

use crate::coverage::CoverageReport;
use recipe_core::test_model::{TestDescription, TestDiagnostic};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct TestResultJson {
    pub recipe_name: String,
    pub test_name: String,
    pub outcome: &'static str,
    pub detail: Option<String>,
}

impl TestResultJson {
    pub fn from_parts(description: &TestDescription, diagnostic: &TestDiagnostic) -> Self {
        let (outcome, detail) = match diagnostic {
            TestDiagnostic::InternalError(msg) => ("internal_error", Some(msg.clone())),
            TestDiagnostic::BadTest(msg) => ("bad_test", Some(msg.clone())),
            TestDiagnostic::CrashMismatch(msg) => ("crash_mismatch", Some(msg.clone())),
            TestDiagnostic::Check(msg) => ("check", Some(msg.clone())),
            TestDiagnostic::Diff(msg) => ("diff", Some(msg.clone())),
            TestDiagnostic::Removed => ("removed", None),
            TestDiagnostic::Written => ("written", None),
            TestDiagnostic::Success => ("success", None),
        };
        Self {
            recipe_name: description.recipe_name.clone(),
            test_name: description.test_name.clone(),
            outcome,
            detail,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeReport {
    pub test_results: Vec<TestResultJson>,
    pub uncovered_modules: Vec<String>,
    pub unused_expectation_files: Vec<PathBuf>,
    pub coverage_percent: f64,
}

impl OutcomeReport {
    pub fn new(
        test_results: Vec<TestResultJson>,
        coverage: CoverageReport,
        unused_expectation_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            test_results,
            uncovered_modules: coverage.uncovered_modules,
            unused_expectation_files,
            coverage_percent: coverage.percent,
        }
    }

    /// Any failing test result or incomplete coverage fails the overall run
    /// (§6 exit codes).
    pub fn is_success(&self) -> bool {
        self.test_results.iter().all(|r| !matches!(r.outcome, "internal_error" | "bad_test" | "crash_mismatch" | "check" | "diff"))
            && self.uncovered_modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_result_serializes_without_detail() {
        let description = TestDescription::new("foo", "basic");
        let result = TestResultJson::from_parts(&description, &TestDiagnostic::Success);
        assert_eq!(result.outcome, "success");
        assert!(result.detail.is_none());
    }

    #[test]
    fn report_is_unsuccessful_when_any_test_fails() {
        let description = TestDescription::new("foo", "basic");
        let ok = TestResultJson::from_parts(&description, &TestDiagnostic::Success);
        let bad = TestResultJson::from_parts(&description, &TestDiagnostic::Diff("mismatch".into()));
        let report = OutcomeReport::new(
            vec![ok, bad],
            CoverageReport { percent: 100.0, uncovered_modules: vec![] },
            vec![],
        );
        assert!(!report.is_success());
    }

    #[test]
    fn report_is_unsuccessful_when_coverage_incomplete() {
        let description = TestDescription::new("foo", "basic");
        let ok = TestResultJson::from_parts(&description, &TestDiagnostic::Success);
        let report = OutcomeReport::new(
            vec![ok],
            CoverageReport { percent: 50.0, uncovered_modules: vec!["bar.rs".into()] },
            vec![],
        );
        assert!(!report.is_success());
    }
}
