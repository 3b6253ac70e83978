//! Terminal reporting (§4.J): a glyph per test in the default mode, a
//! `name ... ok|FAIL (reason)` line per test in verbose mode, and a final
//! summary covering coverage and expectation-file cleanup.

use crate::outcome::OutcomeReport;
use recipe_core::test_model::TestDiagnostic;
use std::time::Duration;

/// Glyph selection is a fixed priority order, not declaration order of a
/// map: the first diagnostic kind that applies wins (§4.J).
fn glyph(diagnostic: &TestDiagnostic) -> char {
    match diagnostic {
        TestDiagnostic::InternalError(_) => 'E',
        TestDiagnostic::BadTest(_) => 'B',
        TestDiagnostic::CrashMismatch(_) => 'X',
        TestDiagnostic::Check(_) => 'C',
        TestDiagnostic::Diff(_) => 'D',
        TestDiagnostic::Removed => 'R',
        TestDiagnostic::Written => 'W',
        TestDiagnostic::Success => '.',
    }
}

pub struct Reporter {
    verbose: bool,
    detail: Vec<String>,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, detail: Vec::new() }
    }

    /// Appends one line (glyph stream or verbose line) to the reporter's
    /// running transcript, and records a detail line for any failing test.
    pub fn record(&mut self, full_test_name: &str, diagnostic: &TestDiagnostic) -> String {
        if diagnostic.is_failure() {
            self.detail.push(format!("{full_test_name}: {}", describe(diagnostic)));
        }

        if self.verbose {
            let status = if diagnostic.is_failure() {
                format!("FAIL ({})", describe(diagnostic))
            } else {
                "ok".to_string()
            };
            format!("{full_test_name} ... {status}")
        } else {
            glyph(diagnostic).to_string()
        }
    }

    pub fn detail_lines(&self) -> &[String] {
        &self.detail
    }

    /// Renders the final report: a coverage line, the elapsed-time line, any
    /// uncovered modules, any unused expectation files, and a hint to run
    /// train mode if expectations need updating.
    pub fn final_report(&self, report: &OutcomeReport, elapsed: Duration, train_hint: bool) -> String {
        let mut lines = Vec::new();

        if !self.detail.is_empty() {
            lines.push(String::new());
            lines.extend(self.detail.iter().cloned());
        }

        lines.push(String::new());
        lines.push(format!("Ran {} tests in {:.2}s", report.test_results.len(), elapsed.as_secs_f64()));
        lines.push(format!("coverage: {:.1}%", report.coverage_percent));

        if !report.uncovered_modules.is_empty() {
            lines.push(format!("uncovered modules: {}", report.uncovered_modules.join(", ")));
        }
        if !report.unused_expectation_files.is_empty() {
            let names: Vec<String> = report.unused_expectation_files.iter().map(|p| p.display().to_string()).collect();
            lines.push(format!("unused expectation files: {}", names.join(", ")));
        }

        if !report.is_success() && train_hint {
            lines.push("re-run with `test train` to update recorded expectations".to_string());
        }

        lines.join("\n")
    }
}

fn describe(diagnostic: &TestDiagnostic) -> String {
    match diagnostic {
        TestDiagnostic::InternalError(msg) => format!("internal error: {msg}"),
        TestDiagnostic::BadTest(msg) => format!("bad test: {msg}"),
        TestDiagnostic::CrashMismatch(msg) => format!("crash mismatch: {msg}"),
        TestDiagnostic::Check(msg) => format!("check failed: {msg}"),
        TestDiagnostic::Diff(msg) => format!("diff: {msg}"),
        TestDiagnostic::Removed => "removed".to_string(),
        TestDiagnostic::Written => "written".to_string(),
        TestDiagnostic::Success => "ok".to_string(),
    }
}
