//! Runs a single generated test case against the simulation step runner and
//! reconciles its result against the recorded expectation file (§4.G/§4.H
//! meeting §4.I). One call here is one unit of work the pool hands to a
//! worker task.

use crate::expectation::{self, ExpectationRecord};
use recipe_core::test_model::{CoverageFragment, TestDescription, TestDiagnostic, TestOutcome};
use recipe_engine::{Engine, Recipe, RecipeApi, SimulationStepRunner, TestCase};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Run,
    Train,
}

pub struct CaseResult {
    pub outcome: TestOutcome,
    pub coverage: CoverageFragment,
    pub expectation_path: PathBuf,
}

/// Runs `test_case` under `recipe`, then compares the steps actually run
/// against the recorded expectation: `Written` on first creation in train
/// mode, `Diff` on a mismatch in run mode, `Removed` never happens here (a
/// property of the pool-level reconciliation pass, not a single test run).
pub async fn run_case(recipe: &Recipe, test_case: &TestCase, mode: Mode, expectation_dir: &std::path::Path) -> CaseResult {
    let description = TestDescription::new(recipe.name.clone(), test_case.name.clone());
    let expectation_path = expectation_dir.join(&test_case.expect_file);

    let runner = Arc::new(SimulationStepRunner::new(
        recipe.name.clone(),
        test_case.name.clone(),
        test_case.test_data.clone(),
    ));
    let mut engine = Engine::new_simulated(runner.clone());

    let (_, uncaught) = engine.run_steps(recipe).await;

    let mut coverage = CoverageFragment::new();
    coverage.record_hit(&recipe.name, 0);

    let actual = ExpectationRecord::new(runner.steps_ran(), runner.annotations());

    let diagnostic = match uncaught {
        Some(e) => match e.downcast_ref::<recipe_core::error::EngineError>() {
            Some(recipe_core::error::EngineError::BadTest { .. }) => TestDiagnostic::BadTest(e.to_string()),
            Some(err) if err.is_uncatchable() => TestDiagnostic::CrashMismatch(e.to_string()),
            _ => TestDiagnostic::CrashMismatch(e.to_string()),
        },
        None => reconcile(&expectation_path, &actual, mode),
    };

    CaseResult {
        outcome: TestOutcome::new(description, diagnostic),
        coverage,
        expectation_path,
    }
}

fn reconcile(path: &std::path::Path, actual: &ExpectationRecord, mode: Mode) -> TestDiagnostic {
    let existing = expectation::load(path).unwrap_or(None);

    match (mode, &existing) {
        (Mode::Train, Some(recorded)) if recorded == actual => TestDiagnostic::Success,
        (Mode::Train, _) => match expectation::write_atomic(path, actual) {
            Ok(()) => TestDiagnostic::Written,
            Err(e) => TestDiagnostic::InternalError(e.to_string()),
        },
        (Mode::Run, Some(recorded)) if recorded == actual => TestDiagnostic::Success,
        (Mode::Run, Some(_)) => TestDiagnostic::Diff(format!("expectation mismatch at {}", path.display())),
        (Mode::Run, None) => TestDiagnostic::Diff(format!("missing expectation file {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recipe_core::step::{ExecutionResult, StepConfig};
    use recipe_engine::{RecipeLogic, TestData};
    use recipe_core::path::Path as RecipePath;

    struct OneStep;

    #[async_trait(?Send)]
    impl RecipeLogic for OneStep {
        async fn run_steps(&self, api: &mut dyn RecipeApi) -> anyhow::Result<()> {
            api.step(StepConfig::new(vec!["build".into()], vec!["build.sh".into()])).await?;
            Ok(())
        }

        fn gen_tests(&self) -> Vec<TestCase> {
            vec![TestCase::new(
                "basic",
                "basic.json",
                TestData::new().with_step(&["build"], ExecutionResult::success(0), vec!["ok".into()]),
            )]
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn train_mode_writes_new_expectation() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = Recipe::new("foo", Arc::new(OneStep), RecipePath::new("/expect/foo"));
        let test_case = recipe.gen_tests().remove(0);

        let result = run_case(&recipe, &test_case, Mode::Train, dir.path()).await;
        assert_eq!(result.outcome.diagnostic, TestDiagnostic::Written);
        assert!(result.expectation_path.exists());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn run_mode_succeeds_against_matching_expectation() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = Recipe::new("foo", Arc::new(OneStep), RecipePath::new("/expect/foo"));
        let test_case = recipe.gen_tests().remove(0);

        let _ = run_case(&recipe, &test_case, Mode::Train, dir.path()).await;
        let result = run_case(&recipe, &test_case, Mode::Run, dir.path()).await;
        assert_eq!(result.outcome.diagnostic, TestDiagnostic::Success);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn run_mode_reports_diff_when_no_expectation_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = Recipe::new("foo", Arc::new(OneStep), RecipePath::new("/expect/foo"));
        let test_case = recipe.gen_tests().remove(0);

        let result = run_case(&recipe, &test_case, Mode::Run, dir.path()).await;
        assert!(matches!(result.outcome.diagnostic, TestDiagnostic::Diff(_)));
    }
}
