//! Test worker pool driver (§4.I): expands every registered recipe's
//! generated test cases into a work queue, filters it, then runs jobs with
//! `worker_count` workers draining the queue concurrently. Concurrency here
//! is cooperative (interleaved `.await` points on one thread, per §5), not
//! OS parallelism: the "queue" is an unbounded channel and the "workers" are
//! futures polled together, not spawned OS tasks.

use crate::case_runner::{self, CaseResult, Mode};
use crate::coverage::{compute_report, CoverageRequirement};
use crate::expectation;
use crate::filter::FilterMatchers;
use crate::outcome::{OutcomeReport, TestResultJson};
use recipe_core::test_model::{CoverageFragment, TestDescription, TestDiagnostic};
use recipe_engine::{Recipe, RecipeDeps, TestCase};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

pub struct PoolConfig {
    pub mode: Mode,
    pub worker_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { mode: Mode::Run, worker_count: 4 }
    }
}

struct Job<'a> {
    recipe: &'a Recipe,
    test_case: TestCase,
}

/// One entry on the description queue: a real job, or a poison pill telling
/// the worker that dequeues it to retire (§4.I points 3-4).
enum QueueItem<'a> {
    Job(Job<'a>),
    Poison,
}

/// One message on the outcome channel: a finished case, or a worker
/// announcing it drained its poison pill and is retiring (§4.I points 5-6,
/// §8 invariant 7: after N tests there are exactly N case messages plus one
/// retirement message per worker).
enum OutcomeMessage {
    Case(CaseResult),
    WorkerRetired,
}

/// Runs every test case selected by `filter`, then reconciles coverage and
/// expectation files. A non-empty filter disables the coverage gate and
/// unused-expectation-file cleanup, since neither is meaningful over a
/// partial run (§4.I).
pub async fn run_pool(deps: &RecipeDeps, filter: &FilterMatchers, config: &PoolConfig) -> OutcomeReport {
    tracing::info!(workers = config.worker_count, full_run = filter.is_unfiltered(), "starting test pool run");
    let is_full_run = filter.is_unfiltered();

    let mut jobs: Vec<Job> = Vec::new();
    let mut bad_tests: Vec<TestResultJson> = Vec::new();
    let mut requirement = CoverageRequirement::new();
    let mut visited_dirs: BTreeSet<PathBuf> = BTreeSet::new();

    for recipe in deps.main_repo.recipes() {
        requirement.require(recipe.name.clone());
        if !filter.matches_recipe(&recipe.name) {
            continue;
        }
        visited_dirs.insert(recipe.expectation_dir.to_path_buf());

        let tests = recipe.gen_tests();
        if let Some(reason) = duplicate_reason(&tests) {
            bad_tests.push(TestResultJson::from_parts(
                &TestDescription::new(recipe.name.clone(), "gen_tests".to_string()),
                &TestDiagnostic::BadTest(reason),
            ));
            continue;
        }

        for test_case in tests {
            let full_name = format!("{}.{}", recipe.name, test_case.name);
            if filter.matches_test(&full_name) {
                jobs.push(Job { recipe, test_case });
            }
        }
    }

    let total_jobs = jobs.len();
    let worker_count = config.worker_count.max(1);

    // Unbounded description queue: every job goes in, then one poison pill
    // per worker so each worker knows exactly when to retire (§4.I point 4).
    let (desc_tx, desc_rx) = mpsc::unbounded_channel::<QueueItem>();
    for job in jobs {
        desc_tx.send(QueueItem::Job(job)).ok();
        tokio::task::yield_now().await;
    }
    for _ in 0..worker_count {
        desc_tx.send(QueueItem::Poison).ok();
    }
    drop(desc_tx);

    let shared_rx = Rc::new(AsyncMutex::new(desc_rx));
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<OutcomeMessage>();

    let mut workers = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let rx = Rc::clone(&shared_rx);
        let tx = outcome_tx.clone();
        let mode = config.mode;
        workers.push(async move {
            loop {
                let item = {
                    let mut guard = rx.lock().await;
                    guard.recv().await
                };
                match item {
                    Some(QueueItem::Job(job)) => {
                        let expectation_dir = job.recipe.expectation_dir.to_path_buf();
                        let result = case_runner::run_case(job.recipe, &job.test_case, mode, &expectation_dir).await;
                        let _ = tx.send(OutcomeMessage::Case(result));
                    }
                    Some(QueueItem::Poison) | None => {
                        let _ = tx.send(OutcomeMessage::WorkerRetired);
                        break;
                    }
                }
            }
        });
    }
    drop(outcome_tx);

    // The driver interleaves draining case outcomes with counting worker
    // retirements, removing each worker from the live set as its sentinel
    // arrives, until every worker has retired (§4.I points 5-6).
    let mut case_results = Vec::with_capacity(total_jobs);
    let mut live_workers = worker_count;
    let drain = async {
        while live_workers > 0 {
            match outcome_rx.recv().await {
                Some(OutcomeMessage::Case(result)) => case_results.push(result),
                Some(OutcomeMessage::WorkerRetired) => live_workers -= 1,
                None => break,
            }
        }
    };
    futures::join!(drain, futures::future::join_all(workers));

    debug_assert_eq!(case_results.len(), total_jobs, "one outcome message per dispatched job (§8 invariant 7)");

    let mut merged_coverage = CoverageFragment::new();
    let mut used_files: BTreeSet<PathBuf> = BTreeSet::new();
    let mut test_results = Vec::with_capacity(case_results.len() + bad_tests.len());
    test_results.extend(bad_tests);

    for case in &case_results {
        merged_coverage.merge(&case.coverage);
        used_files.insert(case.expectation_path.clone());
        test_results.push(TestResultJson::from_parts(&case.outcome.description, &case.outcome.diagnostic));
    }

    let coverage_report = if is_full_run {
        compute_report(&merged_coverage, &requirement)
    } else {
        crate::coverage::CoverageReport { percent: 100.0, uncovered_modules: Vec::new() }
    };

    let unused = if is_full_run {
        reconcile_unused_files(&visited_dirs, &used_files, config.mode)
    } else {
        Vec::new()
    };

    tracing::info!(
        ran = case_results.len(),
        coverage_percent = coverage_report.percent,
        unused_files = unused.len(),
        "test pool run complete"
    );

    OutcomeReport::new(test_results, coverage_report, unused)
}

/// Emitted tests must have unique names and unique expectation file paths
/// within a recipe; a clash is a user error surfaced as `bad_test` (§4.I
/// point 2), not a panic or a silently-dropped duplicate.
fn duplicate_reason(tests: &[TestCase]) -> Option<String> {
    let mut seen_names = BTreeSet::new();
    let mut seen_files = BTreeSet::new();
    for test in tests {
        if !seen_names.insert(test.name.clone()) {
            return Some(format!("duplicate test name '{}'", test.name));
        }
        if !seen_files.insert(test.expect_file.clone()) {
            return Some(format!("duplicate expectation file '{}'", test.expect_file));
        }
    }
    None
}

fn reconcile_unused_files(dirs: &BTreeSet<PathBuf>, used: &BTreeSet<PathBuf>, mode: Mode) -> Vec<PathBuf> {
    let mut existing = BTreeSet::new();
    for dir in dirs {
        for entry in walkdir::WalkDir::new(dir).max_depth(1).into_iter().flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                existing.insert(path.to_path_buf());
            }
        }
    }

    let unused = expectation::unused_files(&existing, used);
    if mode == Mode::Train {
        for path in &unused {
            let _ = expectation::remove(path);
        }
    }
    unused
}
