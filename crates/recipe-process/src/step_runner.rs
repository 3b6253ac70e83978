use crate::group::kill_group;
use crate::spawn::spawn;
use crate::stream_mux::{reap, spawn_line_copier, StreamSink};
use recipe_core::step::{ExecutionResult, StepConfig};
use recipe_sched::ThreadpoolBudget;
use std::collections::BTreeMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Runs one step against a real subprocess (§4.C). `cancel` lets an
/// enclosing scheduler inject cancellation (e.g. on engine shutdown);
/// `config.timeout`, if set, is enforced independently of that token.
pub async fn run(
    config: &StepConfig,
    parent_env: &BTreeMap<String, String>,
    default_cwd: &Path,
    stdout_sink: impl StreamSink + 'static,
    stderr_sink: impl StreamSink + 'static,
    annotation_escaping: bool,
    cancel: CancellationToken,
    budget: &ThreadpoolBudget,
) -> ExecutionResult {
    let mut spawned = match spawn(config, parent_env, default_cwd) {
        Ok(spawned) => spawned,
        Err(_) => return ExecutionResult::unresolved(),
    };

    let stdout = spawned.child.stdout.take().expect("stdout piped at spawn");
    let stderr = spawned.child.stderr.take().expect("stderr piped at spawn");

    let stdout_cancel = CancellationToken::new();
    let stderr_cancel = CancellationToken::new();
    let stdout_task = spawn_line_copier(stdout, stdout_sink, annotation_escaping, stdout_cancel.clone());
    let stderr_task = spawn_line_copier(stderr, stderr_sink, annotation_escaping, stderr_cancel.clone());

    let wait_outcome = match config.timeout {
        Some(duration) => {
            tokio::select! {
                result = spawned.child.wait() => WaitOutcome::Completed(result),
                _ = tokio::time::sleep(duration) => WaitOutcome::TimedOut,
                _ = cancel.cancelled() => WaitOutcome::Cancelled,
            }
        }
        None => {
            tokio::select! {
                result = spawned.child.wait() => WaitOutcome::Completed(result),
                _ = cancel.cancelled() => WaitOutcome::Cancelled,
            }
        }
    };

    let result = match wait_outcome {
        WaitOutcome::Completed(Ok(status)) => ExecutionResult {
            retcode: status.code(),
            had_timeout: false,
            was_cancelled: false,
        },
        WaitOutcome::Completed(Err(_)) => ExecutionResult {
            retcode: None,
            had_timeout: false,
            was_cancelled: false,
        },
        WaitOutcome::TimedOut => {
            let retcode = kill_group(&mut spawned.child).await;
            ExecutionResult {
                retcode,
                had_timeout: true,
                was_cancelled: false,
            }
        }
        WaitOutcome::Cancelled => {
            let retcode = kill_group(&mut spawned.child).await;
            ExecutionResult {
                retcode,
                had_timeout: false,
                was_cancelled: true,
            }
        }
    };

    reap(stdout_task, &stdout_cancel, budget).await;
    reap(stderr_task, &stderr_cancel, budget).await;

    result
}

enum WaitOutcome {
    Completed(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}
