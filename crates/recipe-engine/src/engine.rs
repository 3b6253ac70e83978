//! Drives a recipe's `RunSteps`, owns the context stack, the active-step
//! chain, and the source-manifest uploader state (§4.G).

use crate::api::{RecipeApi, ScopedContext};
use crate::recipe::Recipe;
use crate::sim_runner::SimulationStepRunner;
use async_trait::async_trait;
use recipe_context::{ContextStack, DeferScope};
use recipe_core::context_frame::ContextFrame;
use recipe_core::error::EngineError;
use recipe_core::step::{EnvValue, ExecutionResult, PresentationStatus, StepConfig, StepData, StepPresentation};
use recipe_sched::ThreadpoolBudget;
use recipe_sdk::trace::{NullTraceWriter, TraceWriter};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Placeholder for the source-manifest uploader's accumulated state (§4.G).
/// Full source-manifest publishing is an external collaborator (§1); the
/// engine only needs to remember which manifests it has already sent so a
/// re-entrant call doesn't resend.
#[derive(Debug, Default)]
pub struct ManifestUploaderState {
    pub uploaded: Vec<String>,
}

enum StepExecutor {
    Real {
        parent_env: BTreeMap<String, String>,
        default_cwd: PathBuf,
        budget: ThreadpoolBudget,
        annotation_escaping: bool,
    },
    Simulated(Arc<SimulationStepRunner>),
}

/// Owns the context stack, the active-step chain (so the innermost
/// still-open step is retrievable by recipe code after a failure), and the
/// uploader state. One `Engine` drives exactly one recipe invocation.
pub struct Engine {
    context_stack: ContextStack,
    active_steps: Vec<StepData>,
    root_steps: Vec<StepData>,
    executor: StepExecutor,
    uploader_state: ManifestUploaderState,
    trace: Arc<dyn TraceWriter>,
}

impl Engine {
    pub fn new_real(parent_env: BTreeMap<String, String>, default_cwd: PathBuf, annotation_escaping: bool) -> Self {
        Self {
            context_stack: ContextStack::new(),
            active_steps: Vec::new(),
            root_steps: Vec::new(),
            executor: StepExecutor::Real {
                parent_env,
                default_cwd,
                budget: ThreadpoolBudget::default(),
                annotation_escaping,
            },
            uploader_state: ManifestUploaderState::default(),
            trace: Arc::new(NullTraceWriter),
        }
    }

    pub fn new_simulated(runner: Arc<SimulationStepRunner>) -> Self {
        Self {
            context_stack: ContextStack::new(),
            active_steps: Vec::new(),
            root_steps: Vec::new(),
            executor: StepExecutor::Simulated(runner),
            uploader_state: ManifestUploaderState::default(),
            trace: Arc::new(NullTraceWriter),
        }
    }

    /// Installs a component-scoped trace writer (§4.L), replacing the default
    /// no-op one. Shared across all engine instances in a process so trace
    /// output and secret masking stay consistent.
    pub fn with_trace_writer(mut self, trace: Arc<dyn TraceWriter>) -> Self {
        self.trace = trace;
        self
    }

    pub fn uploader_state(&self) -> &ManifestUploaderState {
        &self.uploader_state
    }

    /// Invokes `recipe`'s `RunSteps(api)` entry point. Uncaught errors from
    /// user code (unhandled step failures included) are captured, not
    /// propagated, and surfaced as the second element of the returned tuple
    /// (§4.G). The original error is preserved so callers can downcast back
    /// to `EngineError` and recover the precise failure kind.
    pub async fn run_steps(&mut self, recipe: &Recipe) -> (Result<(), EngineError>, Option<anyhow::Error>) {
        match recipe.logic.run_steps(self).await {
            Ok(()) => (Ok(()), None),
            Err(e) => {
                let engine_err = e
                    .downcast_ref::<EngineError>()
                    .map(|e| EngineError::InternalError(e.to_string()))
                    .unwrap_or_else(|| EngineError::InternalError(e.to_string()));
                (Err(engine_err), Some(e))
            }
        }
    }

    /// Root steps closed at the top level (not nested under any still-open
    /// parent step) once `run_steps` returns.
    pub fn root_steps(&self) -> &[StepData] {
        &self.root_steps
    }

    /// Opens a logical grouping step; closes (propagating any inner
    /// exception) when the returned guard drops (§4.G "parent_step").
    pub fn parent_step(&mut self, name_tokens: Vec<String>) -> ParentStepGuard<'_> {
        let config = StepConfig::new(name_tokens, vec!["(parent step)".into()]);
        let placeholder = StepData::new(config, ExecutionResult::success(0));
        self.active_steps.push(placeholder);
        ParentStepGuard { engine: self }
    }

    fn record_step(&mut self, step: StepData) {
        if let Some(parent) = self.active_steps.last_mut() {
            parent.children.push(step);
        } else {
            self.root_steps.push(step);
        }
    }

    fn close_parent_step(&mut self) {
        if let Some(step) = self.active_steps.pop() {
            self.record_step(step);
        }
    }

    /// Overlays the current top of the context stack onto `config` (§4.D):
    /// cwd fills in only if the step didn't set its own, env entries the step
    /// didn't already set are inherited, prefixes/suffixes compose around the
    /// step's own, and an infra-tagged context frame is sticky.
    fn apply_context(&self, mut config: StepConfig) -> StepConfig {
        let top = self.context_stack.top();

        if config.cwd.is_none() {
            config.cwd = top.cwd.clone();
        }
        config.infra_step = config.infra_step || top.infra;

        for (key, value) in &top.env {
            config.env.entry(key.clone()).or_insert_with(|| EnvValue::Set(value.clone()));
        }

        for (key, values) in &top.env_prefixes {
            config.env_prefixes.entry(key.clone()).or_default().extend(values.iter().cloned());
        }

        for (key, values) in &top.env_suffixes {
            let entry = config.env_suffixes.entry(key.clone()).or_default();
            let mut combined = values.clone();
            combined.extend(entry.drain(..));
            *entry = combined;
        }

        config
    }
}

/// RAII guard for a parent-step scope (§4.G). Drop closes the step and
/// folds it into its own parent's children, or the root list.
pub struct ParentStepGuard<'a> {
    engine: &'a mut Engine,
}

impl<'a> ParentStepGuard<'a> {
    pub fn presentation_mut(&mut self) -> Option<&mut StepPresentation> {
        self.engine.active_steps.last_mut().map(|s| &mut s.presentation)
    }

    pub fn children(&self) -> &[StepData] {
        self.engine
            .active_steps
            .last()
            .map(|s| s.children.as_slice())
            .unwrap_or(&[])
    }
}

impl<'a> Drop for ParentStepGuard<'a> {
    fn drop(&mut self) {
        self.engine.close_parent_step();
    }
}

#[async_trait(?Send)]
impl RecipeApi for Engine {
    async fn step(&mut self, config: StepConfig) -> Result<ExecutionResult, EngineError> {
        config.validate().map_err(EngineError::InternalError)?;
        let full_name = config.name();
        self.trace.verbose(&format!("running step '{full_name}': {:?}", config.argv));
        let config = self.apply_context(config);

        let result = match &self.executor {
            StepExecutor::Real {
                parent_env,
                default_cwd,
                budget,
                annotation_escaping,
            } => {
                let stdout = recipe_process::BufferSink::new();
                let stderr = recipe_process::BufferSink::new();
                recipe_process::step_runner::run(
                    &config,
                    parent_env,
                    default_cwd,
                    stdout,
                    stderr,
                    *annotation_escaping,
                    CancellationToken::new(),
                    budget,
                )
                .await
            }
            StepExecutor::Simulated(runner) => runner.run(&config)?,
        };

        let infra_failure = config.infra_step || result.had_timeout || result.was_cancelled;
        let mut presentation = StepPresentation::default();
        presentation.status = if result.is_success() {
            PresentationStatus::Success
        } else {
            PresentationStatus::Failure
        };

        let step_data = StepData {
            config: config.clone(),
            result: result.clone(),
            presentation,
            children: Vec::new(),
        };
        self.record_step(step_data);

        if result.had_timeout {
            return Err(EngineError::infra(full_name, "step timed out"));
        }
        if result.was_cancelled {
            return Err(EngineError::infra(full_name, "step was cancelled"));
        }
        match result.retcode {
            Some(0) => Ok(result),
            Some(code) if infra_failure => Err(EngineError::infra(full_name, format!("infra step failed with retcode {code}"))),
            Some(code) => Err(EngineError::StepFailure { name: full_name, retcode: code }),
            None => Err(EngineError::infra(full_name, "unable to resolve cmd0")),
        }
    }

    fn context(&mut self, frame: ContextFrame) -> Result<ScopedContext, EngineError> {
        self.context_stack
            .push(frame)
            .map_err(|e| EngineError::InternalError(e.to_string()))
    }

    fn defer(&self) -> Result<DeferScope<ExecutionResult>, EngineError> {
        DeferScope::enter().map_err(|e| EngineError::InternalError(e.to_string()))
    }
}
