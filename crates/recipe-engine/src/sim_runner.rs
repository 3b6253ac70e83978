//! Alternative implementation of the step runner that replays recorded data
//! instead of spawning real subprocesses (§4.H).

use parking_lot::Mutex;
use recipe_core::error::EngineError;
use recipe_core::step::{ExecutionResult, StepConfig};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One recorded step's canned result plus the stdout it would have produced.
#[derive(Debug, Clone)]
pub struct RecordedStep {
    pub result: ExecutionResult,
    pub stdout_lines: Vec<String>,
}

/// Maps a step's name-tokens path to its recorded outcome (§4.H "cmd prefix
/// -> recorded ExecutionResult, stdout chunks, placeholder outputs").
#[derive(Debug, Clone, Default)]
pub struct TestData {
    steps: BTreeMap<String, RecordedStep>,
}

impl TestData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(
        mut self,
        name_tokens: &[&str],
        result: ExecutionResult,
        stdout_lines: Vec<String>,
    ) -> Self {
        self.steps.insert(name_tokens.join("."), RecordedStep { result, stdout_lines });
        self
    }

    pub fn lookup(&self, name_tokens: &[String]) -> Option<&RecordedStep> {
        self.steps.get(&name_tokens.join("."))
    }
}

/// Replays `TestData` instead of spawning a real subprocess. Every step
/// actually invoked is recorded into an append-only `steps_ran` list used
/// for expectation diffing; emitted stdout is mirrored into a retained
/// annotation stream for later comparison.
pub struct SimulationStepRunner {
    recipe_name: String,
    test_name: String,
    test_data: Arc<TestData>,
    steps_ran: Mutex<Vec<String>>,
    annotations: Mutex<Vec<String>>,
}

impl SimulationStepRunner {
    pub fn new(recipe_name: impl Into<String>, test_name: impl Into<String>, test_data: Arc<TestData>) -> Self {
        Self {
            recipe_name: recipe_name.into(),
            test_name: test_name.into(),
            test_data,
            steps_ran: Mutex::new(Vec::new()),
            annotations: Mutex::new(Vec::new()),
        }
    }

    /// Returns the canned `ExecutionResult` for `config`'s name-tokens path,
    /// or a `BadTest` failure if the test data has no entry for it.
    pub fn run(&self, config: &StepConfig) -> Result<ExecutionResult, EngineError> {
        let full_name = config.name();
        self.steps_ran.lock().push(full_name.clone());

        match self.test_data.lookup(&config.name_tokens) {
            Some(recorded) => {
                self.annotations.lock().extend(recorded.stdout_lines.iter().cloned());
                Ok(recorded.result.clone())
            }
            None => Err(EngineError::BadTest {
                recipe_name: self.recipe_name.clone(),
                test_name: self.test_name.clone(),
                reason: format!("no recorded test data for step '{full_name}'"),
            }),
        }
    }

    pub fn steps_ran(&self) -> Vec<String> {
        self.steps_ran.lock().clone()
    }

    pub fn annotations(&self) -> Vec<String> {
        self.annotations.lock().clone()
    }
}
