// recipe-core: data model and error taxonomy shared across the recipe runner.
// Depends on nothing but the standard library and thiserror/serde.

pub mod context_frame;
pub mod error;
pub mod path;
pub mod step;
pub mod test_model;

pub use context_frame::ContextFrame;
pub use error::EngineError;
pub use path::{Path, PathsClient};
pub use step::{EnvValue, ExecutionResult, PresentationStatus, StepConfig, StepData, StepPresentation};
pub use test_model::{CoverageFragment, TestDescription, TestDiagnostic, TestOutcome};
