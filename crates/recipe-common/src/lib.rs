// recipe-common: shared host services for the recipe runner, depends on recipe-sdk.

pub mod secret_masker;
pub mod tracing;

pub use secret_masker::SecretMasker;
pub use tracing::{TraceEventType, TraceManager, TraceSetting, Tracing};
