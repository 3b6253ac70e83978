use async_trait::async_trait;
use recipe_context::{ContextStack, DeferScope};
use recipe_core::context_frame::ContextFrame;
use recipe_core::error::EngineError;
use recipe_core::step::{ExecutionResult, StepConfig};

pub use recipe_context::ScopedContext;

/// The surface the engine hands to recipe code: run a step, scope a context
/// overlay, and open a deferred-failure-aggregation scope (§4.M). Concrete
/// domain modules (platform, shutil, buildbucket) remain out of scope and
/// are never implemented against this trait.
#[async_trait(?Send)]
pub trait RecipeApi {
    /// Run one step under the current top of the context stack. Returns
    /// `Err` for any non-success outcome (§7): `StepFailure` for a non-zero
    /// retcode, `InfraFailure` for a timeout or cancellation.
    async fn step(&mut self, config: StepConfig) -> Result<ExecutionResult, EngineError>;

    /// Push a context frame, scoped to the returned guard's lifetime (§4.D).
    fn context(&mut self, frame: ContextFrame) -> Result<ScopedContext, EngineError>;

    /// Open a scope in which step failures are captured instead of
    /// unwound (§4.E). Rejects nesting directly inside another open scope.
    fn defer(&self) -> Result<DeferScope<ExecutionResult>, EngineError>;
}
