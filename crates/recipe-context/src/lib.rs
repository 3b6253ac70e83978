//! Scoped cwd/env/env-prefix/env-suffix/infra overlays (§4.D) plus deferred
//! step-failure aggregation (§4.E).

pub mod defer;
pub mod stack;

pub use defer::{AggregatedResult, DeferredResult, DeferScope};
pub use stack::{ContextStack, ContextStackError, ResolvedContext, ScopedContext};
