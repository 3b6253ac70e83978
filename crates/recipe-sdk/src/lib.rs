// recipe-sdk: foundation layer for the recipe runner.
// This crate has zero dependencies on other recipe-runner crates and provides
// core utilities and traits used throughout the engine.

pub mod arg_util;
pub mod trace;
pub mod which_util;

pub use arg_util::ArgUtil;
pub use trace::TraceWriter;
pub use which_util::WhichUtil;
