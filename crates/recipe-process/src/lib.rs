//! Process primitives (§4.A) and stream multiplexing (§4.B): spawn, wait,
//! timeout, and process-group-wide kill, uniform across POSIX and Windows.

pub mod env_builder;
pub mod error;
pub mod group;
pub mod resolve;
pub mod spawn;
pub mod step_runner;
pub mod stream_mux;

pub use error::ProcessError;
pub use spawn::{spawn, Spawned};
pub use stream_mux::{BufferSink, StreamSink};
