//! Supervises a webpack-dev-server child for a build orchestrator and
//! reports, exactly once, when its first bundle compiled.
//!
//! Output lines go through one-time filters before reaching the console;
//! readiness is decided on the raw lines.

pub mod command;
pub mod control;
pub mod deferred;
pub mod detector;
pub mod error;
pub mod filter;
pub mod launcher;
pub mod logger;
pub mod parse;
pub mod runtime;
pub mod shell;
pub mod sink;

pub use deferred::{Deferred, Readiness};
pub use error::LaunchError;
pub use filter::{CompoundLineFilter, LineFilter, OneTimeLineFilter};
pub use launcher::{start_dev_server, Launch, Launcher};
pub use sink::{ConsoleSink, LogSink, MemorySink, TracingSink};
