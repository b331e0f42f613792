//! Binary-side orchestration: tracing, signals, progress display, exit codes.

pub(crate) mod exit_handler;
pub(crate) mod progress_manager;
pub(crate) mod runtime;
pub(crate) mod terminal;
