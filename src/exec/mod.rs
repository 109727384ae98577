// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running diagnostic commands,
//! using `tokio::process::Command`, and streaming their output to an
//! [`OutputSink`](crate::sink::OutputSink).
//!
//! - [`runner`] owns the single process slot (`run`, `cancel`, state).
//! - [`worker`] is the per-run task that launches, drains and reaps a child.
//! - [`shell`] builds the shell invocation with merged stdout/stderr.
//! - [`terminate`] holds the terminate / kill primitives.
//! - [`notice`] formats the lines the runner writes around command output.

pub mod notice;
pub mod runner;
pub mod shell;
pub mod terminate;
mod worker;

pub use runner::{DEFAULT_GRACE_PERIOD, ProcessRunner, RunId, RunnerOptions};
pub use shell::Shell;
