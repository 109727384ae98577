// src/errors.rs

//! Crate-wide error types.
//!
//! - [`RunError`] is what callers of `ProcessRunner::run` see.
//! - [`ExecError`] describes failures inside a worker. These never reach the
//!   caller of `run`; they are rendered onto the output sink and logged.
//! - [`DiaghubError`] covers everything else (catalog loading, templates,
//!   CLI wiring).

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiaghubError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Rejections returned synchronously by `ProcessRunner::run` or by
/// `Command` construction. None of them has a process side effect.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunError {
    #[error("a command is already running")]
    AlreadyRunning,

    #[error("command is empty")]
    EmptyCommand,
}

/// Failures observed by a worker while a command is executing.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("reading output: {0}")]
    Stream(#[source] io::Error),

    #[error("terminate request failed: {0}")]
    Termination(#[source] io::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DiaghubError>;
