// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `diaghub`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "diaghub",
    version,
    about = "Run network diagnostic commands one at a time and stream their output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the command catalog (TOML).
    ///
    /// Default: `Diaghub.toml` in the current working directory if present,
    /// otherwise the built-in catalog.
    #[arg(long, value_name = "PATH", global = true)]
    pub catalog: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DIAGHUB_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Print the catalog: modules, commands and their templates.
    List,

    /// Run a catalog command by name.
    Run(RunArgs),

    /// Run an arbitrary command line.
    Exec(ExecArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Command name as listed by `diaghub list` (case-insensitive).
    pub name: String,

    /// Value for `{host}`; defaults to `[default].host`.
    #[arg(long)]
    pub host: Option<String>,

    /// Value for `{port}`; defaults to `[default].port`.
    #[arg(long)]
    pub port: Option<u16>,

    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    /// The command line, passed to the shell as one string.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Treat the command as continuous (runs until interrupted).
    #[arg(long)]
    pub continuous: bool,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Options shared by `run` and `exec`.
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    /// Interrupt the command after this long (e.g. `10s`, `500ms`).
    #[arg(long, value_name = "DURATION")]
    pub duration: Option<String>,

    /// Save the console output to this file when the command ends.
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
