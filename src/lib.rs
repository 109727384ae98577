// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod session;
pub mod sink;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, CliCommand, SessionArgs};
use crate::config::{CatalogFile, load_catalog, parse_duration};
use crate::errors::DiaghubError;
use crate::session::{SessionEnd, drive};
use crate::sink::{ConsoleBuffer, FanoutSink, StdoutSink};

pub use crate::command::Command;
pub use crate::exec::{ProcessRunner, RunnerOptions};
pub use crate::sink::OutputSink;
pub use crate::types::{BusyPolicy, ExecutionMode, RunState};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - catalog loading
/// - template resolution
/// - the process runner and its output sink
/// - duration limit / Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let catalog = load_catalog(args.catalog.as_deref())?;

    match args.command {
        CliCommand::List => {
            print_catalog(&catalog);
            Ok(())
        }
        CliCommand::Run(run) => {
            let (module, entry) = catalog
                .find_command(&run.name)
                .ok_or_else(|| DiaghubError::UnknownCommand(run.name.clone()))?;
            debug!(module = %module.title, command = %entry.name, "resolved catalog entry");

            let target = catalog.target(run.host, run.port);
            let command = entry.resolve(&target)?;
            run_session(&catalog, command, entry.mode(), &run.session).await
        }
        CliCommand::Exec(exec) => {
            let command = Command::new(exec.command.join(" "))?;
            let mode = ExecutionMode::from_continuous(exec.continuous);
            run_session(&catalog, command, mode, &exec.session).await
        }
    }
}

async fn run_session(
    catalog: &CatalogFile,
    command: Command,
    mode: ExecutionMode,
    args: &SessionArgs,
) -> Result<()> {
    let limit = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| anyhow::anyhow!("--duration: {e}"))?;

    let options = catalog.config.runner_options()?;
    let console = Arc::new(ConsoleBuffer::new());
    let sink = FanoutSink::new().with(console.clone()).with(Arc::new(StdoutSink));
    let runner = ProcessRunner::from_current(Arc::new(sink), options)?;

    if mode.is_continuous() && limit.is_none() {
        info!("continuous command; press Ctrl+C to stop");
    }

    let end = drive(&runner, command, mode, limit).await?;
    debug!(?end, lines = console.len(), "command finished");
    if end == SessionEnd::TimedOut {
        info!("command stopped after --duration elapsed");
    }

    if let Some(path) = &args.save {
        console
            .save(path)
            .with_context(|| format!("saving output to '{}'", path.display()))?;
        eprintln!("Output saved to {}", path.display());
    }

    Ok(())
}

/// Print modules, commands and templates.
fn print_catalog(catalog: &CatalogFile) {
    println!("diaghub catalog");
    println!("  default.host = {}", catalog.default.host);
    println!("  default.port = {}", catalog.default.port);
    println!("  config.grace_period = {}", catalog.config.grace_period);
    println!("  config.when_busy = {:?}", catalog.config.when_busy);
    println!();

    for module in &catalog.modules {
        let mut inputs = Vec::new();
        if module.input_host {
            inputs.push("host");
        }
        if module.input_port {
            inputs.push("port");
        }

        if inputs.is_empty() {
            println!("{}:", module.title);
        } else {
            println!("{} (inputs: {}):", module.title, inputs.join(", "));
        }

        for command in &module.commands {
            let marker = if command.continuous { "  [continuous]" } else { "" };
            println!("  - {}{marker}", command.name);
            println!("      cmd: {}", command.cmd);
        }
    }

    debug!("catalog listing complete");
}
