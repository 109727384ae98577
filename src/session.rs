// src/session.rs

//! Drives one command the way the UI would: start it, stop it on request,
//! wait for the process to go away.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::errors::Result;
use crate::exec::ProcessRunner;
use crate::types::ExecutionMode;

const MIN_REAP_WAIT: Duration = Duration::from_millis(500);

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The command exited on its own.
    Completed,
    /// The duration limit elapsed and the command was cancelled.
    TimedOut,
    /// Ctrl-C cancelled the command.
    Interrupted,
}

/// Run `command` on `runner` and return when it is over.
///
/// - A one-shot command ends when it exits; a continuous one runs until
///   `limit` elapses or Ctrl-C. Either mode is cancelled by Ctrl-C or `limit`.
/// - Before returning, waits up to twice the runner's grace period for the
///   process to be reaped.
pub async fn drive(
    runner: &ProcessRunner,
    command: Command,
    mode: ExecutionMode,
    limit: Option<Duration>,
) -> Result<SessionEnd> {
    runner.run(command, mode)?;

    let stop_after = async {
        match limit {
            Some(limit) => sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let end = tokio::select! {
        _ = runner.wait_idle() => SessionEnd::Completed,
        _ = stop_after => {
            info!(?limit, "duration limit reached; interrupting");
            runner.cancel();
            SessionEnd::TimedOut
        }
        _ = interrupted => {
            info!("Ctrl+C received; interrupting");
            runner.cancel();
            SessionEnd::Interrupted
        }
    };

    let bound = (runner.options().grace_period * 2).max(MIN_REAP_WAIT);
    if timeout(bound, runner.wait_reaped()).await.is_err() {
        warn!(
            live = runner.live_workers(),
            "process not reaped within {:?}; leaving it behind", bound
        );
    } else {
        debug!(?end, "session finished");
    }

    Ok(end)
}
