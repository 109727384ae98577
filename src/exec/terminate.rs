// src/exec/terminate.rs

//! Stopping a child: graceful terminate first, hard kill after the grace
//! period.

use std::io;

use tokio::process::Child;
use tracing::{debug, warn};

use crate::errors::ExecError;

/// Ask the child (and on Unix its whole process group) to terminate.
///
/// Returns `ExecError::Termination` if the request could not be delivered,
/// typically because the process is already gone.
#[cfg(unix)]
pub fn request_termination(child: &mut Child) -> Result<(), ExecError> {
    use nix::sys::signal::Signal;

    signal_group(child, Signal::SIGTERM)
}

#[cfg(not(unix))]
pub fn request_termination(child: &mut Child) -> Result<(), ExecError> {
    child.start_kill().map_err(ExecError::Termination)
}

/// Kill the child outright. Failures are logged, not returned: the caller
/// goes on to reap whatever is left.
pub fn force_kill(child: &mut Child, run_id: u64) {
    kill_group(child, run_id);

    if let Err(e) = child.start_kill() {
        // InvalidInput means the child was already reaped.
        if e.kind() != io::ErrorKind::InvalidInput {
            warn!(run_id, error = %e, "failed to kill child process");
        }
    }
}

#[cfg(unix)]
fn kill_group(child: &Child, run_id: u64) {
    if let Err(e) = signal_group(child, nix::sys::signal::Signal::SIGKILL) {
        debug!(run_id, error = %e, "SIGKILL to process group failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child, _run_id: u64) {}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) -> Result<(), ExecError> {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let pid = child.id().ok_or_else(|| {
        ExecError::Termination(io::Error::new(
            io::ErrorKind::NotFound,
            "process already exited",
        ))
    })?;
    let pgid = i32::try_from(pid)
        .map_err(|e| ExecError::Termination(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    killpg(Pid::from_raw(pgid), signal).map_err(|errno| ExecError::Termination(errno.into()))
}
