// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How a command is expected to end.
///
/// The runner treats both modes identically; the mode only changes the
/// "started" notification and tells the caller whether it has to offer a
/// way to stop the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Terminates on its own after producing output (`ping -c 4`, `netstat`).
    #[default]
    OneShot,
    /// Runs until explicitly cancelled (`ping` without a count).
    Continuous,
}

impl ExecutionMode {
    pub fn from_continuous(continuous: bool) -> Self {
        if continuous {
            ExecutionMode::Continuous
        } else {
            ExecutionMode::OneShot
        }
    }

    pub fn is_continuous(self) -> bool {
        matches!(self, ExecutionMode::Continuous)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::OneShot => f.write_str("one-shot"),
            ExecutionMode::Continuous => f.write_str("continuous"),
        }
    }
}

/// State of the single process slot owned by a `ProcessRunner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

/// Behaviour when `run` is called while another command is active.
///
/// - `Reject`: refuse the new request with `RunError::AlreadyRunning`
///   (default).
/// - `Replace`: interrupt the active command, then start the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    #[default]
    Reject,
    Replace,
}

impl FromStr for BusyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(BusyPolicy::Reject),
            "replace" => Ok(BusyPolicy::Replace),
            other => Err(format!(
                "invalid when_busy: {other} (expected \"reject\" or \"replace\")"
            )),
        }
    }
}
