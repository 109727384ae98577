// src/exec/notice.rs

//! Lines the runner itself writes to the sink, around a command's output.

use chrono::Local;

use crate::command::Command;
use crate::errors::ExecError;
use crate::types::ExecutionMode;

pub const INTERRUPTED: &str = "[INFO] Process interrupted.";

pub const ERROR_PREFIX: &str = "ERROR: ";

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// `[HH:MM:SS] Running: <cmd>` or `[HH:MM:SS] Started continuous: <cmd>`.
pub fn started(command: &Command, mode: ExecutionMode) -> String {
    let label = match mode {
        ExecutionMode::OneShot => "Running",
        ExecutionMode::Continuous => "Started continuous",
    };
    format!("[{}] {label}: {command}", timestamp())
}

pub fn error(err: &ExecError) -> String {
    format!("{ERROR_PREFIX}{err}")
}
