// src/command.rs

//! The resolved command string handed to the runner.

use std::fmt;

use crate::errors::RunError;

/// A fully-resolved shell invocation, e.g. `ping -c 4 8.8.8.8`.
///
/// Always non-empty. The runner does not look inside it; it is passed to the
/// configured shell verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    pub fn new(text: impl Into<String>) -> Result<Self, RunError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(RunError::EmptyCommand);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Command {
    type Error = RunError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        Command::new(text)
    }
}

impl TryFrom<String> for Command {
    type Error = RunError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Command::new(text)
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
