// src/sink/buffer.rs

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use super::OutputSink;
use crate::errors::Result;

/// In-memory console: keeps every line so the user can clear the view or
/// save it to a file.
#[derive(Debug, Default)]
pub struct ConsoleBuffer {
    lines: Mutex<Vec<String>>,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the buffered lines.
    pub fn lines(&self) -> Vec<String> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }

    /// Buffered text, one line per row, newline-terminated.
    pub fn contents(&self) -> String {
        let lines = self.guard();
        let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines.iter() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Write the buffered text to `path` as UTF-8, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = self.contents();
        fs::write(path, contents.as_bytes())?;
        info!(path = %path.display(), bytes = contents.len(), "console output saved");
        Ok(())
    }
}

impl OutputSink for ConsoleBuffer {
    fn append(&self, line: &str) {
        self.guard().push(line.to_string());
    }
}
