// src/sink/stdout.rs

use std::io::Write;

use tracing::warn;

use super::OutputSink;

/// Prints every line to stdout. Logs go to stderr, so stdout carries
/// command output only.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn append(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            warn!(error = %e, "failed to write output line to stdout");
        }
    }
}
