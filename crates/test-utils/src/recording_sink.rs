use std::sync::{Arc, Mutex};
use std::time::Duration;

use diaghub::sink::OutputSink;

/// A sink that records every line it receives, for assertions.
///
/// Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_sink(&self) -> Arc<dyn OutputSink> {
        Arc::new(self.clone())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lines that satisfy `pred`.
    pub fn count(&self, pred: impl Fn(&str) -> bool) -> usize {
        self.lines.lock().unwrap().iter().filter(|l| pred(l)).count()
    }

    /// Lines that are neither runner notices nor errors: the command's own
    /// output.
    pub fn output_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| !is_notice(l))
            .collect()
    }

    /// Poll until some line satisfies `pred`. Panics after 5 seconds.
    pub async fn wait_for_line(&self, pred: impl Fn(&str) -> bool) -> String {
        for _ in 0..500 {
            if let Some(line) = self.lines().into_iter().find(|l| pred(l)) {
                return line;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no matching line within 5s; got {:?}", self.lines());
    }
}

/// Lines the runner writes itself: "started", "interrupted" and errors.
pub fn is_notice(line: &str) -> bool {
    is_started(line) || line == diaghub::exec::notice::INTERRUPTED || is_error(line)
}

pub fn is_started(line: &str) -> bool {
    line.starts_with('[') && (line.contains("] Running: ") || line.contains("] Started continuous: "))
}

pub fn is_error(line: &str) -> bool {
    line.starts_with(diaghub::exec::notice::ERROR_PREFIX)
}

impl OutputSink for RecordingSink {
    fn append(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
