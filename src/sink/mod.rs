// src/sink/mod.rs

//! Output sinks.
//!
//! An [`OutputSink`] is the only thing the execution engine knows about the
//! display side. The runner calls [`OutputSink::append`] from its worker
//! tasks, one completed line at a time and in production order.
//!
//! - [`channel`] queues lines for a consumer task.
//! - [`stdout`] prints lines as they arrive.
//! - [`buffer`] keeps lines in memory so they can be cleared or saved.

pub mod buffer;
pub mod channel;
pub mod stdout;

use std::sync::Arc;

pub use buffer::ConsoleBuffer;
pub use channel::ChannelSink;
pub use stdout::StdoutSink;

/// Consumer of ordered text lines.
///
/// Implementations may be called from any thread and must return quickly:
/// a slow sink stalls the drain of the child's output pipe. Anything
/// expensive should be queued and done elsewhere.
pub trait OutputSink: Send + Sync {
    /// Receive one line, without its trailing newline.
    fn append(&self, line: &str);
}

impl<S: OutputSink + ?Sized> OutputSink for Arc<S> {
    fn append(&self, line: &str) {
        (**self).append(line)
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn append(&self, line: &str) {
        (**self).append(line)
    }
}

/// Forwards every line to each inner sink, in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl OutputSink for FanoutSink {
    fn append(&self, line: &str) {
        for sink in &self.sinks {
            sink.append(line);
        }
    }
}
