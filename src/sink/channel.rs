// src/sink/channel.rs

use tokio::sync::mpsc;
use tracing::trace;

use super::OutputSink;

/// Sink that queues every line on an unbounded channel.
///
/// `append` never blocks; the display side drains the paired receiver at
/// its own pace. Lines appended after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver the consumer reads lines from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl OutputSink for ChannelSink {
    fn append(&self, line: &str) {
        if self.tx.send(line.to_string()).is_err() {
            trace!("output receiver dropped; discarding line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_arrive_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        for i in 1..=3 {
            sink.append(&format!("line {i}"));
        }
        drop(sink);

        let mut got = Vec::new();
        while let Some(line) = rx.recv().await {
            got.push(line);
        }
        assert_eq!(got, vec!["line 1", "line 2", "line 3"]);
    }

    #[test]
    fn append_after_receiver_dropped_is_harmless() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.append("nobody is listening");
    }
}
