// src/exec/worker.rs

//! Per-run worker: launch, stream, stop on request, reap.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, trace, warn};

use crate::command::Command;
use crate::errors::ExecError;
use crate::exec::notice;
use crate::exec::runner::{RunId, RunnerInner};
use crate::exec::shell::{CombinedOutput, decode_line, spawn_combined};
use crate::exec::terminate::{force_kill, request_termination};

/// Returns the slot to `Idle` and decrements the live-worker count however
/// the worker ends, including on panic or runtime shutdown.
struct WorkerGuard {
    inner: Arc<RunnerInner>,
    run_id: RunId,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if self.inner.finish(self.run_id) {
            debug!(run_id = self.run_id, "run finished; runner idle");
        }
        self.inner.worker_exited();
    }
}

/// Tracks the stop request for one child.
///
/// - `cancel_rx` is armed until the runner cancels (or is dropped).
/// - `kill_at` is set when the terminate request goes out; reaching it
///   escalates to a hard kill.
struct Stopper {
    run_id: RunId,
    grace: Duration,
    cancel_rx: oneshot::Receiver<()>,
    armed: bool,
    kill_at: Option<Instant>,
    killed: bool,
}

impl Stopper {
    fn new(run_id: RunId, grace: Duration, cancel_rx: oneshot::Receiver<()>) -> Self {
        Self {
            run_id,
            grace,
            cancel_rx,
            armed: true,
            kill_at: None,
            killed: false,
        }
    }

    fn stopping(&self) -> bool {
        !self.armed
    }

    /// Whether the cancel branch is live, whether the kill deadline is live,
    /// and that deadline.
    fn poll_state(&self) -> (bool, bool, Instant) {
        let escalate = self.kill_at.is_some() && !self.killed;
        (self.armed, escalate, self.kill_at.unwrap_or_else(Instant::now))
    }

    fn on_cancel(&mut self, res: Result<(), oneshot::error::RecvError>, child: &mut Child) {
        self.armed = false;
        match res {
            Ok(()) => info!(run_id = self.run_id, "cancellation requested; terminating process"),
            Err(_) => debug!(run_id = self.run_id, "runner dropped; terminating process"),
        }

        if let Err(e) = request_termination(child) {
            debug!(run_id = self.run_id, error = %e, "terminate request not delivered");
        }
        self.kill_at = Some(Instant::now() + self.grace);
    }

    fn escalate(&mut self, child: &mut Child) {
        self.killed = true;
        warn!(
            run_id = self.run_id,
            grace_ms = self.grace.as_millis() as u64,
            "process still alive after grace period; killing"
        );
        force_kill(child, self.run_id);
    }
}

/// Body of the task spawned by `ProcessRunner::run`.
///
/// Errors never escape: a launch or read failure becomes an `ERROR:` line on
/// the sink and the run still ends in `Idle`.
pub(crate) async fn run_worker(
    inner: Arc<RunnerInner>,
    run_id: RunId,
    command: Command,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let _guard = WorkerGuard {
        inner: Arc::clone(&inner),
        run_id,
    };

    if let Ok(()) | Err(TryRecvError::Closed) = cancel_rx.try_recv() {
        debug!(run_id, cmd = %command, "cancelled before launch; not starting process");
        return;
    }

    let (child, output) = match spawn_combined(&inner.options.shell, &command) {
        Ok(spawned) => spawned,
        Err(source) => {
            let err = ExecError::Launch {
                command: command.to_string(),
                source,
            };
            error!(run_id, error = %err, "process launch failed");
            inner.forward(run_id, &notice::error(&err));
            return;
        }
    };

    debug!(run_id, pid = ?child.id(), cmd = %command, "process spawned");

    supervise(&inner, run_id, child, output, cancel_rx).await;
}

/// Stream `output` to the sink, then reap `child`, honouring cancellation
/// throughout. A read error is reported on the sink and does not skip the
/// reap.
async fn supervise(
    inner: &RunnerInner,
    run_id: RunId,
    mut child: Child,
    output: CombinedOutput,
    cancel_rx: oneshot::Receiver<()>,
) {
    let mut stopper = Stopper::new(run_id, inner.options.grace_period, cancel_rx);

    if let Err(err) = stream_output(inner, run_id, &mut child, output, &mut stopper).await {
        error!(run_id, error = %err, "output stream failed");
        inner.forward(run_id, &notice::error(&err));
    }

    match reap(&mut child, &mut stopper).await {
        Ok(status) => info!(
            run_id,
            exit_code = status.code().unwrap_or(-1),
            success = status.success(),
            stopped = stopper.stopping(),
            "process exited"
        ),
        Err(e) => error!(run_id, error = %e, "waiting for process failed"),
    }
}

/// Forward every line of `output` until EOF or a read error.
///
/// Once a stop is requested the remaining output is drained but no longer
/// forwarded; the runner has already moved on.
async fn stream_output(
    inner: &RunnerInner,
    run_id: RunId,
    child: &mut Child,
    mut output: CombinedOutput,
    stopper: &mut Stopper,
) -> Result<(), ExecError> {
    let mut buf = Vec::new();

    loop {
        let (armed, escalate, deadline) = stopper.poll_state();

        tokio::select! {
            res = &mut stopper.cancel_rx, if armed => {
                stopper.on_cancel(res, child);
            }

            _ = sleep_until(deadline), if escalate => {
                stopper.escalate(child);
            }

            // `read_until` keeps partial bytes in `buf` if another branch
            // wins, so `buf` is only cleared after a full line.
            read = output.read_until(b'\n', &mut buf) => {
                match read {
                    Ok(0) => {
                        if !buf.is_empty() {
                            deliver(inner, run_id, &buf);
                        }
                        debug!(run_id, "output stream closed");
                        return Ok(());
                    }
                    Ok(_) => {
                        deliver(inner, run_id, &buf);
                        buf.clear();
                    }
                    Err(e) => return Err(ExecError::Stream(e)),
                }
            }
        }
    }
}

fn deliver(inner: &RunnerInner, run_id: RunId, raw: &[u8]) {
    let line = decode_line(raw);
    if !inner.forward(run_id, &line) {
        trace!(run_id, line = %line, "run no longer active; dropping line");
    }
}

/// Wait for the child to exit, still honouring stop requests and the kill
/// deadline.
async fn reap(child: &mut Child, stopper: &mut Stopper) -> std::io::Result<ExitStatus> {
    loop {
        let (armed, escalate, deadline) = stopper.poll_state();

        tokio::select! {
            status = child.wait() => return status,

            res = &mut stopper.cancel_rx, if armed => {
                stopper.on_cancel(res, child);
            }

            _ = sleep_until(deadline), if escalate => {
                stopper.escalate(child);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, BufReader, ReadBuf};
    use tokio::runtime::Handle;

    use crate::exec::runner::{ProcessRunner, RunnerOptions};
    use crate::sink::ConsoleBuffer;
    use crate::types::{ExecutionMode, RunState};

    /// Yields `data` once, then fails every read.
    struct BrokenPipe {
        data: Option<&'static [u8]>,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.data.take() {
                Some(data) => {
                    buf.put_slice(data);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "pipe broke",
                ))),
            }
        }
    }

    fn runner() -> (ProcessRunner, Arc<ConsoleBuffer>) {
        let buffer = Arc::new(ConsoleBuffer::new());
        let runner = ProcessRunner::new(Handle::current(), buffer.clone(), RunnerOptions::default());
        (runner, buffer)
    }

    #[tokio::test]
    async fn read_error_is_reported_and_run_still_finishes() {
        let (runner, buffer) = runner();
        let inner = Arc::clone(runner.inner());

        let command = Command::new("sleep 0.1").unwrap();
        let (run_id, cancel_rx) = inner.begin(command.clone(), ExecutionMode::OneShot).unwrap();
        let (child, _pipe) = spawn_combined(&inner.options.shell, &command).unwrap();
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(BrokenPipe {
            data: Some(b"first line\n"),
        });
        let output: CombinedOutput = BufReader::new(reader);

        {
            let _guard = WorkerGuard {
                inner: Arc::clone(&inner),
                run_id,
            };
            supervise(&inner, run_id, child, output, cancel_rx).await;
        }

        let lines = buffer.lines();
        assert_eq!(lines.len(), 3, "{lines:?}");
        assert_eq!(lines[1], "first line");
        assert_eq!(lines[2], "ERROR: reading output: pipe broke");
        assert_eq!(runner.state(), RunState::Idle);
        assert_eq!(runner.live_workers(), 0);
    }

    #[tokio::test]
    async fn cancel_before_first_poll_skips_launch() {
        let (runner, buffer) = runner();
        let inner = Arc::clone(runner.inner());
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("launched");

        let command = Command::new(format!("touch '{}'", marker.display())).unwrap();
        let (run_id, cancel_rx) = inner.begin(command.clone(), ExecutionMode::OneShot).unwrap();
        runner.cancel();

        run_worker(Arc::clone(&inner), run_id, command, cancel_rx).await;

        assert!(!marker.exists(), "process was launched after cancel");
        assert_eq!(buffer.len(), 2);
        assert_eq!(runner.state(), RunState::Idle);
        assert_eq!(runner.live_workers(), 0);
    }
}
