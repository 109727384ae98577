// src/exec/runner.rs

//! The single-slot process runner.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

use crate::command::Command;
use crate::errors::{DiaghubError, Result, RunError};
use crate::exec::notice;
use crate::exec::shell::Shell;
use crate::exec::worker::run_worker;
use crate::sink::OutputSink;
use crate::types::{BusyPolicy, ExecutionMode, RunState};

/// Identifies one execution. Strictly increasing per runner.
pub type RunId = u64;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Tunables for a [`ProcessRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    pub shell: Shell,
    /// Time between the terminate request and a hard kill.
    pub grace_period: Duration,
    pub busy_policy: BusyPolicy,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            shell: Shell::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            busy_policy: BusyPolicy::default(),
        }
    }
}

/// The run currently occupying the slot.
///
/// - `cancel` tells the worker that owns the OS child to stop it. The child
///   itself never leaves the worker.
struct ActiveRun {
    run_id: RunId,
    command: Command,
    mode: ExecutionMode,
    cancel: Option<oneshot::Sender<()>>,
}

/// Everything guarded by the runner's one mutex.
///
/// - `outbox` holds sink lines in the order they were accepted. Lines are
///   queued under the lock and appended to the sink with the lock released,
///   so a sink may call back into the runner.
/// - `draining` is set while some caller is appending from `outbox`; other
///   callers only queue.
#[derive(Default)]
struct Slot {
    last_run_id: RunId,
    active: Option<ActiveRun>,
    outbox: VecDeque<String>,
    draining: bool,
}

fn owns(slot: &Slot, run_id: RunId) -> bool {
    slot.active.as_ref().is_some_and(|a| a.run_id == run_id)
}

/// Clears `Slot::draining` if a sink panics mid-drain.
struct DrainFlag<'a> {
    inner: &'a RunnerInner,
    cleared: bool,
}

impl Drop for DrainFlag<'_> {
    fn drop(&mut self) {
        if !self.cleared {
            self.inner.lock_slot().draining = false;
        }
    }
}

pub(crate) struct RunnerInner {
    slot: Mutex<Slot>,
    state_tx: watch::Sender<RunState>,
    /// Number of workers whose child has not been reaped yet.
    workers_tx: watch::Sender<usize>,
    sink: Arc<dyn OutputSink>,
    pub(crate) options: RunnerOptions,
    runtime: Handle,
}

/// Runs at most one external command at a time and streams its output to an
/// [`OutputSink`].
///
/// `run` and `cancel` are synchronous and never wait on the process: the
/// child is launched, drained and reaped by a worker task on the tokio
/// runtime the runner was built with. Cloning is cheap and every clone
/// drives the same slot.
#[derive(Clone)]
pub struct ProcessRunner {
    inner: Arc<RunnerInner>,
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("state", &self.state())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    /// Build a runner whose workers are spawned on `runtime`.
    pub fn new(runtime: Handle, sink: Arc<dyn OutputSink>, options: RunnerOptions) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        let (workers_tx, _) = watch::channel(0usize);

        Self {
            inner: Arc::new(RunnerInner {
                slot: Mutex::new(Slot::default()),
                state_tx,
                workers_tx,
                sink,
                options,
                runtime,
            }),
        }
    }

    /// Build a runner on the tokio runtime of the calling context.
    pub fn from_current(sink: Arc<dyn OutputSink>, options: RunnerOptions) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| DiaghubError::Other(e.into()))?;
        Ok(Self::new(runtime, sink, options))
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.inner.options
    }

    /// Start `command` unless another one is active.
    ///
    /// On success the slot is `Running`, the "started" line has been passed
    /// to the sink (or queued behind lines another caller is delivering) and
    /// a worker has been spawned. The process itself is
    /// launched by the worker; a launch failure shows up on the sink, not
    /// here.
    pub fn run(&self, command: Command, mode: ExecutionMode) -> std::result::Result<RunId, RunError> {
        let (run_id, cancel_rx) = self.inner.begin(command.clone(), mode)?;
        self.inner
            .runtime
            .spawn(run_worker(Arc::clone(&self.inner), run_id, command, cancel_rx));
        Ok(run_id)
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<RunnerInner> {
        &self.inner
    }

    /// Interrupt the active command, if any.
    ///
    /// The slot is `Idle` when this returns. The process is asked to
    /// terminate and is reaped by its worker in the background; use
    /// [`wait_reaped`](Self::wait_reaped) to wait for that.
    pub fn cancel(&self) {
        let mut slot = self.inner.lock_slot();
        if slot.active.is_none() {
            debug!("cancel requested while idle; nothing to do");
            return;
        }
        self.inner.interrupt(&mut slot);
        self.inner.flush(slot);
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn state(&self) -> RunState {
        *self.inner.state_tx.borrow()
    }

    /// Command and mode of the active run.
    pub fn active_command(&self) -> Option<(Command, ExecutionMode)> {
        self.inner
            .lock_slot()
            .active
            .as_ref()
            .map(|a| (a.command.clone(), a.mode))
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.inner.state_tx.subscribe()
    }

    /// Number of started processes not yet reaped.
    pub fn live_workers(&self) -> usize {
        *self.inner.workers_tx.borrow()
    }

    /// Resolve once the slot is `Idle`.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.state_tx.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = rx.wait_for(|state| *state == RunState::Idle).await;
    }

    /// Resolve once every process this runner started has exited and been
    /// reaped.
    pub async fn wait_reaped(&self) {
        let mut rx = self.inner.workers_tx.subscribe();
        let _ = rx.wait_for(|live| *live == 0).await;
    }
}

impl RunnerInner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for `command` and queue its "started" line.
    ///
    /// On success the slot is `Running` and the live-worker count already
    /// includes the run; the caller must hand the receiver to a worker.
    pub(crate) fn begin(
        &self,
        command: Command,
        mode: ExecutionMode,
    ) -> std::result::Result<(RunId, oneshot::Receiver<()>), RunError> {
        let mut slot = self.lock_slot();

        if let Some(active) = &slot.active {
            match self.options.busy_policy {
                BusyPolicy::Reject => {
                    debug!(
                        active_run = active.run_id,
                        cmd = %command,
                        "command already running; rejecting new request"
                    );
                    return Err(RunError::AlreadyRunning);
                }
                BusyPolicy::Replace => {
                    info!(
                        active_run = active.run_id,
                        cmd = %command,
                        "command already running; replacing it"
                    );
                    self.interrupt(&mut slot);
                }
            }
        }

        slot.last_run_id += 1;
        let run_id = slot.last_run_id;
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        slot.outbox.push_back(notice::started(&command, mode));
        info!(run_id, cmd = %command, %mode, "starting command");
        slot.active = Some(ActiveRun {
            run_id,
            command,
            mode,
            cancel: Some(cancel_tx),
        });
        self.state_tx.send_replace(RunState::Running);
        self.workers_tx.send_modify(|n| *n += 1);

        self.flush(slot);
        Ok((run_id, cancel_rx))
    }

    /// Append queued lines to the sink, in order, with the lock released.
    ///
    /// Returns at once if another caller is already draining; that caller
    /// picks up whatever was queued here. Lines queued by the sink itself
    /// (e.g. a `cancel` from inside `append`) are delivered by this loop.
    fn flush<'a>(&'a self, mut slot: MutexGuard<'a, Slot>) {
        if slot.draining {
            return;
        }
        slot.draining = true;
        let mut flag = DrainFlag {
            inner: self,
            cleared: false,
        };

        loop {
            let Some(line) = slot.outbox.pop_front() else {
                slot.draining = false;
                flag.cleared = true;
                return;
            };
            drop(slot);
            self.sink.append(&line);
            slot = self.lock_slot();
        }
    }

    /// Empty the slot, announce the interruption and signal the worker.
    fn interrupt(&self, slot: &mut Slot) {
        let Some(mut active) = slot.active.take() else {
            return;
        };

        self.state_tx.send_replace(RunState::Idle);
        slot.outbox.push_back(notice::INTERRUPTED.to_string());
        info!(run_id = active.run_id, cmd = %active.command, "command interrupted");

        if let Some(cancel) = active.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(
                    run_id = active.run_id,
                    "worker already finished while cancelling"
                );
            }
        }
    }

    /// Forward a line of run `run_id` to the sink, if that run still owns
    /// the slot. Returns whether the line was accepted.
    pub(crate) fn forward(&self, run_id: RunId, line: &str) -> bool {
        let mut slot = self.lock_slot();
        if !owns(&slot, run_id) {
            return false;
        }
        slot.outbox.push_back(line.to_string());
        self.flush(slot);
        true
    }

    /// Return the slot to `Idle` if run `run_id` still owns it.
    pub(crate) fn finish(&self, run_id: RunId) -> bool {
        let mut slot = self.lock_slot();
        if !owns(&slot, run_id) {
            return false;
        }
        slot.active = None;
        self.state_tx.send_replace(RunState::Idle);
        true
    }

    pub(crate) fn worker_exited(&self) {
        self.workers_tx.send_modify(|n| *n = n.saturating_sub(1));
    }
}
