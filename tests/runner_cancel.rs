#![cfg(unix)]

mod common;
use crate::common::{
    RecordingSink, fast_options, init_tracing, is_started, replacing_runner, runner, with_timeout,
};

use std::error::Error;
use std::sync::{Arc, Barrier, OnceLock};
use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use diaghub::command::Command;
use diaghub::exec::ProcessRunner;
use diaghub::exec::notice::INTERRUPTED;
use diaghub::sink::OutputSink;
use diaghub::types::{ExecutionMode, RunState};

type TestResult = Result<(), Box<dyn Error>>;

const TICKER: &str = "while true; do echo tick; sleep 0.05; done";

#[tokio::test]
async fn cancel_interrupts_continuous_command() -> TestResult {
    init_tracing();
    let (runner, sink) = runner();

    runner.run(Command::new(TICKER)?, ExecutionMode::Continuous)?;
    sink.wait_for_line(|l| l == "tick").await;

    runner.cancel();
    assert_eq!(runner.state(), RunState::Idle);
    assert!(runner.active_command().is_none());

    with_timeout(runner.wait_reaped()).await;

    let lines = sink.lines();
    assert!(lines[0].contains("] Started continuous: "), "{}", lines[0]);
    assert_eq!(sink.count(|l| l == INTERRUPTED), 1);
    // Nothing from the cancelled run may follow the notice.
    assert_eq!(lines.last().map(String::as_str), Some(INTERRUPTED));
    Ok(())
}

#[tokio::test]
async fn immediate_cancel_reaps_within_grace_period() -> TestResult {
    init_tracing();
    let (runner, sink) = runner();

    runner.run(Command::new("sleep 30")?, ExecutionMode::Continuous)?;
    runner.cancel();

    let bound = fast_options().grace_period + Duration::from_secs(2);
    tokio::time::timeout(bound, runner.wait_reaped()).await?;

    let lines = sink.lines();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(is_started(&lines[0]));
    assert_eq!(lines[1], INTERRUPTED);
    Ok(())
}

#[tokio::test]
async fn cancel_while_idle_is_a_silent_noop() -> TestResult {
    init_tracing();
    let (runner, sink) = runner();

    for _ in 0..3 {
        runner.cancel();
    }

    assert!(sink.is_empty());
    assert_eq!(runner.state(), RunState::Idle);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_cancels_interrupt_once() -> TestResult {
    init_tracing();
    let (runner, sink) = runner();
    runner.run(Command::new("sleep 30")?, ExecutionMode::Continuous)?;

    let callers = 6;
    let barrier = Arc::new(Barrier::new(callers));
    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let runner = runner.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                runner.cancel();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(sink.count(|l| l == INTERRUPTED), 1);
    with_timeout(runner.wait_reaped()).await;
    Ok(())
}

#[tokio::test]
async fn process_ignoring_terminate_is_killed_after_grace() -> TestResult {
    init_tracing();
    let (runner, sink) = runner();

    let script = "trap '' TERM; echo ready; while true; do sleep 0.05; done";
    runner.run(Command::new(script)?, ExecutionMode::Continuous)?;
    sink.wait_for_line(|l| l == "ready").await;

    let started = Instant::now();
    runner.cancel();
    with_timeout(runner.wait_reaped()).await;

    let grace = fast_options().grace_period;
    assert!(
        started.elapsed() >= grace.mul_f32(0.8),
        "reaped after {:?}, before the grace period",
        started.elapsed()
    );
    assert_eq!(runner.live_workers(), 0);
    Ok(())
}

#[tokio::test]
async fn new_run_is_accepted_right_after_cancel() -> TestResult {
    init_tracing();
    let (runner, sink) = runner();

    runner.run(Command::new(TICKER)?, ExecutionMode::Continuous)?;
    sink.wait_for_line(|l| l == "tick").await;
    runner.cancel();

    runner.run(Command::new("echo next")?, ExecutionMode::OneShot)?;
    with_timeout(runner.wait_idle()).await;
    with_timeout(runner.wait_reaped()).await;

    let lines = sink.lines();
    let interrupted_at = lines.iter().position(|l| l == INTERRUPTED).unwrap();
    let after: Vec<_> = lines[interrupted_at + 1..].to_vec();
    assert_eq!(after.len(), 2, "{lines:?}");
    assert!(after[0].ends_with("] Running: echo next"));
    assert_eq!(after[1], "next");
    Ok(())
}

#[tokio::test]
async fn replace_policy_interrupts_the_active_command() -> TestResult {
    init_tracing();
    let (runner, sink) = replacing_runner();

    let first = runner.run(Command::new(TICKER)?, ExecutionMode::Continuous)?;
    sink.wait_for_line(|l| l == "tick").await;

    let second = runner.run(Command::new("echo replaced")?, ExecutionMode::OneShot)?;
    assert!(second > first);

    with_timeout(runner.wait_idle()).await;
    with_timeout(runner.wait_reaped()).await;

    let lines = sink.lines();
    let interrupted_at = lines.iter().position(|l| l == INTERRUPTED).unwrap();
    let after = &lines[interrupted_at + 1..];
    assert_eq!(after.len(), 2, "{lines:?}");
    assert!(after[0].ends_with("] Running: echo replaced"));
    assert_eq!(after[1], "replaced");
    assert!(!after.iter().any(|l| l == "tick"));
    Ok(())
}

/// Cancels the run from inside `append` when it sees `trigger`.
struct CancelOnLine {
    trigger: &'static str,
    runner: OnceLock<ProcessRunner>,
    seen: RecordingSink,
}

impl OutputSink for CancelOnLine {
    fn append(&self, line: &str) {
        self.seen.append(line);
        if line == self.trigger {
            if let Some(runner) = self.runner.get() {
                runner.cancel();
            }
        }
    }
}

#[tokio::test]
async fn sink_can_cancel_from_append() -> TestResult {
    init_tracing();
    let seen = RecordingSink::new();
    let sink = Arc::new(CancelOnLine {
        trigger: "stop",
        runner: OnceLock::new(),
        seen: seen.clone(),
    });
    let runner = ProcessRunner::new(Handle::current(), sink.clone(), fast_options());
    sink.runner.set(runner.clone()).unwrap();

    runner.run(Command::new("echo stop; sleep 30")?, ExecutionMode::Continuous)?;
    with_timeout(runner.wait_reaped()).await;

    let lines = seen.lines();
    assert_eq!(lines.len(), 3, "{lines:?}");
    assert!(is_started(&lines[0]));
    assert_eq!(lines[1], "stop");
    assert_eq!(lines[2], INTERRUPTED);
    assert_eq!(runner.state(), RunState::Idle);

    // The runner is still usable afterwards.
    runner.run(Command::new("echo again")?, ExecutionMode::OneShot)?;
    with_timeout(runner.wait_idle()).await;
    assert_eq!(seen.lines().last().map(String::as_str), Some("again"));
    Ok(())
}
