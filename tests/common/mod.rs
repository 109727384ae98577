#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use diaghub::exec::{ProcessRunner, RunnerOptions};
use diaghub::types::BusyPolicy;

pub use diaghub_test_utils::recording_sink::{is_error, is_started};
pub use diaghub_test_utils::{RecordingSink, init_tracing, with_timeout};

/// Options with a short grace period so cancellation tests stay fast.
pub fn fast_options() -> RunnerOptions {
    RunnerOptions {
        grace_period: Duration::from_millis(300),
        ..RunnerOptions::default()
    }
}

pub fn runner_with(options: RunnerOptions) -> (ProcessRunner, RecordingSink) {
    let sink = RecordingSink::new();
    let runner = ProcessRunner::new(Handle::current(), Arc::new(sink.clone()), options);
    (runner, sink)
}

pub fn runner() -> (ProcessRunner, RecordingSink) {
    runner_with(fast_options())
}

pub fn replacing_runner() -> (ProcessRunner, RecordingSink) {
    runner_with(RunnerOptions {
        busy_policy: BusyPolicy::Replace,
        ..fast_options()
    })
}
