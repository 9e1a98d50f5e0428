#![allow(dead_code)]

use strand::{Job, JobPriority};

use std::env;
use std::process::Command;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Set in the environment of the child process spawned by `expect_fatal`.
const FATAL_CHILD: &str = "STRAND_FATAL_CHILD";

/// Asserts that `body` terminates the process with `needle` in the
/// diagnostic.
///
/// The test binary re-runs itself filtered to `test_name`; the child sees
/// the marker and runs `body`, the parent checks how the child ended.
/// `test_name` is the full path of the calling test as the harness prints it.
pub fn expect_fatal(test_name: &str, needle: &str, body: impl FnOnce()) {
    if env::var_os(FATAL_CHILD).is_some() {
        body();

        // Reaching this point means nothing was fatal.
        std::process::exit(0);
    }

    let output = Command::new(env::current_exe().unwrap())
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(FATAL_CHILD, "1")
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        !output.status.success(),
        "`{test_name}` exited normally, expected a fatal error\nstderr:\n{stderr}"
    );
    assert!(
        stderr.contains("fatal error:"),
        "`{test_name}` did not end through the fatal path\nstderr:\n{stderr}"
    );
    assert!(
        stderr.contains(needle),
        "`{test_name}` diagnostic does not mention {needle:?}\nstderr:\n{stderr}"
    );
}

/// A job that sends `value` on `sender` when it runs.
pub fn signal<T: Send + 'static>(sender: &Sender<T>, value: T) -> Job {
    let sender = sender.clone();

    Job::new(JobPriority::MEDIUM, move || {
        let _ = sender.send(value);
    })
}

/// Collects `count` values, failing the test after `timeout`.
pub fn collect<T>(receiver: &Receiver<T>, count: usize, timeout: Duration) -> Vec<T> {
    (0..count)
        .map(|i| {
            receiver
                .recv_timeout(timeout)
                .unwrap_or_else(|_| panic!("timed out waiting for value {i} of {count}"))
        })
        .collect()
}

pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    mpsc::channel()
}

pub const TIMEOUT: Duration = Duration::from_secs(5);
