use crate::job::Job;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Roughly thirty years; stands in for "never" when a deadline overflows.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Converts a delay into a deadline on the monotonic clock.
pub(crate) fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();

    now.checked_add(delay).unwrap_or(now + FAR_FUTURE)
}

/// A delayed job waiting for its deadline.
pub(crate) struct TimerEntry {
    /// Earliest point at which the job may run.
    pub(crate) deadline: Instant,

    /// How late the job may run; `None` means no slack.
    pub(crate) tolerance: Option<Duration>,

    /// Insertion order, so coincident deadlines fire FIFO.
    seq: u64,

    pub(crate) job: Job,
}

impl TimerEntry {
    /// Latest point at which this entry should have fired.
    fn latest(&self) -> Instant {
        match self.tolerance {
            Some(tolerance) => self.deadline.checked_add(tolerance).unwrap_or(self.deadline),
            None => self.deadline,
        }
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed, so a `BinaryHeap<TimerEntry>` pops the earliest deadline
    /// first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of delayed jobs.
#[derive(Default)]
pub(crate) struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, deadline: Instant, tolerance: Option<Duration>, job: Job) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(TimerEntry {
            deadline,
            tolerance,
            seq,
            job,
        });
    }

    /// When the owner should wake up next.
    ///
    /// This is the earliest "latest acceptable firing time" over all entries.
    /// Waking then fires every entry whose deadline has passed in one batch,
    /// which is where tolerance buys coalescing.
    pub(crate) fn next_wake(&self) -> Option<Instant> {
        self.heap.iter().map(TimerEntry::latest).min()
    }

    /// Removes and returns the jobs whose deadline is at or before `now`, in
    /// deadline order.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Vec<Job> {
        let mut due = Vec::new();

        while let Some(entry) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }

            if let Some(entry) = self.heap.pop() {
                due.push(entry.job);
            }
        }

        due
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

enum Command {
    Schedule {
        deadline: Instant,
        tolerance: Option<Duration>,
        job: Job,
    },
    Shutdown,
}

/// A thread that holds delayed jobs until they are due and then hands them
/// to a sink (typically an executor's own queue).
pub(crate) struct TimerDriver {
    sender: Mutex<Sender<Command>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TimerDriver {
    /// Starts the timer thread. Due jobs are passed to `fire` on that thread.
    pub(crate) fn start<F>(name: String, fire: F) -> Self
    where
        F: Fn(Job) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || drive(receiver, fire))
            .expect("failed to spawn timer thread");

        Self {
            sender: Mutex::new(sender),
            handle: Mutex::new(Some(handle)),
        }
    }

    pub(crate) fn schedule(&self, deadline: Instant, tolerance: Option<Duration>, job: Job) {
        let command = Command::Schedule {
            deadline,
            tolerance,
            job,
        };

        if self.sender.lock().send(command).is_err() {
            tracing::debug!("timer thread is gone, dropping delayed job");
        }
    }

    /// Stops the timer thread, dropping jobs that are not yet due.
    pub(crate) fn shutdown(&self) {
        let _ = self.sender.lock().send(Command::Shutdown);

        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn drive<F>(receiver: Receiver<Command>, fire: F)
where
    F: Fn(Job),
{
    let mut timers = TimerQueue::new();

    loop {
        let command = match timers.next_wake() {
            Some(wake) => {
                let timeout = wake.saturating_duration_since(Instant::now());
                receiver.recv_timeout(timeout)
            }
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match command {
            Ok(Command::Schedule {
                deadline,
                tolerance,
                job,
            }) => {
                timers.push(deadline, tolerance, job);
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                if !timers.is_empty() {
                    tracing::debug!(
                        pending = timers.len(),
                        "timer thread stopping with pending jobs"
                    );
                }
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        for job in timers.pop_due(Instant::now()) {
            fire(job);
        }
    }
}
