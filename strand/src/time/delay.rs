use super::{Clock, ClockInstant};
use crate::executor::Executor;
use crate::job::Job;

use std::time::Duration;

/// When a delayed job becomes eligible to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Relative to the clock's `now` at enqueue time.
    After(Duration),
    /// An absolute instant on the clock.
    At(ClockInstant),
}

/// A delay descriptor: a deadline plus the slack the caller accepts.
///
/// `tolerance == None` asks for no slack. Executors may still fire a little
/// late, but never before the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    deadline: Deadline,
    tolerance: Option<Duration>,
}

impl Delay {
    pub fn after(delay: Duration) -> Self {
        Self {
            deadline: Deadline::After(delay),
            tolerance: None,
        }
    }

    pub fn at(instant: ClockInstant) -> Self {
        Self {
            deadline: Deadline::At(instant),
            tolerance: None,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    pub fn tolerance(&self) -> Option<Duration> {
        self.tolerance
    }

    /// The absolute instant this delay resolves to on `clock`.
    pub fn instant(&self, clock: &dyn Clock) -> ClockInstant {
        match self.deadline {
            Deadline::After(delay) => clock.now().advanced(delay),
            Deadline::At(instant) => instant,
        }
    }

    /// How long from `clock`'s current reading until the deadline.
    pub fn remaining(&self, clock: &dyn Clock) -> Duration {
        match self.deadline {
            Deadline::After(delay) => delay,
            Deadline::At(instant) => clock.now().duration_to(instant),
        }
    }

    /// Enqueues `job` on `executor` using the overload matching this
    /// descriptor's deadline.
    ///
    /// Terminates the process if `executor` does not support scheduling.
    pub fn enqueue<E>(&self, executor: &E, job: Job, clock: &dyn Clock)
    where
        E: Executor + ?Sized,
    {
        match self.deadline {
            Deadline::After(delay) => executor.enqueue_after(job, delay, self.tolerance, clock),
            Deadline::At(instant) => executor.enqueue_at(job, instant, self.tolerance, clock),
        }
    }
}
