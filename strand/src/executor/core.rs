use crate::error::{ContractViolation, fatal};
use crate::job::Job;
use crate::time::{Clock, ClockInstant};

use std::any;
use std::time::Duration;

/// Capability to accept and eventually run [`Job`]s.
///
/// # Scheduling
///
/// [`enqueue_after`](Self::enqueue_after) and [`enqueue_at`](Self::enqueue_at)
/// are each implemented in terms of the other by reading `clock.now()`. An
/// executor that supports scheduling overrides one of them (and
/// [`supports_scheduling`](Self::supports_scheduling)); overriding neither
/// recurses forever. Calling either on an executor that does not support
/// scheduling terminates the process: callers must check the flag first.
pub trait Executor: Send + Sync {
    /// Takes ownership of `job` and schedules it to run later.
    ///
    /// Implementations must not run the job on the caller's stack.
    fn enqueue(&self, job: Job);

    /// Whether this is the process-wide main executor.
    ///
    /// The default answers `false`. Serial executors that may be installed
    /// as main executor override it with
    /// [`is_installed_main_executor`](super::is_installed_main_executor).
    fn is_main_executor(&self) -> bool {
        false
    }

    /// Whether the delayed enqueue overloads may be called.
    fn supports_scheduling(&self) -> bool {
        false
    }

    /// Schedules `job` to run once `delay` has elapsed on `clock`.
    fn enqueue_after(
        &self,
        job: Job,
        delay: Duration,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        if !self.supports_scheduling() {
            fatal(ContractViolation::SchedulingUnsupported {
                executor: self.label(),
            });
        }

        self.enqueue_at(job, clock.now().advanced(delay), tolerance, clock);
    }

    /// Schedules `job` to run once `clock` reaches `instant`.
    fn enqueue_at(
        &self,
        job: Job,
        instant: ClockInstant,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        if !self.supports_scheduling() {
            fatal(ContractViolation::SchedulingUnsupported {
                executor: self.label(),
            });
        }

        self.enqueue_after(job, clock.now().duration_to(instant), tolerance, clock);
    }

    /// Name used in diagnostics.
    fn label(&self) -> String {
        any::type_name::<Self>().to_owned()
    }
}
