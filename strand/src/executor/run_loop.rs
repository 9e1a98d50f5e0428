use super::{Executor, SerialExecutor};
use crate::error::{ContractViolation, fatal};

use std::fmt;

/// An executor that owns a blocking run loop.
pub trait RunLoopExecutor: Executor {
    /// Blocks the calling thread, running enqueued jobs until
    /// [`stop`](Self::stop) is called.
    ///
    /// Nested calls on the same thread are allowed. Calling `run` on one
    /// instance from two threads at once terminates the process.
    fn run(&self);

    /// Like [`run`](Self::run), but also returns once `condition` holds.
    ///
    /// Optional. The default terminates the process rather than silently
    /// degrading to `run`.
    fn run_until(&self, condition: &mut dyn FnMut() -> bool) {
        let _ = condition;

        fatal(ContractViolation::RunUntilUnsupported {
            executor: self.label(),
        })
    }

    /// Asks the innermost active [`run`](Self::run) to return.
    ///
    /// Does not wait for the loop to acknowledge and does not interrupt a job
    /// that is already running.
    fn stop(&self);
}

/// Token identifying an event source registered with an
/// [`EventableExecutor`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExecutorEvent {
    id: u64,
}

impl ExecutorEvent {
    pub const fn new(id: u64) -> Self {
        Self { id }
    }

    pub const fn id(self) -> u64 {
        self.id
    }
}

impl fmt::Debug for ExecutorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecutorEvent({:#x})", self.id)
    }
}

/// Handler invoked when a registered event fires.
pub type EventHandler = Box<dyn Fn() + Send + Sync + 'static>;

/// An executor that can be woken by coalesced external events.
pub trait EventableExecutor {
    /// Registers `handler` and returns a fresh, never reused token for it.
    fn register_event(&self, handler: EventHandler) -> ExecutorEvent;

    /// Unregisters `event`.
    ///
    /// Once this returns, no invocation of the handler will begin. An
    /// invocation already in flight may still complete.
    fn deregister(&self, event: ExecutorEvent);

    /// Requests that the handler of `event` runs eventually.
    ///
    /// Notifications that arrive before the handler gets to run may be
    /// coalesced into one invocation. Unknown or deregistered events are
    /// ignored.
    fn notify(&self, event: ExecutorEvent);
}

/// The executor bound to the process's primary thread.
pub trait MainExecutor: RunLoopExecutor + SerialExecutor + EventableExecutor {}
