use crate::executor::EventHandler;

use parking_lot::ReentrantMutex;

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

/// A registered event source of a run loop.
pub(crate) struct EventEntry {
    /// A fire command for this entry is queued and has not been dispatched.
    pending: AtomicBool,

    /// Cleared by deregistration. Held for the whole handler invocation, so
    /// a deregistration from another thread waits for an in-flight handler,
    /// while the handler itself may still deregister (same thread).
    registered: ReentrantMutex<Cell<bool>>,

    handler: EventHandler,
}

impl EventEntry {
    pub(crate) fn new(handler: EventHandler) -> Self {
        Self {
            pending: AtomicBool::new(false),
            registered: ReentrantMutex::new(Cell::new(true)),
            handler,
        }
    }

    /// Marks the entry pending.
    ///
    /// Returns `true` only on the transition, i.e. when the caller has to
    /// queue a fire command.
    pub(crate) fn mark_pending(&self) -> bool {
        !self.pending.swap(true, Ordering::AcqRel)
    }

    /// Runs the handler unless the entry was deregistered.
    ///
    /// The pending flag is cleared first, so a notification arriving while
    /// the handler runs queues exactly one more invocation.
    pub(crate) fn dispatch(&self) {
        self.pending.store(false, Ordering::Release);

        let registered = self.registered.lock();
        if registered.get() {
            (self.handler)();
        }
    }

    /// Stops future invocations. Waits for an invocation in flight on
    /// another thread.
    pub(crate) fn deregister(&self) {
        self.registered.lock().set(false);
    }
}
