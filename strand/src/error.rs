//! Contract violations and the fatal termination path.
//!
//! Every condition in this module is a programmer error that would let two
//! isolation domains race. None of them is recoverable: the only way to
//! report one is [`fatal`], which logs the diagnostic and aborts the process.
//! The `try_` flavors of a few bootstrap APIs hand back a
//! [`ContractViolation`] instead, so callers can inspect the condition before
//! deciding to terminate.

use std::panic::Location;
use std::thread::ThreadId;

use thiserror::Error;

/// A violated executor contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// A delayed enqueue reached an executor that cannot schedule.
    #[error("executor {executor} does not support scheduling")]
    SchedulingUnsupported { executor: String },

    /// A registry slot was written after it had been read.
    #[error("{slot} was already read and can no longer be replaced")]
    SlotAlreadyRead { slot: &'static str },

    /// Two threads tried to drive the same run loop.
    #[error("run loop {executor} is already running on {owner:?}")]
    ConcurrentRun { executor: String, owner: ThreadId },

    /// `run_until` is not implemented by this run loop.
    #[error("run(until:) not supported on {executor}")]
    RunUntilUnsupported { executor: String },

    /// Isolation could not be proven for the calling context.
    #[error("unexpected isolation context, expected to be executing on {expected}")]
    UnexpectedIsolation { expected: String },

    /// Isolated state was borrowed again while already borrowed.
    #[error("isolated state of {executor} is already borrowed on this context")]
    ReentrantAccess { executor: String },
}

/// Terminates the process because `violation` happened.
///
/// The diagnostic goes to stderr and to `tracing` at error level. This never
/// unwinds, so no caller can catch and ignore an isolation failure.
#[cold]
#[track_caller]
pub fn fatal(violation: ContractViolation) -> ! {
    let location = Location::caller();

    tracing::error!(%violation, %location, "fatal executor contract violation");
    eprintln!("fatal error: {violation} ({location})");

    std::process::abort()
}
