//! Clocks and delay descriptors.
//!
//! Executors never sleep on a clock directly. A delayed enqueue names a
//! [`Clock`], and the executor reads `now` once to translate the request into
//! its own notion of time. This module provides:
//! - [`Clock`] and [`ClockInstant`], the capability executors consume,
//! - [`ContinuousClock`] and [`ManualClock`],
//! - [`Delay`], a deadline + tolerance descriptor,
//! - [`sleep`], a task-level suspension built on delayed jobs.

mod clock;
mod delay;
mod sleep;

pub use clock::{Clock, ClockInstant, ContinuousClock, ManualClock};
pub use delay::{Deadline, Delay};

#[doc(inline)]
pub use sleep::{Sleep, sleep};
