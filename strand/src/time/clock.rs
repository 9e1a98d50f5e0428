use once_cell::sync::Lazy;
use parking_lot::Mutex;

use std::fmt;
use std::time::{Duration, Instant};

/// Reference point of [`ContinuousClock`], fixed on first use.
static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// A point in time on some [`Clock`].
///
/// Instants are stored as an offset from the owning clock's reference point,
/// so they only compare meaningfully with instants read from the same clock.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockInstant(Duration);

impl ClockInstant {
    /// Creates an instant `offset` after the clock's reference point.
    pub const fn from_offset(offset: Duration) -> Self {
        Self(offset)
    }

    /// The offset of this instant from the clock's reference point.
    pub const fn offset(self) -> Duration {
        self.0
    }

    /// Returns the instant `by` later than this one, saturating at the far
    /// future.
    pub fn advanced(self, by: Duration) -> Self {
        Self(self.0.checked_add(by).unwrap_or(Duration::MAX))
    }

    /// Returns the duration from this instant to `other`.
    ///
    /// Instants in the past saturate to [`Duration::ZERO`].
    pub fn duration_to(self, other: Self) -> Duration {
        other.0.saturating_sub(self.0)
    }
}

impl fmt::Debug for ClockInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClockInstant(+{:?})", self.0)
    }
}

/// A source of [`ClockInstant`]s.
///
/// This is the only time capability executors consume: they read `now` to
/// translate between "after a delay" and "at an instant" requests.
pub trait Clock: Send + Sync {
    fn now(&self) -> ClockInstant;
}

/// Monotonic wall-time clock that keeps counting while the process runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuousClock;

impl ContinuousClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for ContinuousClock {
    fn now(&self) -> ClockInstant {
        ClockInstant(EPOCH.elapsed())
    }
}

/// A clock that only moves when told to.
///
/// Useful to pin `now` while comparing delayed enqueue requests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at its reference point.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock frozen at `instant`.
    pub fn starting_at(instant: ClockInstant) -> Self {
        Self {
            now: Mutex::new(instant.offset()),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = now.checked_add(by).unwrap_or(Duration::MAX);
    }

    /// Moves the clock to `instant`. Going backwards is allowed.
    pub fn set(&self, instant: ClockInstant) {
        *self.now.lock() = instant.offset();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> ClockInstant {
        ClockInstant(*self.now.lock())
    }
}
