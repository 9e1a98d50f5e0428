use std::fmt;

/// Scheduling priority attached to a [`Job`](super::Job).
///
/// Priorities are plain metadata for executors that want to order their
/// queues; the shipped executors are FIFO and only report them in traces.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobPriority(u8);

impl JobPriority {
    pub const BACKGROUND: Self = Self(9);
    pub const UTILITY: Self = Self(17);
    pub const LOW: Self = Self::UTILITY;
    pub const MEDIUM: Self = Self(21);
    pub const USER_INITIATED: Self = Self(25);
    pub const HIGH: Self = Self::USER_INITIATED;

    /// Creates a priority from its raw value.
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw priority value.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl Default for JobPriority {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl fmt::Debug for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BACKGROUND => f.write_str("background"),
            Self::UTILITY => f.write_str("utility"),
            Self::MEDIUM => f.write_str("medium"),
            Self::USER_INITIATED => f.write_str("high"),
            Self(raw) => write!(f, "JobPriority({raw})"),
        }
    }
}
