//! Millisecond timestamps.

use core::fmt;

/// A point in time, in milliseconds since boot.
///
/// All board-core bookkeeping (press, hold and release times, SES event
/// windows) runs at millisecond granularity; the clock source is read in
/// nanoseconds and truncated with [`Timestamp::from_nanos`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The boot instant.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from milliseconds since boot.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Creates a timestamp from a nanosecond clock reading.
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns / 1_000_000)
    }

    /// Returns milliseconds since boot.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, or zero if `earlier`
    /// is in the future.
    pub const fn saturating_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns `self` advanced by `ms` milliseconds.
    #[must_use]
    pub const fn add_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
