//! Virtual time for waits and deadlines
//!
//! Nothing in this workspace reads a wall clock. The runtime owns a
//! virtual clock, callers turn "give up after d" into a [`Deadline`]
//! once, and every subsequent check compares against [`Instant`]s the
//! runtime hands out. Simulated runtimes advance the clock explicitly,
//! which is what makes timeout behavior reproducible in tests.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A reading of the runtime clock
///
/// Opaque outside of arithmetic: an instant only means something
/// relative to other instants from the same runtime. The clock never
/// runs backwards, and arithmetic saturates rather than wrapping, so a
/// deadline pushed past the representable range simply never expires
/// early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instant {
    nanos: u64,
}

impl Instant {
    /// The clock's starting point
    ///
    /// Fresh simulated runtimes begin here.
    pub const fn epoch() -> Self {
        Self { nanos: 0 }
    }

    /// Reconstructs an instant from a raw nanosecond reading
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// The raw nanosecond reading
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// How much time passed since `earlier`
    ///
    /// Clamps to zero if `earlier` is actually later; elapsed time is
    /// never negative.
    pub fn duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(earlier.nanos))
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, wait: Duration) -> Self::Output {
        Instant::from_nanos(self.nanos.saturating_add(wait.as_nanos()))
    }
}

impl Sub<Duration> for Instant {
    type Output = Instant;

    fn sub(self, wait: Duration) -> Self::Output {
        Instant::from_nanos(self.nanos.saturating_sub(wait.as_nanos()))
    }
}

/// A span of time
///
/// This is what callers hand to a receive or an await: how long they
/// are prepared to wait. Distinct from [`Instant`] by type, so a wait
/// can never be confused with a point on the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Duration {
    nanos: u64,
}

impl Duration {
    /// The empty wait: a poll that must not block
    pub const ZERO: Duration = Duration { nanos: 0 };

    /// A span counted in nanoseconds
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// A span counted in microseconds
    pub const fn from_micros(micros: u64) -> Self {
        Self {
            nanos: micros * NANOS_PER_MICRO,
        }
    }

    /// A span counted in milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis * NANOS_PER_MILLI,
        }
    }

    /// A span counted in seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            nanos: secs * NANOS_PER_SEC,
        }
    }

    /// The span in nanoseconds
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// The span in whole milliseconds, truncating
    pub const fn as_millis(&self) -> u64 {
        self.nanos / NANOS_PER_MILLI
    }

    /// The span in whole seconds, truncating
    pub const fn as_secs(&self) -> u64 {
        self.nanos / NANOS_PER_SEC
    }

    /// Whether this is the empty wait
    pub const fn is_zero(&self) -> bool {
        self.nanos == 0
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, other: Duration) -> Self::Output {
        Duration::from_nanos(self.nanos.saturating_add(other.nanos))
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, other: Duration) -> Self::Output {
        Duration::from_nanos(self.nanos.saturating_sub(other.nanos))
    }
}

/// A point in time at which an operation should give up
///
/// Deadlines are computed once from a start instant and a delay, then
/// checked against the runtime clock; they do not drift as individual
/// waits consume time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Creates a deadline `delay` after `start`
    pub fn after(start: Instant, delay: Duration) -> Self {
        Self { at: start + delay }
    }

    /// Returns the absolute expiry instant
    pub fn at(&self) -> Instant {
        self.at
    }

    /// Checks whether the deadline has passed at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.at
    }

    /// Returns the time remaining at `now`, or zero if expired
    pub fn remaining(&self, now: Instant) -> Duration {
        self.at.duration_since(now)
    }
}
