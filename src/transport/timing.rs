//! Timeout policy and deadline arithmetic.
//!
//! A [`TimeoutPolicy`] is the per-transport setting; a [`Deadline`] is the
//! absolute instant derived from it when a blocking step starts.

use std::fmt;
use std::time::{Duration, Instant};

use crate::core::constants::NO_TIMEOUT_MS;

/// Millisecond timeout attached to a transport. Zero means block forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeoutPolicy {
    millis: u64,
}

impl TimeoutPolicy {
    /// Block indefinitely.
    pub const INFINITE: TimeoutPolicy = TimeoutPolicy {
        millis: NO_TIMEOUT_MS,
    };

    /// Policy from milliseconds; `0` is infinite.
    pub const fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Policy from a duration, rounded up to whole milliseconds.
    ///
    /// A zero duration is infinite, same as `from_millis(0)`.
    pub fn from_duration(duration: Duration) -> Self {
        let nanos = duration.as_nanos();
        let millis = nanos.div_ceil(1_000_000);
        Self {
            millis: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }

    /// Configured milliseconds; `0` is infinite.
    pub const fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Whether blocking calls wait forever.
    pub const fn is_infinite(&self) -> bool {
        self.millis == NO_TIMEOUT_MS
    }

    /// The bound as a duration, or `None` when infinite.
    pub fn duration(&self) -> Option<Duration> {
        if self.is_infinite() {
            None
        } else {
            Some(Duration::from_millis(self.millis))
        }
    }

    /// Deadline for a blocking step starting now.
    pub fn deadline(&self) -> Deadline {
        self.deadline_from(Instant::now())
    }

    /// Deadline for a blocking step starting at `start`.
    pub fn deadline_from(&self, start: Instant) -> Deadline {
        match self.duration() {
            None => Deadline::Never,
            Some(bound) => start
                .checked_add(bound)
                .map_or(Deadline::Never, Deadline::At),
        }
    }
}

impl From<Duration> for TimeoutPolicy {
    fn from(duration: Duration) -> Self {
        Self::from_duration(duration)
    }
}

impl fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str("infinite")
        } else {
            write!(f, "{}ms", self.millis)
        }
    }
}

/// Absolute point after which a wait gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// No bound.
    Never,
    /// Give up at this instant.
    At(Instant),
}

impl Deadline {
    /// Time left, or `None` for no bound. Saturates at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining_at(Instant::now())
    }

    /// Time left as seen from `now`.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        match self {
            Deadline::Never => None,
            Deadline::At(at) => Some(at.saturating_duration_since(now)),
        }
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Remaining time as a `poll(2)` timeout: `-1` for no bound, otherwise
    /// milliseconds rounded up so a wait never ends before the deadline.
    pub(crate) fn poll_timeout(&self) -> i32 {
        match self.remaining() {
            None => -1,
            Some(left) => {
                let millis = left.as_nanos().div_ceil(1_000_000);
                i32::try_from(millis).unwrap_or(i32::MAX)
            }
        }
    }
}
