//! Time representations used by the message-filtering subsystem.
//!
//! Two distinct notions of time are in play: [`Timestamp`], wall-clock time used only for
//! negotiating a federation's start-of-simulation instant, and [`Time`], the simulated
//! delivery time carried on every [`crate::message::Message`] and compared by filters,
//! the timer, and the time-lock invariant. The time-coordinator that actually grants
//! simulated time to federates is an external collaborator; this crate only needs a
//! totally ordered, monotone-comparable representation of it.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Wall-clock instant, represented as the duration since the UNIX epoch. Used only for
/// start-time negotiation between the broker and its federates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("system time before UNIX epoch"),
        )
    }

    pub fn offset(&self, offset: Duration) -> Self {
        Self(self.0 + offset)
    }

    pub fn checked_duration_since(&self, earlier: Self) -> Option<Duration> {
        self.0.checked_sub(earlier.0)
    }
}

impl From<Duration> for Timestamp {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl From<Timestamp> for Duration {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.0
    }
}

/// Simulated delivery time, in seconds from the federation epoch.
///
/// `Time` is a thin, totally-ordered wrapper over `f64` rather than the superdense
/// offset+microstep pair used for wall-clock scheduling: the filtering subsystem only
/// ever needs to compare, add a delay to, and clamp this value, never to reconstruct a
/// wall-clock instant from it. `Time` does not implement `Eq`/`Hash` because `f64`
/// doesn't; callers needing a hashable key should use `to_bits()`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Time(f64);

impl Time {
    pub const ZERO: Time = Time(0.0);
    /// Sentinel for "never", used as the default `min_return_time` when no asynchronous
    /// filter process is outstanding.
    pub const MAX: Time = Time(f64::INFINITY);

    pub const fn new(seconds: f64) -> Self {
        Self(seconds)
    }

    pub const fn as_seconds(&self) -> f64 {
        self.0
    }

    /// Returns `self + delta`, clamped so the result never moves backwards.
    pub fn advanced_by(&self, delta: f64) -> Self {
        Self((self.0 + delta).max(self.0))
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Eq for Time {}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for Time {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_orders_like_the_underlying_float() {
        assert!(Time::new(1.0) < Time::new(2.5));
        assert_eq!(Time::new(1.0).min(Time::new(2.5)), Time::new(1.0));
    }

    #[test]
    fn advanced_by_never_moves_backwards() {
        let t = Time::new(5.0);
        assert_eq!(t.advanced_by(-10.0), t);
        assert_eq!(t.advanced_by(2.5), Time::new(7.5));
    }
}
