//! # Activity duration policy.
//!
//! A connected device sleeps twice: once before it starts online activity and once
//! before logging out. [`ActivityPolicy`] decides how long.
//!
//! - [`ActivityPolicy::Fixed`]: same delay every time, predictable (tests, demos)
//! - [`ActivityPolicy::Uniform`]: random delay in `[min, max]`
//! - [`ActivityPolicy::Instant`]: no delay at all
//!
//! Anything else can be plugged in through [`DurationSource`].

use rand::Rng;
use std::time::Duration;

/// Pluggable source of activity durations.
///
/// Called once per sleep from the device worker; implementations must be cheap and non-blocking.
pub trait DurationSource: Send + Sync + 'static {
    /// Returns the next delay.
    fn next_delay(&self) -> Duration;
}

/// Built-in duration policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityPolicy {
    /// No delay.
    Instant,

    /// Always the same delay.
    Fixed(Duration),

    /// Uniformly random delay in `[min, max]` (millisecond granularity).
    ///
    /// If `min > max` the bounds are swapped.
    Uniform {
        /// Lower bound.
        min: Duration,
        /// Upper bound.
        max: Duration,
    },
}

impl Default for ActivityPolicy {
    /// Returns `Uniform { min: 0ms, max: 1500ms }`.
    fn default() -> Self {
        ActivityPolicy::Uniform {
            min: Duration::ZERO,
            max: Duration::from_millis(1500),
        }
    }
}

impl ActivityPolicy {
    /// Computes the next delay.
    pub fn next(&self) -> Duration {
        match *self {
            ActivityPolicy::Instant => Duration::ZERO,
            ActivityPolicy::Fixed(d) => d,
            ActivityPolicy::Uniform { min, max } => {
                let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
                let lo_ms = lo.as_millis() as u64;
                let hi_ms = hi.as_millis() as u64;
                if lo_ms == hi_ms {
                    return Duration::from_millis(lo_ms);
                }
                let mut rng = rand::rng();
                Duration::from_millis(rng.random_range(lo_ms..=hi_ms))
            }
        }
    }
}

impl DurationSource for ActivityPolicy {
    fn next_delay(&self) -> Duration {
        self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_and_instant() {
        assert_eq!(ActivityPolicy::Instant.next(), Duration::ZERO);
        let fixed = ActivityPolicy::Fixed(Duration::from_millis(250));
        for _ in 0..5 {
            assert_eq!(fixed.next_delay(), Duration::from_millis(250));
        }
    }

    #[test]
    fn test_uniform_stays_in_bounds() {
        let policy = ActivityPolicy::Uniform {
            min: Duration::from_millis(100),
            max: Duration::from_millis(200),
        };
        for _ in 0..200 {
            let d = policy.next();
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(200), "{d:?}");
        }
    }

    #[test]
    fn test_uniform_swapped_bounds() {
        let policy = ActivityPolicy::Uniform {
            min: Duration::from_millis(30),
            max: Duration::from_millis(10),
        };
        for _ in 0..50 {
            let d = policy.next();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(30));
        }
    }

    #[test]
    fn test_default_is_zero_to_fifteen_hundred_ms() {
        assert_eq!(
            ActivityPolicy::default(),
            ActivityPolicy::Uniform {
                min: Duration::ZERO,
                max: Duration::from_millis(1500)
            }
        );
    }
}
