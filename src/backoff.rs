//! Delay schedules between retry attempts.
//!
//! Attempt semantics follow the retry loop: `delay(n)` is the wait after failed attempt `n`
//! (1-indexed) and before attempt `n + 1`. `delay(0)` is the initial call and never waits.
//!
//! ```rust
//! use std::time::Duration;
//! use recordguard::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(1000));
//! assert_eq!(backoff.delay(0), Duration::ZERO);
//! assert_eq!(backoff.delay(1), Duration::from_millis(1000));
//! assert_eq!(backoff.delay(2), Duration::from_millis(2000));
//! assert_eq!(backoff.delay(3), Duration::from_millis(4000));
//! ```
//!
//! Overflow behavior: computations that would overflow saturate to `MAX_BACKOFF` (1 day).

use std::time::Duration;

/// Maximum delay used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Fixed or doubling delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `initial * 2^(attempt - 1)`.
    Exponential(Duration),
}

impl Backoff {
    /// Constant delay between attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed(delay)
    }

    /// Doubling delay starting at `initial`.
    pub fn exponential(initial: Duration) -> Self {
        Self::Exponential(initial)
    }

    /// Base delay the schedule starts from.
    pub fn initial(&self) -> Duration {
        match self {
            Self::Fixed(d) | Self::Exponential(d) => *d,
        }
    }

    /// Whether the schedule doubles.
    pub fn is_exponential(&self) -> bool {
        matches!(self, Self::Exponential(_))
    }

    /// Delay after failed attempt `attempt` (0 = initial call, no delay).
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self {
            Self::Fixed(d) => (*d).min(MAX_BACKOFF),
            Self::Exponential(initial) => {
                let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
                let multiplier = 2u128.saturating_pow(exponent);
                let nanos = initial.as_nanos().saturating_mul(multiplier);
                Duration::from_nanos(nanos.min(MAX_BACKOFF.as_nanos()) as u64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_returns_same_delay() {
        let backoff = Backoff::fixed(Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(7), Duration::from_secs(1));
    }

    #[test]
    fn exponential_backoff_doubles_each_time() {
        let backoff = Backoff::exponential(Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(100)); // 100 * 2^0
        assert_eq!(backoff.delay(2), Duration::from_millis(200)); // 100 * 2^1
        assert_eq!(backoff.delay(3), Duration::from_millis(400)); // 100 * 2^2
        assert_eq!(backoff.delay(5), Duration::from_millis(1600));
    }

    #[test]
    fn exponential_backoff_saturates() {
        let backoff = Backoff::exponential(Duration::from_secs(1));
        assert_eq!(backoff.delay(1_000_000_000), MAX_BACKOFF);
        assert_eq!(backoff.delay((u32::MAX as usize) + 10), MAX_BACKOFF);
    }

    #[test]
    fn fixed_backoff_is_capped() {
        let backoff = Backoff::fixed(Duration::from_secs(u64::MAX / 2));
        assert_eq!(backoff.delay(1), MAX_BACKOFF);
    }

    #[test]
    fn accessors() {
        let b = Backoff::exponential(Duration::from_millis(250));
        assert!(b.is_exponential());
        assert_eq!(b.initial(), Duration::from_millis(250));
        assert!(!Backoff::fixed(Duration::from_millis(1)).is_exponential());
    }
}
