//! Conversions between `Duration` and the signed millisecond positions
//! used by the lyrics timeline.
//!
//! Lyrics timestamps are `i64` milliseconds so that the head entry can sit
//! before zero. Conversions saturate instead of truncating.

use std::time::Duration;

/// Extension trait for saturating Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as i64, saturating at `i64::MAX`.
    ///
    /// This is the unit of every lyrics timestamp and playback position.
    fn as_millis_i64(&self) -> i64;

    /// Convert duration to seconds as u32, saturating at `u32::MAX`.
    ///
    /// Used for duration matching against remote lyrics providers.
    fn as_secs_u32(&self) -> u32;
}

impl DurationExt for Duration {
    fn as_millis_i64(&self) -> i64 {
        i64::try_from(self.as_millis()).unwrap_or(i64::MAX)
    }

    fn as_secs_u32(&self) -> u32 {
        u32::try_from(self.as_secs()).unwrap_or(u32::MAX)
    }
}

/// Convert a signed millisecond timestamp to a `Duration`.
///
/// Negative values (such as the head entry) clamp to `Duration::ZERO`.
#[must_use]
pub fn duration_from_millis(ms: i64) -> Duration {
    u64::try_from(ms).map_or(Duration::ZERO, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_millis_i64() {
        let duration = Duration::from_millis(5000);
        assert_eq!(duration.as_millis_i64(), 5000);
    }

    #[test]
    fn test_as_millis_i64_zero() {
        assert_eq!(Duration::ZERO.as_millis_i64(), 0);
    }

    #[test]
    fn test_as_millis_i64_saturates() {
        assert_eq!(Duration::MAX.as_millis_i64(), i64::MAX);
    }

    #[test]
    fn test_as_secs_u32() {
        let duration = Duration::from_secs(300);
        assert_eq!(duration.as_secs_u32(), 300);
    }

    #[test]
    fn test_as_secs_u32_large() {
        // Duration larger than u32::MAX seconds
        let duration = Duration::from_secs(u64::from(u32::MAX) + 1);
        assert_eq!(duration.as_secs_u32(), u32::MAX);
    }

    #[test]
    fn test_duration_from_millis() {
        assert_eq!(duration_from_millis(1500), Duration::from_millis(1500));
        assert_eq!(duration_from_millis(0), Duration::ZERO);
        assert_eq!(duration_from_millis(-1), Duration::ZERO);
        assert_eq!(duration_from_millis(i64::MIN), Duration::ZERO);
    }
}
