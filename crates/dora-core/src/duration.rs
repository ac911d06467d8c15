//! Time conversions and human-readable durations.

use chrono::{DateTime, Utc};

use crate::error::{MetricsError, Result};

/// Truncate an epoch-milliseconds value to whole seconds.
pub fn epoch_secs(millis: i64) -> i64 {
    millis.div_euclid(1000)
}

/// UTC datetime for an epoch-seconds value.
pub fn datetime_from_secs(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        MetricsError::InvalidMeasurement(format!("timestamp {} is out of range", secs))
    })
}

/// UTC datetime for an epoch-milliseconds value, truncated to seconds.
pub fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    datetime_from_secs(epoch_secs(millis))
}

/// Format a span as `[N day(s), ]H hr(s), MM min(s), SS sec(s)`.
///
/// Fractional seconds are dropped and the sign is ignored.
pub fn format_duration(secs: f64) -> String {
    let total = secs.abs().trunc() as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let clock = format!(
        "{} hr(s), {:02} min(s), {:02} sec(s)",
        hours, minutes, seconds
    );
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_under_a_day() {
        assert_eq!(format_duration(0.0), "0 hr(s), 00 min(s), 00 sec(s)");
        assert_eq!(format_duration(3_723.9), "1 hr(s), 02 min(s), 03 sec(s)");
    }

    #[test]
    fn test_format_with_days() {
        assert_eq!(
            format_duration(86_400.0 + 5.0),
            "1 day, 0 hr(s), 00 min(s), 05 sec(s)"
        );
        assert_eq!(
            format_duration(3.0 * 86_400.0 + 13.0 * 3_600.0),
            "3 days, 13 hr(s), 00 min(s), 00 sec(s)"
        );
    }

    #[test]
    fn test_negative_spans_use_magnitude() {
        assert_eq!(format_duration(-61.0), "0 hr(s), 01 min(s), 01 sec(s)");
    }

    #[test]
    fn test_epoch_truncation() {
        assert_eq!(epoch_secs(1_700_000_000_999), 1_700_000_000);
        let dt = datetime_from_millis(1_700_000_000_999).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }
}
