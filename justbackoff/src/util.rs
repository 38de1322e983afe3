use std::time::Duration;

/// Converts milliseconds to seconds.
pub fn to_seconds(milliseconds: f64) -> f64 {
    milliseconds / 1000.0
}

/// Converts seconds to milliseconds.
pub fn to_ms(seconds: f64) -> f64 {
    seconds * 1000.0
}

/// Turns a delay in seconds into a `Duration` a caller can sleep on.
///
/// Returns `None` for negative, NaN or out-of-range values, which the
/// calculator can produce from degenerate configurations.
pub fn to_duration(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_both_ways() {
        assert_eq!(to_ms(10.0), 10000.0);
        assert_eq!(to_seconds(100.0), 0.1);
        assert_eq!(to_seconds(0.0), 0.0);
        assert_eq!(to_seconds(-250.0), -0.25);
    }

    #[test]
    fn round_trip_is_exact_for_common_values() {
        for x in [0.0, 0.1, 1.0, 2.5, 10.0, 86_400.0, -3.0] {
            assert_eq!(to_seconds(to_ms(x)), x);
        }
    }

    #[test]
    fn duration_rejects_unrepresentable() {
        assert_eq!(to_duration(0.25), Some(Duration::from_millis(250)));
        assert_eq!(to_duration(0.0), Some(Duration::ZERO));
        assert_eq!(to_duration(-0.1), None);
        assert_eq!(to_duration(f64::NAN), None);
        assert_eq!(to_duration(f64::INFINITY), None);
    }
}
