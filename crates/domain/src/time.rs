//! Time and timestamp helpers.

use chrono::{DateTime, Duration, Utc};

/// UTC timestamp used for report readings.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// How long ago `ts` was, relative to `reference`. Negative when `ts` is in the future.
#[must_use]
pub fn age(ts: Timestamp, reference: Timestamp) -> Duration {
    reference.signed_duration_since(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_compute_age_relative_to_reference() {
        let reference = now();
        let earlier = reference - Duration::minutes(5);
        assert_eq!(age(earlier, reference), Duration::minutes(5));
        assert_eq!(age(reference, earlier), Duration::minutes(-5));
    }
}
