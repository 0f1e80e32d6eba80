//! Human-relative timestamps ("5 minutes ago", "in 2 days")
//!
//! Rendered once when a record is built; the text does not update afterwards.

use chrono::{DateTime, Utc};

/// Render `then` relative to `now`
pub fn from_now(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    let past = delta.num_seconds() >= 0;
    let phrase = describe(delta.num_seconds().unsigned_abs());

    if past {
        format!("{} ago", phrase)
    } else {
        format!("in {}", phrase)
    }
}

/// Thresholds follow the usual "fromNow" buckets: rounding happens before
/// picking the unit, so 89 seconds is still "a minute".
fn describe(seconds: u64) -> String {
    let secs = seconds as f64;
    let minutes = (secs / 60.0).round() as u64;
    let hours = (secs / 3600.0).round() as u64;
    let days = (secs / 86_400.0).round() as u64;
    let months = (secs / (86_400.0 * 30.44)).round() as u64;
    let years = (secs / (86_400.0 * 365.25)).round() as u64;

    if seconds < 45 {
        "a few seconds".to_string()
    } else if seconds < 90 {
        "a minute".to_string()
    } else if minutes < 45 {
        format!("{} minutes", minutes)
    } else if minutes < 90 {
        "an hour".to_string()
    } else if hours < 22 {
        format!("{} hours", hours)
    } else if hours < 36 {
        "a day".to_string()
    } else if days < 26 {
        format!("{} days", days)
    } else if days < 45 {
        "a month".to_string()
    } else if days < 320 {
        format!("{} months", months.max(2))
    } else if days < 548 {
        "a year".to_string()
    } else {
        format!("{} years", years.max(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ago(d: Duration) -> String {
        let now = Utc::now();
        from_now(now - d, now)
    }

    #[test]
    fn test_recent() {
        assert_eq!(ago(Duration::seconds(3)), "a few seconds ago");
        assert_eq!(ago(Duration::seconds(60)), "a minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
    }

    #[test]
    fn test_hours_and_days() {
        assert_eq!(ago(Duration::minutes(60)), "an hour ago");
        assert_eq!(ago(Duration::hours(3)), "3 hours ago");
        assert_eq!(ago(Duration::hours(30)), "a day ago");
        assert_eq!(ago(Duration::days(4)), "4 days ago");
    }

    #[test]
    fn test_months_and_years() {
        assert_eq!(ago(Duration::days(30)), "a month ago");
        assert_eq!(ago(Duration::days(92)), "3 months ago");
        assert_eq!(ago(Duration::days(400)), "a year ago");
        assert_eq!(ago(Duration::days(365 * 3)), "3 years ago");
    }

    #[test]
    fn test_future() {
        let now = Utc::now();
        assert_eq!(from_now(now + Duration::hours(2), now), "in 2 hours");
    }
}
