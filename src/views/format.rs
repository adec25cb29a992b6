//! Date rendering for cards, comments and the detail header

use chrono::{DateTime, Utc};

/// Relative age: "Just now", "5m ago", "3h ago", "2d ago", else "Oct 19, 2026".
///
/// Timestamps in the future count as "Just now".
pub fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - ts).num_seconds();
    if seconds < 60 {
        return "Just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = hours / 24;
    if days < 7 {
        return format!("{}d ago", days);
    }

    ts.format("%b %-d, %Y").to_string()
}

/// Full timestamp, e.g. "Monday, October 19, 2026 at 08:05 AM"
pub fn format_full(ts: DateTime<Utc>) -> String {
    ts.format("%A, %B %-d, %Y at %I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_buckets() {
        let now = now();
        assert_eq!(format_relative(now - Duration::seconds(59), now), "Just now");
        assert_eq!(format_relative(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_relative(now - Duration::minutes(59), now), "59m ago");
        assert_eq!(format_relative(now - Duration::hours(2), now), "2h ago");
        assert_eq!(format_relative(now - Duration::hours(23), now), "23h ago");
        assert_eq!(format_relative(now - Duration::days(6), now), "6d ago");
    }

    #[test]
    fn test_relative_falls_back_to_date() {
        let now = now();
        assert_eq!(format_relative(now - Duration::days(7), now), "Oct 12, 2026");
        assert_eq!(
            format_relative(Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap(), now),
            "Jan 3, 2025"
        );
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let now = now();
        assert_eq!(format_relative(now + Duration::minutes(3), now), "Just now");
    }

    #[test]
    fn test_full_date() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 8, 5, 0).unwrap();
        assert_eq!(format_full(ts), "Monday, October 19, 2026 at 08:05 AM");
    }
}
