use chrono::{DateTime, Duration, Utc};

/// Turn a display label such as "3 hours ago", "a day ago", "5m ago" or an
/// RFC 3339 instant into a timestamp relative to `now`.
///
/// Returns None for labels that do not describe a point in time.
pub fn parse_freshness(label: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(label) {
        return Some(instant.with_timezone(&Utc));
    }

    let lower = label.to_lowercase();
    if lower == "now" || lower == "just now" {
        return Some(now);
    }

    let body = lower.strip_suffix("ago")?.trim();
    let mut parts = body.split_whitespace();

    let (amount, unit) = match (parts.next(), parts.next(), parts.next()) {
        (Some(amount), Some(unit), None) => (parse_amount(amount)?, unit.to_string()),
        // Compact form: "5m", "2h", "3d"
        (Some(compact), None, None) => {
            let split = compact.find(|c: char| !c.is_ascii_digit())?;
            let (digits, unit) = compact.split_at(split);
            (digits.parse().ok()?, unit.to_string())
        }
        _ => return None,
    };

    now.checked_sub_signed(unit_duration(&unit, amount)?)
}

/// Larger amounts are not meaningful and could overflow a `Duration`
const MAX_AMOUNT: i64 = 1_000_000;

fn parse_amount(word: &str) -> Option<i64> {
    match word {
        "a" | "an" | "one" => Some(1),
        _ => word.parse().ok(),
    }
}

fn unit_duration(unit: &str, amount: i64) -> Option<Duration> {
    if !(0..=MAX_AMOUNT).contains(&amount) {
        return None;
    }

    let duration = match unit.trim_end_matches('s') {
        "" => Duration::seconds(amount),
        "sec" | "second" => Duration::seconds(amount),
        "m" | "min" | "minute" => Duration::minutes(amount),
        "h" | "hr" | "hour" => Duration::hours(amount),
        "d" | "day" => Duration::days(amount),
        "w" | "week" => Duration::weeks(amount),
        "mo" | "month" => Duration::days(amount * 30),
        _ => return None,
    };
    Some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_labels() {
        let now = now();
        assert_eq!(parse_freshness("3 hours ago", now), Some(now - Duration::hours(3)));
        assert_eq!(parse_freshness("1 hour ago", now), Some(now - Duration::hours(1)));
        assert_eq!(parse_freshness("an hour ago", now), Some(now - Duration::hours(1)));
        assert_eq!(parse_freshness("a day ago", now), Some(now - Duration::days(1)));
        assert_eq!(parse_freshness("45 minutes ago", now), Some(now - Duration::minutes(45)));
        assert_eq!(parse_freshness("2 weeks ago", now), Some(now - Duration::weeks(2)));
        assert_eq!(parse_freshness("10 seconds ago", now), Some(now - Duration::seconds(10)));
    }

    #[test]
    fn test_compact_labels() {
        let now = now();
        assert_eq!(parse_freshness("5m ago", now), Some(now - Duration::minutes(5)));
        assert_eq!(parse_freshness("2h ago", now), Some(now - Duration::hours(2)));
        assert_eq!(parse_freshness("3d ago", now), Some(now - Duration::days(3)));
        assert_eq!(parse_freshness("30s ago", now), Some(now - Duration::seconds(30)));
    }

    #[test]
    fn test_now_and_instants() {
        let now = now();
        assert_eq!(parse_freshness("Just now", now), Some(now));
        assert_eq!(
            parse_freshness("2026-10-18T08:30:00Z", now),
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_unparsable_labels() {
        let now = now();
        assert_eq!(parse_freshness("", now), None);
        assert_eq!(parse_freshness("yesterday", now), None);
        assert_eq!(parse_freshness("3 fortnights ago", now), None);
        assert_eq!(parse_freshness("ago", now), None);
        assert_eq!(parse_freshness("many hours ago", now), None);
        assert_eq!(parse_freshness("99999999999 days ago", now), None);
    }
}
