//! Formatting helpers shared by the CLI outputs.

use chrono::{DateTime, Utc};

/// Format an amount with a currency symbol and thousands separators
/// (e.g., "₱1,234.50").
pub fn format_money(amount: f64, symbol: &str) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}{}{}.{:02}", sign, symbol, grouped, cents % 100)
}

/// Format a count for display (e.g., "14.2K").
pub fn format_count(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Format a timestamp as relative time (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    format_relative_time_at(ts, Utc::now())
}

fn format_relative_time_at(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// Format an optional timestamp as relative time, or "-" if missing.
pub fn format_relative_time_opt(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => format_relative_time(ts),
        None => "-".to_string(),
    }
}

/// Medal for the first three places.
pub fn medal(rank: usize) -> &'static str {
    match rank {
        1 => "🥇",
        2 => "🥈",
        3 => "🥉",
        _ => "  ",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0.0, "₱"), "₱0.00");
        assert_eq!(format_money(1234.5, "₱"), "₱1,234.50");
        assert_eq!(format_money(1_000_000.0, "$"), "$1,000,000.00");
        assert_eq!(format_money(-15.25, "$"), "-$15.25");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(42.0), "42");
        assert_eq!(format_count(14_200.0), "14.2K");
        assert_eq!(format_count(2_500_000.0), "2.5M");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        assert_eq!(format_relative_time_at(now - Duration::seconds(5), now), "5s ago");
        assert_eq!(format_relative_time_at(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_relative_time_at(now - Duration::days(30), now), "Apr 10");
        assert_eq!(format_relative_time_at(now + Duration::minutes(1), now), "just now");
        assert_eq!(format_relative_time_opt(None), "-");
    }
}
