//! Report windows
//!
//! A [`ReportPeriod`] names a calendar window (a year, a month, or the last
//! N days up to a given day). Windows are resolved in the report's fixed UTC
//! offset so a "day" means the restaurant's local day.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// Longest `Nd` period accepted by [`ReportPeriod::parse`].
pub const MAX_PERIOD_DAYS: u32 = 36_600;

/// Time period a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportPeriod {
    /// Full year (e.g., 2024)
    Year(i32),
    /// Specific month (year, month 1-12)
    Month(i32, u32),
    /// `count` days ending with `end` (inclusive)
    Days { end: NaiveDate, count: u32 },
}

/// Resolved `[start, end)` instant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

impl ReportPeriod {
    /// First day of the period.
    pub fn first_day(&self) -> Result<NaiveDate> {
        match self {
            ReportPeriod::Year(year) => date(*year, 1, 1),
            ReportPeriod::Month(year, month) => date(*year, *month, 1),
            ReportPeriod::Days { end, count } => {
                if *count == 0 {
                    return Err(Error::Validation("day count must be at least 1".to_string()));
                }
                end.checked_sub_signed(Duration::days(i64::from(*count) - 1))
                    .ok_or_else(|| out_of_range(self))
            }
        }
    }

    /// Day after the last day of the period.
    pub fn end_day(&self) -> Result<NaiveDate> {
        match self {
            ReportPeriod::Year(year) => {
                let next_year = year.checked_add(1).ok_or_else(|| out_of_range(self))?;
                date(next_year, 1, 1)
            }
            ReportPeriod::Month(year, month) => {
                let (next_year, next_month) = if *month == 12 {
                    (year.checked_add(1).ok_or_else(|| out_of_range(self))?, 1)
                } else {
                    (*year, *month + 1)
                };
                date(next_year, next_month, 1)
            }
            ReportPeriod::Days { end, .. } => end.succ_opt().ok_or_else(|| out_of_range(self)),
        }
    }

    /// Instant window for this period in the given offset.
    pub fn window(&self, offset: FixedOffset) -> Result<DateWindow> {
        Ok(DateWindow {
            start: local_midnight(self.first_day()?, offset)?,
            end: local_midnight(self.end_day()?, offset)?,
        })
    }

    /// Get the previous period for trend comparison.
    pub fn previous(&self) -> Result<Self> {
        let previous = match self {
            ReportPeriod::Year(year) => year.checked_sub(1).map(ReportPeriod::Year),
            ReportPeriod::Month(year, month) => {
                if *month == 1 {
                    year.checked_sub(1).map(|y| ReportPeriod::Month(y, 12))
                } else {
                    Some(ReportPeriod::Month(*year, *month - 1))
                }
            }
            ReportPeriod::Days { end, count } => end
                .checked_sub_signed(Duration::days(i64::from(*count)))
                .map(|end| ReportPeriod::Days { end, count: *count }),
        };
        previous.ok_or_else(|| out_of_range(self))
    }

    pub fn display_name(&self) -> String {
        match self {
            ReportPeriod::Year(year) => format!("{}", year),
            ReportPeriod::Month(year, month) => {
                let month_name = match month {
                    1 => "January",
                    2 => "February",
                    3 => "March",
                    4 => "April",
                    5 => "May",
                    6 => "June",
                    7 => "July",
                    8 => "August",
                    9 => "September",
                    10 => "October",
                    11 => "November",
                    12 => "December",
                    _ => "Unknown",
                };
                format!("{} {}", month_name, year)
            }
            ReportPeriod::Days { end, count } => {
                format!("Last {} days to {}", count, end.format("%b %-d, %Y"))
            }
        }
    }

    /// Parse `YYYY`, `YYYY-MM` or `Nd` (last N days up to `today`).
    pub fn parse(value: &str, today: NaiveDate) -> Result<Self> {
        let value = value.trim();
        let invalid = || {
            Error::Validation(format!(
                "invalid period '{}': expected YYYY, YYYY-MM or Nd",
                value
            ))
        };

        if let Some(days) = value.strip_suffix('d') {
            let count: u32 = days.parse().map_err(|_| invalid())?;
            if count == 0 || count > MAX_PERIOD_DAYS {
                return Err(invalid());
            }
            return Ok(ReportPeriod::Days { end: today, count });
        }

        match value.split_once('-') {
            Some((year, month)) => {
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                if !(1..=12).contains(&month) {
                    return Err(invalid());
                }
                Ok(ReportPeriod::Month(year, month))
            }
            None => Ok(ReportPeriod::Year(value.parse().map_err(|_| invalid())?)),
        }
    }

    /// Create a period for the current month in the given offset.
    pub fn current_month(offset: FixedOffset) -> Self {
        let today = Utc::now().with_timezone(&offset).date_naive();
        ReportPeriod::Month(today.year(), today.month())
    }
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::Validation(format!("invalid date {}-{:02}-{:02}", year, month, day)))
}

fn out_of_range(period: &ReportPeriod) -> Error {
    Error::Validation(format!("period out of range: {}", period.display_name()))
}

fn local_midnight(day: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>> {
    offset
        .from_local_datetime(&day.and_time(chrono::NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Validation(format!("no local midnight for {}", day)))
}

/// Percentage change from `previous` to `current`.
///
/// Growth from zero is shown as 100%.
pub fn calc_delta(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        ((current - previous) / previous) * 100.0
    }
}

/// Format delta for display (e.g., "+23%" or "-15%").
pub fn format_delta(delta: f64) -> String {
    if delta >= 0.0 {
        format!("+{:.0}%", delta)
    } else {
        format!("{:.0}%", delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_period_year() {
        let period = ReportPeriod::Year(2024);
        assert_eq!(period.display_name(), "2024");
        assert_eq!(period.previous().unwrap(), ReportPeriod::Year(2023));
    }

    #[test]
    fn test_period_month() {
        let period = ReportPeriod::Month(2024, 12);
        assert_eq!(period.display_name(), "December 2024");
        assert_eq!(period.previous().unwrap(), ReportPeriod::Month(2024, 11));

        let jan = ReportPeriod::Month(2024, 1);
        assert_eq!(jan.previous().unwrap(), ReportPeriod::Month(2023, 12));

        let window = period.window(utc()).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_window_in_offset() {
        let manila = FixedOffset::east_opt(8 * 3600).unwrap();
        let window = ReportPeriod::Month(2024, 5).window(manila).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 4, 30, 16, 0, 0).unwrap());
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 5, 31, 15, 59, 59).unwrap()));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_last_days() {
        let end = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        let period = ReportPeriod::Days { end, count: 7 };
        assert_eq!(period.first_day().unwrap(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(
            period.previous().unwrap(),
            ReportPeriod::Days {
                end: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
                count: 7
            }
        );
        assert!(ReportPeriod::Days { end, count: 0 }.window(utc()).is_err());
    }

    #[test]
    fn test_parse() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        assert_eq!(ReportPeriod::parse("2024", today).unwrap(), ReportPeriod::Year(2024));
        assert_eq!(
            ReportPeriod::parse("2024-05", today).unwrap(),
            ReportPeriod::Month(2024, 5)
        );
        assert_eq!(
            ReportPeriod::parse("30d", today).unwrap(),
            ReportPeriod::Days { end: today, count: 30 }
        );
        assert!(ReportPeriod::parse("2024-13", today).is_err());
        assert!(ReportPeriod::parse("0d", today).is_err());
        assert!(ReportPeriod::parse("soon", today).is_err());
    }

    #[test]
    fn test_huge_day_count_is_an_error() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        assert!(ReportPeriod::parse("4000000000d", today).is_err());
        assert!(ReportPeriod::parse("60000000d", today).is_err());
        assert!(ReportPeriod::parse(&format!("{}d", MAX_PERIOD_DAYS), today).is_ok());

        // Periods built directly skip parse's bound
        let huge = ReportPeriod::Days { end: today, count: u32::MAX };
        assert!(matches!(huge.window(utc()), Err(Error::Validation(_))));
        let wide = ReportPeriod::Days { end: today, count: 60_000_000 };
        assert!(wide.window(utc()).is_ok());
        assert!(matches!(
            wide.previous().and_then(|p| p.window(utc())),
            Err(Error::Validation(_))
        ));

        let last = ReportPeriod::Days { end: NaiveDate::MAX, count: 1 };
        assert!(last.window(utc()).is_err());
        assert!(ReportPeriod::Year(i32::MIN).previous().is_err());
        assert!(ReportPeriod::Year(i32::MAX).window(utc()).is_err());
    }

    #[test]
    fn test_trend_delta() {
        assert_eq!(calc_delta(123.0, 100.0), 23.0);
        assert_eq!(calc_delta(80.0, 100.0), -20.0);
        assert_eq!(calc_delta(100.0, 0.0), 100.0);
        assert_eq!(calc_delta(0.0, 0.0), 0.0);
        assert_eq!(format_delta(-15.2), "-15%");
    }
}
