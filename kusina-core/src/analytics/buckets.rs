//! Per-day aggregation
//!
//! [`DailyAggregator`] groups records by calendar day and sums one or more
//! named series per day. The day key is a [`NaiveDate`] in the report's
//! offset and the display label is derived from it, so buckets sort by real
//! date and one day can never produce two buckets.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

/// Label format for a day bucket ("May 1").
const DAY_LABEL_FORMAT: &str = "%b %-d";

/// Totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub label: String,
    /// (series name, total) in series registration order
    pub values: Vec<(String, f64)>,
}

impl DailyBucket {
    /// Total of one series, zero when the series is unknown.
    pub fn value(&self, series: &str) -> f64 {
        self.values
            .iter()
            .find(|(name, _)| name == series)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }
}

pub fn day_label(date: NaiveDate) -> String {
    date.format(DAY_LABEL_FORMAT).to_string()
}

type Extractor<'a, T, R> = Box<dyn Fn(&T) -> R + 'a>;

/// Builder for a day-bucketed aggregation over `T`.
pub struct DailyAggregator<'a, T> {
    offset: FixedOffset,
    timestamp: Extractor<'a, T, Option<DateTime<Utc>>>,
    series: Vec<(String, Extractor<'a, T, f64>)>,
}

impl<'a, T> DailyAggregator<'a, T> {
    /// Records are assigned to days by `timestamp`, read in `offset`.
    pub fn new(
        offset: FixedOffset,
        timestamp: impl Fn(&T) -> Option<DateTime<Utc>> + 'a,
    ) -> Self {
        Self {
            offset,
            timestamp: Box::new(timestamp),
            series: Vec::new(),
        }
    }

    /// Add a series summed per day.
    pub fn series(mut self, name: &str, value: impl Fn(&T) -> f64 + 'a) -> Self {
        self.series.push((name.to_string(), Box::new(value)));
        self
    }

    /// Local calendar day of a record, if its timestamp is usable.
    pub fn day_of(&self, record: &T) -> Option<NaiveDate> {
        (self.timestamp)(record).map(|ts| ts.with_timezone(&self.offset).date_naive())
    }

    /// Bucket `records`, ascending by date.
    ///
    /// Records without a usable timestamp are skipped.
    pub fn aggregate(&self, records: &[T]) -> Vec<DailyBucket> {
        let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        let mut skipped = 0usize;

        for record in records {
            let Some(day) = self.day_of(record) else {
                skipped += 1;
                continue;
            };
            let totals = days
                .entry(day)
                .or_insert_with(|| vec![0.0; self.series.len()]);
            for (total, (_, value)) in totals.iter_mut().zip(&self.series) {
                *total += value(record);
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "Skipped records without a usable timestamp");
        }

        days.into_iter()
            .map(|(date, totals)| DailyBucket {
                date,
                label: day_label(date),
                values: self
                    .series
                    .iter()
                    .map(|(name, _)| name.clone())
                    .zip(totals)
                    .collect(),
            })
            .collect()
    }
}

/// Sum of one series across buckets.
pub fn series_total(buckets: &[DailyBucket], series: &str) -> f64 {
    buckets.iter().map(|b| b.value(series)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Sale {
        at: Option<DateTime<Utc>>,
        amount: f64,
    }

    fn sale(day: u32, hour: u32, amount: f64) -> Sale {
        Sale {
            at: Some(Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()),
            amount,
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn aggregator<'a>(offset: FixedOffset) -> DailyAggregator<'a, Sale> {
        DailyAggregator::new(offset, |s: &Sale| s.at)
            .series("revenue", |s: &Sale| s.amount)
            .series("orders", |_: &Sale| 1.0)
    }

    #[test]
    fn test_buckets_sorted_by_date_not_label() {
        let sales = vec![sale(10, 9, 1.0), sale(9, 9, 2.0), sale(1, 9, 3.0)];
        let labels: Vec<String> = aggregator(utc())
            .aggregate(&sales)
            .into_iter()
            .map(|b| b.label)
            .collect();
        assert_eq!(labels, vec!["May 1", "May 9", "May 10"]);
    }

    #[test]
    fn test_skips_missing_timestamps() {
        let sales = vec![
            sale(1, 9, 100.0),
            Sale { at: None, amount: 999.0 },
            sale(1, 18, 50.0),
        ];
        let buckets = aggregator(utc()).aggregate(&sales);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].value("revenue"), 150.0);
        assert_eq!(buckets[0].value("orders"), 2.0);
        assert_eq!(buckets[0].value("unknown"), 0.0);
    }

    #[test]
    fn test_offset_moves_day_boundary() {
        let manila = FixedOffset::east_opt(8 * 3600).unwrap();
        let sales = vec![sale(1, 15, 1.0), sale(1, 17, 1.0)];
        let buckets = aggregator(manila).aggregate(&sales);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["May 1", "May 2"]);
    }

    #[test]
    fn test_totals_conserved() {
        let sales: Vec<Sale> = (1..=28).map(|d| sale(d, d % 24, d as f64 * 1.5)).collect();
        let expected: f64 = sales.iter().map(|s| s.amount).sum();
        let buckets = aggregator(utc()).aggregate(&sales);
        assert_eq!(series_total(&buckets, "revenue"), expected);
        assert_eq!(series_total(&buckets, "orders"), 28.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregator(utc()).aggregate(&[]).is_empty());
    }
}
