//! Chart rows
//!
//! Charts take a list of rows, each with one category label and one or more
//! numeric series. These helpers only reshape; row order is whatever the
//! aggregation produced.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::buckets::DailyBucket;
use super::leaderboard::LeaderboardEntry;

/// Category field name for time series rows.
pub const DATE_FIELD: &str = "date";
/// Category field name for leaderboard rows.
pub const NAME_FIELD: &str = "name";

/// One chart row. Serializes as a flat object: `{"date": "May 1", "revenue": 120.0}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    pub category_field: &'static str,
    pub category: String,
    pub series: Vec<(String, f64)>,
}

impl ChartRow {
    pub fn get(&self, series: &str) -> Option<f64> {
        self.series
            .iter()
            .find(|(name, _)| name == series)
            .map(|(_, v)| *v)
    }
}

impl Serialize for ChartRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.series.len() + 1))?;
        map.serialize_entry(self.category_field, &self.category)?;
        for (name, value) in &self.series {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

pub fn time_series_chart(buckets: &[DailyBucket]) -> Vec<ChartRow> {
    buckets
        .iter()
        .map(|bucket| ChartRow {
            category_field: DATE_FIELD,
            category: bucket.label.clone(),
            series: bucket.values.clone(),
        })
        .collect()
}

/// One row per entry with the value under `series`.
pub fn leaderboard_chart(entries: &[LeaderboardEntry], series: &str) -> Vec<ChartRow> {
    entries
        .iter()
        .map(|entry| ChartRow {
            category_field: NAME_FIELD,
            category: entry.display_name.clone(),
            series: vec![(series.to_string(), entry.value)],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_time_series_rows_flatten() {
        let bucket = DailyBucket {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            label: "May 1".to_string(),
            values: vec![("revenue".to_string(), 150.0), ("orders".to_string(), 2.0)],
        };
        let rows = time_series_chart(&[bucket]);
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "date": "May 1", "revenue": 150.0, "orders": 2.0 }])
        );
    }

    #[test]
    fn test_leaderboard_rows_keep_order() {
        let entries: Vec<LeaderboardEntry> = ["b", "a"]
            .iter()
            .enumerate()
            .map(|(i, s)| LeaderboardEntry {
                subject_id: s.to_string(),
                display_name: s.to_uppercase(),
                value: 10.0 - i as f64,
                rank: i + 1,
            })
            .collect();
        let rows = leaderboard_chart(&entries, "likes");
        let names: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(rows[1].get("likes"), Some(9.0));
    }
}
