//! Reporting for kusina
//!
//! Turns fetched orders and interactions into chart-ready series and
//! leaderboards:
//! - Day buckets ([`buckets`])
//! - Top-N rankings ([`leaderboard`])
//! - Items ordered together ([`pairs`])
//! - Chart rows ([`chart`])
//! - Sales and engagement reports ([`sales`], [`engagement`])
//!
//! The building blocks are pure functions of their input. The report
//! builders fetch through a [`Fetcher`](crate::fetch::Fetcher), fanning
//! independent queries out concurrently, then aggregate.

pub mod buckets;
pub mod chart;
pub mod engagement;
pub mod leaderboard;
pub mod pairs;
pub mod period;
pub mod sales;
pub mod view;

use chrono::{FixedOffset, Offset, Utc};

use crate::config::{LikeAttribution, ReportsConfig};
use crate::error::Result;
use crate::types::OrderStatus;

pub use buckets::{DailyAggregator, DailyBucket};
pub use chart::{leaderboard_chart, time_series_chart, ChartRow};
pub use engagement::{generate_engagement_report, EngagementReport};
pub use leaderboard::{rank_top_n, LeaderboardEntry, Tally};
pub use pairs::{count_pairs, pair_key};
pub use period::{DateWindow, ReportPeriod};
pub use sales::{generate_sales_report, resolve_restaurant, SalesReport};
pub use view::{ViewSlot, ViewState, ViewTicket};

/// Settings shared by the report builders.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Number of entries in each leaderboard
    pub top_n: usize,
    /// Offset used to cut calendar days
    pub offset: FixedOffset,
    /// Order statuses that count towards revenue
    pub revenue_statuses: Vec<OrderStatus>,
    /// Who gets credit for a like
    pub like_attribution: LikeAttribution,
    /// Include comparison with the previous period
    pub include_trends: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: 5,
            offset: Utc.fix(),
            revenue_statuses: vec![OrderStatus::Completed],
            like_attribution: LikeAttribution::Owner,
            include_trends: false,
        }
    }
}

impl ReportOptions {
    pub fn from_config(config: &ReportsConfig) -> Result<Self> {
        Ok(Self {
            top_n: config.top_n,
            offset: config.offset()?,
            revenue_statuses: config
                .revenue_statuses
                .iter()
                .map(|s| OrderStatus::parse(s))
                .collect(),
            like_attribution: config.like_attribution,
            include_trends: false,
        })
    }

    pub fn with_trends(mut self, include_trends: bool) -> Self {
        self.include_trends = include_trends;
        self
    }

    pub fn counts_revenue(&self, status: &OrderStatus) -> bool {
        self.revenue_statuses.contains(status)
    }
}
