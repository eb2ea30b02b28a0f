//! Sales report for one restaurant
//!
//! Orders in the window and the restaurant's menu are fetched concurrently,
//! then reduced to totals, a per-day revenue series and dish leaderboards.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::store::{collections, Filter};
use crate::types::{Dish, Order, UserProfile};

use super::buckets::{DailyAggregator, DailyBucket};
use super::leaderboard::{rank_top_n, LeaderboardEntry, Tally};
use super::pairs::count_pairs;
use super::period::{calc_delta, DateWindow, ReportPeriod};
use super::ReportOptions;

pub const REVENUE_SERIES: &str = "revenue";
pub const ORDERS_SERIES: &str = "orders";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesTotals {
    /// Orders in the window, any status
    pub orders: usize,
    /// Orders whose status counts towards revenue
    pub revenue_orders: usize,
    pub revenue: f64,
    /// Revenue per revenue-counted order
    pub average_order_value: f64,
    /// Quantity sold across revenue-counted orders
    pub items_sold: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesTrends {
    pub orders_delta_pct: f64,
    pub revenue_delta_pct: f64,
    pub previous_totals: SalesTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub period: ReportPeriod,
    pub window: DateWindow,
    pub restaurant_id: String,
    pub totals: SalesTotals,
    /// (status, order count) in first-seen order
    pub status_breakdown: Vec<(String, usize)>,
    /// Revenue and order count per day
    pub daily: Vec<DailyBucket>,
    pub top_dishes_by_quantity: Vec<LeaderboardEntry>,
    pub top_dishes_by_revenue: Vec<LeaderboardEntry>,
    pub top_categories: Vec<LeaderboardEntry>,
    pub top_pairings: Vec<LeaderboardEntry>,
    pub trends: Option<SalesTrends>,
}

/// Restaurant linked to the signed-in user.
pub async fn resolve_restaurant(fetcher: &Fetcher<'_>) -> Result<String> {
    let uid = &fetcher.session().uid;
    let profile: UserProfile = fetcher
        .get(uid)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: collections::USERS.to_string(),
            id: uid.clone(),
        })?;
    Ok(profile.require_restaurant()?.to_string())
}

/// Build the sales report for `restaurant_id` over `period`.
pub async fn generate_sales_report(
    fetcher: &Fetcher<'_>,
    restaurant_id: &str,
    period: ReportPeriod,
    options: &ReportOptions,
) -> Result<SalesReport> {
    let window = period.window(options.offset)?;
    let previous_window = if options.include_trends {
        Some(period.previous()?.window(options.offset)?)
    } else {
        None
    };

    let (orders, dishes, previous_orders) = tokio::try_join!(
        fetch_orders(fetcher, restaurant_id, window),
        fetcher.fetch::<Dish>(vec![Filter::eq("restaurantId", restaurant_id)]),
        async {
            match previous_window {
                Some(w) => fetch_orders(fetcher, restaurant_id, w).await.map(Some),
                None => Ok(None),
            }
        },
    )?;

    tracing::info!(
        restaurant_id = %restaurant_id,
        period = %period.display_name(),
        orders = orders.len(),
        dishes = dishes.len(),
        "Building sales report"
    );

    let totals = compute_totals(&orders, options);

    let trends = previous_orders.map(|previous| {
        let previous_totals = compute_totals(&previous, options);
        SalesTrends {
            orders_delta_pct: calc_delta(totals.orders as f64, previous_totals.orders as f64),
            revenue_delta_pct: calc_delta(totals.revenue, previous_totals.revenue),
            previous_totals,
        }
    });

    let daily = DailyAggregator::new(options.offset, |o: &Order| o.created_at)
        .series(REVENUE_SERIES, |o: &Order| revenue_of(o, options))
        .series(ORDERS_SERIES, |_: &Order| 1.0)
        .aggregate(&orders);

    let counted: Vec<&Order> = orders
        .iter()
        .filter(|o| options.counts_revenue(&o.status))
        .collect();

    let mut by_quantity = Tally::new();
    let mut by_revenue = Tally::new();
    for item in counted.iter().flat_map(|o| &o.items) {
        by_quantity.add(&item.name, f64::from(item.quantity));
        by_revenue.add(&item.name, item.subtotal());
    }
    // Menu dishes that did not sell still rank, after everything that did
    for dish in &dishes {
        by_quantity.add(&dish.name, 0.0);
        by_revenue.add(&dish.name, 0.0);
    }

    let categories: HashMap<&str, &str> = dishes
        .iter()
        .map(|d| (d.name.as_str(), d.category.as_str()))
        .collect();
    let mut by_category = Tally::new();
    for (name, revenue) in by_revenue.entries() {
        let category = categories.get(name).copied().unwrap_or("uncategorized");
        by_category.add(category, revenue);
    }

    let pairs = count_pairs(
        counted
            .iter()
            .map(|o| o.items.iter().map(|i| i.name.as_str())),
    );

    Ok(SalesReport {
        period,
        window,
        restaurant_id: restaurant_id.to_string(),
        status_breakdown: status_breakdown(&orders),
        daily,
        top_dishes_by_quantity: rank_top_n(&by_quantity, options.top_n, str::to_string),
        top_dishes_by_revenue: rank_top_n(&by_revenue, options.top_n, str::to_string),
        top_categories: rank_top_n(&by_category, options.top_n, str::to_string),
        top_pairings: rank_top_n(&pairs, options.top_n, str::to_string),
        totals,
        trends,
    })
}

async fn fetch_orders(
    fetcher: &Fetcher<'_>,
    restaurant_id: &str,
    window: DateWindow,
) -> Result<Vec<Order>> {
    fetcher
        .fetch(vec![
            Filter::eq("restaurantId", restaurant_id),
            Filter::between("createdAt", window.start, window.end),
        ])
        .await
}

fn revenue_of(order: &Order, options: &ReportOptions) -> f64 {
    if options.counts_revenue(&order.status) {
        order.total_price
    } else {
        0.0
    }
}

fn compute_totals(orders: &[Order], options: &ReportOptions) -> SalesTotals {
    let mut totals = SalesTotals {
        orders: orders.len(),
        ..SalesTotals::default()
    };
    for order in orders.iter().filter(|o| options.counts_revenue(&o.status)) {
        totals.revenue_orders += 1;
        totals.revenue += order.total_price;
        totals.items_sold += order.items.iter().map(|i| u64::from(i.quantity)).sum::<u64>();
    }
    if totals.revenue_orders > 0 {
        totals.average_order_value = totals.revenue / totals.revenue_orders as f64;
    }
    totals
}

fn status_breakdown(orders: &[Order]) -> Vec<(String, usize)> {
    let mut breakdown: Vec<(String, usize)> = Vec::new();
    for order in orders {
        let status = order.status.as_str();
        match breakdown.iter_mut().find(|(s, _)| s == status) {
            Some((_, count)) => *count += 1,
            None => breakdown.push((status.to_string(), 1)),
        }
    }
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineItem, OrderStatus};
    use chrono::{TimeZone, Utc};

    fn order(status: OrderStatus, total: f64) -> Order {
        Order {
            id: "o".to_string(),
            restaurant_id: "r1".to_string(),
            status,
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            total_price: total,
            items: vec![LineItem {
                name: "Adobo".to_string(),
                quantity: 2,
                unit_price: total / 2.0,
            }],
            customer_id: None,
        }
    }

    #[test]
    fn test_totals_count_only_revenue_statuses() {
        let orders = vec![
            order(OrderStatus::Completed, 100.0),
            order(OrderStatus::Cancelled, 40.0),
            order(OrderStatus::Completed, 50.0),
        ];
        let totals = compute_totals(&orders, &ReportOptions::default());
        assert_eq!(totals.orders, 3);
        assert_eq!(totals.revenue_orders, 2);
        assert_eq!(totals.revenue, 150.0);
        assert_eq!(totals.average_order_value, 75.0);
        assert_eq!(totals.items_sold, 4);
    }

    #[test]
    fn test_status_breakdown_first_seen() {
        let orders = vec![
            order(OrderStatus::Pending, 1.0),
            order(OrderStatus::Completed, 1.0),
            order(OrderStatus::Pending, 1.0),
        ];
        assert_eq!(
            status_breakdown(&orders),
            vec![("pending".to_string(), 2), ("completed".to_string(), 1)]
        );
    }

    #[test]
    fn test_no_revenue_orders_has_zero_average() {
        let totals = compute_totals(&[order(OrderStatus::Pending, 10.0)], &ReportOptions::default());
        assert_eq!(totals.average_order_value, 0.0);
        assert_eq!(totals.revenue, 0.0);
    }
}
