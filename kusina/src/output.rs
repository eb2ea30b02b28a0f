//! Report rendering: terminal, markdown and JSON.

use anyhow::Result;
use kusina_core::admin::{AcceptOutcome, MenuEntry, ReportedVideo};
use kusina_core::analytics::chart::{leaderboard_chart, time_series_chart};
use kusina_core::analytics::engagement::{
    EngagementReport, COMMENTS_SERIES, LIKES_SERIES, VIEWS_SERIES,
};
use kusina_core::analytics::period::format_delta;
use kusina_core::analytics::sales::{SalesReport, ORDERS_SERIES, REVENUE_SERIES};
use kusina_core::analytics::{DailyBucket, LeaderboardEntry};
use kusina_core::format::{format_count, format_money, format_relative_time_opt, medal};
use kusina_core::Application;

/// Width of the daily bar chart.
const BAR_WIDTH: usize = 30;

/// Export format selected with `--export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Export {
    Terminal,
    Markdown,
    Json,
}

impl Export {
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(Export::Terminal),
            Some("md") => Ok(Export::Markdown),
            Some("json") => Ok(Export::Json),
            Some(other) => anyhow::bail!("Unknown export format: {}. Use 'md' or 'json'", other),
        }
    }
}

fn header(title: &str) {
    println!();
    println!("╭{}╮", "─".repeat(60));
    println!("│{:^60}│", title);
    println!("╰{}╯", "─".repeat(60));
    println!();
}

fn print_leaderboard(title: &str, entries: &[LeaderboardEntry], value: impl Fn(f64) -> String) {
    if entries.is_empty() {
        return;
    }
    println!("{}", title);
    for entry in entries {
        let rank = if entry.is_podium() {
            medal(entry.rank).to_string()
        } else {
            format!("{}.", entry.rank)
        };
        println!("   {:<3} {:<32} {:>12}", rank, entry.display_name, value(entry.value));
    }
    println!();
}

fn print_daily_bars(daily: &[DailyBucket], series: &str, value: impl Fn(f64) -> String) {
    let max = daily
        .iter()
        .map(|b| b.value(series))
        .fold(0.0_f64, f64::max);
    for bucket in daily {
        let v = bucket.value(series);
        let width = if max > 0.0 {
            ((v / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        println!("   {:<7} {:<30} {}", bucket.label, "█".repeat(width), value(v));
    }
    println!();
}

fn markdown_leaderboard(title: &str, entries: &[LeaderboardEntry], value: impl Fn(f64) -> String) {
    if entries.is_empty() {
        return;
    }
    println!("## {}", title);
    println!();
    for entry in entries {
        println!(
            "{} **{}** - {}",
            medal(entry.rank),
            entry.display_name,
            value(entry.value)
        );
    }
    println!();
}

// ============================================
// Sales
// ============================================

pub fn print_sales(report: &SalesReport, export: Export, currency: &str) -> Result<()> {
    match export {
        Export::Terminal => print_sales_terminal(report, currency),
        Export::Markdown => print_sales_markdown(report, currency),
        Export::Json => print_sales_json(report)?,
    }
    Ok(())
}

fn print_sales_terminal(report: &SalesReport, currency: &str) {
    let money = |v: f64| format_money(v, currency);
    header(&format!("SALES: {}", report.period.display_name()));

    if report.totals.orders == 0 {
        println!("  No orders found for this period.");
        println!();
        return;
    }

    println!("SUMMARY");
    println!(
        "   Orders:   {:<12} Revenue:     {}",
        report.totals.orders,
        money(report.totals.revenue)
    );
    println!(
        "   Counted:  {:<12} Avg. order:  {}",
        report.totals.revenue_orders,
        money(report.totals.average_order_value)
    );
    println!("   Items sold: {}", report.totals.items_sold);
    if let Some(trends) = &report.trends {
        println!(
            "   vs previous: orders {}, revenue {}",
            format_delta(trends.orders_delta_pct),
            format_delta(trends.revenue_delta_pct)
        );
    }
    println!();

    println!("STATUS");
    for (status, count) in &report.status_breakdown {
        println!("   {:<12} {:>6}", status, count);
    }
    println!();

    println!("DAILY REVENUE");
    print_daily_bars(&report.daily, REVENUE_SERIES, money);

    print_leaderboard("TOP DISHES (QUANTITY)", &report.top_dishes_by_quantity, format_count);
    print_leaderboard("TOP DISHES (REVENUE)", &report.top_dishes_by_revenue, money);
    print_leaderboard("TOP CATEGORIES", &report.top_categories, money);
    print_leaderboard("ORDERED TOGETHER", &report.top_pairings, format_count);
}

fn print_sales_markdown(report: &SalesReport, currency: &str) {
    let money = |v: f64| format_money(v, currency);
    println!("# Sales: {}", report.period.display_name());
    println!();

    if report.totals.orders == 0 {
        println!("*No orders found for this period.*");
        return;
    }

    println!("## Summary");
    println!();
    println!("| Metric | Value |");
    println!("|--------|-------|");
    println!("| Orders | {} |", report.totals.orders);
    println!("| Revenue orders | {} |", report.totals.revenue_orders);
    println!("| Revenue | {} |", money(report.totals.revenue));
    println!("| Average order | {} |", money(report.totals.average_order_value));
    println!("| Items sold | {} |", report.totals.items_sold);
    if let Some(trends) = &report.trends {
        println!("| Orders vs previous | {} |", format_delta(trends.orders_delta_pct));
        println!("| Revenue vs previous | {} |", format_delta(trends.revenue_delta_pct));
    }
    println!();

    println!("## Daily");
    println!();
    println!("| Date | Revenue | Orders |");
    println!("|------|---------|--------|");
    for bucket in &report.daily {
        println!(
            "| {} | {} | {} |",
            bucket.label,
            money(bucket.value(REVENUE_SERIES)),
            format_count(bucket.value(ORDERS_SERIES))
        );
    }
    println!();

    markdown_leaderboard("Top Dishes", &report.top_dishes_by_quantity, format_count);
    markdown_leaderboard("Top Dishes by Revenue", &report.top_dishes_by_revenue, money);
    markdown_leaderboard("Ordered Together", &report.top_pairings, format_count);
}

fn print_sales_json(report: &SalesReport) -> Result<()> {
    let json = serde_json::json!({
        "period": report.period.display_name(),
        "restaurant_id": report.restaurant_id,
        "window": report.window,
        "totals": report.totals,
        "status_breakdown": report.status_breakdown.iter().map(|(status, count)| {
            serde_json::json!({"status": status, "count": count})
        }).collect::<Vec<_>>(),
        "daily": time_series_chart(&report.daily),
        "top_dishes_by_quantity": leaderboard_chart(&report.top_dishes_by_quantity, "quantity"),
        "top_dishes_by_revenue": leaderboard_chart(&report.top_dishes_by_revenue, "revenue"),
        "top_categories": leaderboard_chart(&report.top_categories, "revenue"),
        "top_pairings": leaderboard_chart(&report.top_pairings, "orders"),
        "trends": report.trends,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

// ============================================
// Engagement
// ============================================

pub fn print_engagement(report: &EngagementReport, export: Export) -> Result<()> {
    match export {
        Export::Terminal => print_engagement_terminal(report),
        Export::Markdown => print_engagement_markdown(report),
        Export::Json => {
            let json = serde_json::json!({
                "period": report.period.display_name(),
                "window": report.window,
                "totals": report.totals,
                "daily": time_series_chart(&report.daily),
                "most_active_users": leaderboard_chart(&report.most_active_users, "interactions"),
                "top_videos": leaderboard_chart(&report.top_videos, "likes"),
                "top_creators": leaderboard_chart(&report.top_creators, "likes"),
                "trends": report.trends,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

fn print_engagement_terminal(report: &EngagementReport) {
    header(&format!("ENGAGEMENT: {}", report.period.display_name()));

    if report.totals.interactions == 0 {
        println!("  No interactions found for this period.");
        println!();
        return;
    }

    println!("SUMMARY");
    println!(
        "   Likes:    {:<12} Comments: {}",
        report.totals.likes, report.totals.comments
    );
    println!(
        "   Views:    {:<12} Users:    {}",
        report.totals.views, report.totals.unique_users
    );
    if let Some(trends) = &report.trends {
        println!(
            "   vs previous: interactions {}, likes {}",
            format_delta(trends.interactions_delta_pct),
            format_delta(trends.likes_delta_pct)
        );
    }
    println!();

    println!("DAILY");
    println!("   {:<7} {:>8} {:>9} {:>8}", "", "likes", "comments", "views");
    for bucket in &report.daily {
        println!(
            "   {:<7} {:>8} {:>9} {:>8}",
            bucket.label,
            format_count(bucket.value(LIKES_SERIES)),
            format_count(bucket.value(COMMENTS_SERIES)),
            format_count(bucket.value(VIEWS_SERIES))
        );
    }
    println!();

    print_leaderboard("MOST ACTIVE USERS", &report.most_active_users, format_count);
    print_leaderboard("TOP VIDEOS", &report.top_videos, format_count);
    print_leaderboard("TOP CREATORS", &report.top_creators, format_count);
}

fn print_engagement_markdown(report: &EngagementReport) {
    println!("# Engagement: {}", report.period.display_name());
    println!();

    if report.totals.interactions == 0 {
        println!("*No interactions found for this period.*");
        return;
    }

    println!("| Date | Likes | Comments | Views |");
    println!("|------|-------|----------|-------|");
    for bucket in &report.daily {
        println!(
            "| {} | {} | {} | {} |",
            bucket.label,
            format_count(bucket.value(LIKES_SERIES)),
            format_count(bucket.value(COMMENTS_SERIES)),
            format_count(bucket.value(VIEWS_SERIES))
        );
    }
    println!();

    markdown_leaderboard("Most Active Users", &report.most_active_users, format_count);
    markdown_leaderboard("Top Videos", &report.top_videos, format_count);
    markdown_leaderboard("Top Creators", &report.top_creators, format_count);
}

// ============================================
// Admin listings
// ============================================

pub fn print_menu(entries: &[MenuEntry], currency: &str) {
    if entries.is_empty() {
        println!("No dishes yet.");
        return;
    }
    for entry in entries {
        println!(
            "{:<24} {:<14} {:>12}  {}",
            entry.dish.name,
            entry.dish.category,
            format_money(entry.dish.price, currency),
            entry.restaurant_name
        );
        if let Some(url) = &entry.image_url {
            println!("   image: {}", url);
        }
    }
}

pub fn print_applications(applications: &[Application]) {
    if applications.is_empty() {
        println!("No applications.");
        return;
    }
    for app in applications {
        println!(
            "{:<22} {:<10} {:<28} {}",
            app.id,
            app.status.as_str(),
            app.restaurant_name.as_deref().unwrap_or("Unnamed Restaurant"),
            format_relative_time_opt(app.submitted_at)
        );
        if let Some(address) = &app.address {
            println!("   {}", address.one_line());
        }
    }
}

pub fn print_accept_outcome(outcome: &AcceptOutcome) {
    println!("Created restaurant {}", outcome.restaurant_id);
    println!(
        "   Copied {} photos and {} additional files",
        outcome.photo_urls.len(),
        outcome.additional_file_urls.len()
    );
    if !outcome.skipped_files.is_empty() {
        println!("   Skipped: {}", outcome.skipped_files.join(", "));
    }
    if !outcome.application_updated {
        println!("   Application status was not updated (see log)");
    }
    if !outcome.owner_updated {
        println!("   Owner {} was not updated (see log)", outcome.owner_id);
    }
}

pub fn print_reported(videos: &[ReportedVideo]) {
    if videos.is_empty() {
        println!("No reported videos.");
        return;
    }
    for reported in videos {
        let video = &reported.video;
        println!(
            "{:<22} {:<32} by {:<16} {:>6} views  {} report{}",
            video.id,
            video.caption,
            video.uploader_id.as_deref().unwrap_or("Unknown"),
            video.views,
            reported.reports.len(),
            if reported.reports.len() == 1 { "" } else { "s" }
        );
        for report in &reported.reports {
            println!(
                "   - {} ({})",
                report.reason,
                format_relative_time_opt(report.timestamp)
            );
            if let Some(details) = &report.additional_details {
                println!("     {}", details);
            }
        }
    }
}
