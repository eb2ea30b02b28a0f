//! Engagement report across the platform
//!
//! Interactions in the window are bucketed per day and ranked three ways:
//! most active users, most liked videos, and creators by likes received.
//! Videos and user names are resolved with batched membership queries.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::LikeAttribution;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::store::Filter;
use crate::types::{Interaction, InteractionKind, TargetKind, UserProfile, Video};

use super::buckets::{DailyAggregator, DailyBucket};
use super::leaderboard::{rank_top_n, LeaderboardEntry, Tally};
use super::period::{calc_delta, DateWindow, ReportPeriod};
use super::ReportOptions;

pub const LIKES_SERIES: &str = "likes";
pub const COMMENTS_SERIES: &str = "comments";
pub const VIEWS_SERIES: &str = "views";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementTotals {
    pub interactions: usize,
    pub likes: usize,
    pub comments: usize,
    pub views: usize,
    pub unique_users: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementTrends {
    pub interactions_delta_pct: f64,
    pub likes_delta_pct: f64,
    pub previous_totals: EngagementTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementReport {
    pub period: ReportPeriod,
    pub window: DateWindow,
    pub totals: EngagementTotals,
    /// Likes, comments and views per day
    pub daily: Vec<DailyBucket>,
    pub most_active_users: Vec<LeaderboardEntry>,
    pub top_videos: Vec<LeaderboardEntry>,
    pub top_creators: Vec<LeaderboardEntry>,
    pub trends: Option<EngagementTrends>,
}

fn is_kind(interaction: &Interaction, kind: &InteractionKind) -> f64 {
    if &interaction.kind == kind {
        1.0
    } else {
        0.0
    }
}

/// Build the engagement report over `period`.
pub async fn generate_engagement_report(
    fetcher: &Fetcher<'_>,
    period: ReportPeriod,
    options: &ReportOptions,
) -> Result<EngagementReport> {
    let window = period.window(options.offset)?;
    let previous_window = if options.include_trends {
        Some(period.previous()?.window(options.offset)?)
    } else {
        None
    };

    let (interactions, previous) = tokio::try_join!(
        fetch_interactions(fetcher, window),
        async {
            match previous_window {
                Some(w) => fetch_interactions(fetcher, w).await.map(Some),
                None => Ok(None),
            }
        },
    )?;

    let likes: Vec<&Interaction> = interactions
        .iter()
        .filter(|i| i.kind == InteractionKind::Like)
        .collect();

    // Likes on a user profile never point at a video
    let video_ids: Vec<String> = likes
        .iter()
        .filter(|i| i.target_kind != Some(TargetKind::User))
        .map(|i| i.target_id.clone())
        .collect();
    let actor_ids: Vec<String> = interactions.iter().map(|i| i.user_id.clone()).collect();

    let (videos, actors) = tokio::try_join!(
        fetcher.fetch_by_ids::<Video>(&video_ids),
        fetcher.fetch_by_ids::<UserProfile>(&actor_ids),
    )?;
    let videos: HashMap<&str, &Video> = videos.iter().map(|v| (v.id.as_str(), v)).collect();

    tracing::info!(
        period = %period.display_name(),
        interactions = interactions.len(),
        likes = likes.len(),
        videos = videos.len(),
        "Building engagement report"
    );

    let mut active = Tally::new();
    for interaction in &interactions {
        active.add(&interaction.user_id, 1.0);
    }

    let mut video_likes = Tally::new();
    let mut creators = Tally::new();
    for like in &likes {
        let video = videos.get(like.target_id.as_str());
        if let Some(video) = video {
            video_likes.add(&video.id, 1.0);
        }
        let credited = match options.like_attribution {
            LikeAttribution::Actor => Some(like.user_id.as_str()),
            LikeAttribution::Owner => match video {
                Some(video) => video.uploader_id.as_deref(),
                None if like.target_kind == Some(TargetKind::User) => Some(like.target_id.as_str()),
                None => None,
            },
        };
        if let Some(subject) = credited {
            creators.add(subject, 1.0);
        }
    }

    let mut names: HashMap<String, String> = actors
        .into_iter()
        .map(|u| (u.id.clone(), u.label().to_string()))
        .collect();
    let unresolved: Vec<String> = creators
        .entries()
        .map(|(s, _)| s.to_string())
        .filter(|s| !names.contains_key(s))
        .collect();
    for user in fetcher.fetch_by_ids::<UserProfile>(&unresolved).await? {
        names.insert(user.id.clone(), user.label().to_string());
    }

    let user_name = |id: &str| names.get(id).cloned().unwrap_or_else(|| id.to_string());
    let video_name = |id: &str| {
        videos
            .get(id)
            .map(|v| v.caption.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let daily = DailyAggregator::new(options.offset, |i: &Interaction| i.timestamp)
        .series(LIKES_SERIES, |i: &Interaction| is_kind(i, &InteractionKind::Like))
        .series(COMMENTS_SERIES, |i: &Interaction| {
            is_kind(i, &InteractionKind::Comment)
        })
        .series(VIEWS_SERIES, |i: &Interaction| is_kind(i, &InteractionKind::View))
        .aggregate(&interactions);

    let totals = compute_totals(&interactions);
    let trends = previous.map(|previous| {
        let previous_totals = compute_totals(&previous);
        EngagementTrends {
            interactions_delta_pct: calc_delta(
                totals.interactions as f64,
                previous_totals.interactions as f64,
            ),
            likes_delta_pct: calc_delta(totals.likes as f64, previous_totals.likes as f64),
            previous_totals,
        }
    });

    Ok(EngagementReport {
        period,
        window,
        totals,
        daily,
        most_active_users: rank_top_n(&active, options.top_n, user_name),
        top_videos: rank_top_n(&video_likes, options.top_n, video_name),
        top_creators: rank_top_n(&creators, options.top_n, user_name),
        trends,
    })
}

async fn fetch_interactions(fetcher: &Fetcher<'_>, window: DateWindow) -> Result<Vec<Interaction>> {
    fetcher
        .fetch(vec![Filter::between("timestamp", window.start, window.end)])
        .await
}

fn compute_totals(interactions: &[Interaction]) -> EngagementTotals {
    let count = |kind: InteractionKind| interactions.iter().filter(|i| i.kind == kind).count();
    EngagementTotals {
        interactions: interactions.len(),
        likes: count(InteractionKind::Like),
        comments: count(InteractionKind::Comment),
        views: count(InteractionKind::View),
        unique_users: interactions
            .iter()
            .map(|i| i.user_id.as_str())
            .collect::<HashSet<_>>()
            .len(),
    }
}
