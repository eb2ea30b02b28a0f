//! Reported video moderation

use futures::future::try_join_all;
use serde::Serialize;

use crate::error::Result;
use crate::fetch::Fetcher;
use crate::store::{collections, Filter};
use crate::types::{Report, Video};

/// A video with every report filed against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedVideo {
    pub video: Video,
    pub reports: Vec<Report>,
}

/// All reported videos with their reports.
///
/// Reports are grouped by video; the videos are then fetched in membership
/// batches. Reports on videos that no longer exist are left out.
pub async fn reported_videos(fetcher: &Fetcher<'_>) -> Result<Vec<ReportedVideo>> {
    let reports: Vec<Report> = fetcher.fetch(Vec::new()).await?;

    let mut grouped: Vec<(String, Vec<Report>)> = Vec::new();
    for report in reports {
        let Some(video_id) = report.video_id.clone() else {
            continue;
        };
        match grouped.iter_mut().find(|(id, _)| *id == video_id) {
            Some((_, list)) => list.push(report),
            None => grouped.push((video_id, vec![report])),
        }
    }

    let ids: Vec<String> = grouped.iter().map(|(id, _)| id.clone()).collect();
    let videos: Vec<Video> = fetcher.fetch_by_ids(&ids).await?;

    tracing::info!(
        reported = ids.len(),
        found = videos.len(),
        "Loaded reported videos"
    );

    Ok(videos
        .into_iter()
        .map(|video| {
            let reports = grouped
                .iter()
                .find(|(id, _)| *id == video.id)
                .map(|(_, reports)| reports.clone())
                .unwrap_or_default();
            ReportedVideo { video, reports }
        })
        .collect())
}

/// Delete a video and every report about it. Returns the number of reports removed.
pub async fn delete_video(fetcher: &Fetcher<'_>, video_id: &str) -> Result<usize> {
    let store = fetcher.store();
    let session = fetcher.session();

    store.delete(session, collections::VIDEOS, video_id).await?;

    let reports: Vec<Report> = fetcher
        .fetch(vec![Filter::eq("videoId", video_id)])
        .await?;
    try_join_all(
        reports
            .iter()
            .map(|report| store.delete(session, collections::REPORTS, &report.id)),
    )
    .await?;

    tracing::info!(video_id = %video_id, reports = reports.len(), "Deleted video and its reports");
    Ok(reports.len())
}
