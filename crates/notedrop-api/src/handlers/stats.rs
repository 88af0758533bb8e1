//! Dashboard stats, the timeline histogram, and the tag list.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use notedrop_core::{NoteRepository, TagRepository};

use crate::error::ApiError;
use crate::services::sessions::Session;
use crate::AppState;

/// GET /api/stats
pub async fn stats(
    State(state): State<AppState>,
    _session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.db.notes.stats().await?;
    Ok(Json(stats))
}

/// GET /api/tags
pub async fn list_tags(
    State(state): State<AppState>,
    _session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state.db.tags.list_with_counts().await?;
    Ok(Json(tags))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineQuery {
    /// Minutes east of UTC to bucket days in; defaults to UTC.
    pub utc_offset: Option<i32>,
}

#[derive(Debug, Default, Serialize)]
pub struct DayBucket {
    pub count: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct MonthBucket {
    pub count: i64,
    pub days: BTreeMap<u32, DayBucket>,
}

#[derive(Debug, Default, Serialize)]
pub struct YearBucket {
    pub count: i64,
    pub months: BTreeMap<u32, MonthBucket>,
}

pub type Timeline = BTreeMap<i32, YearBucket>;

/// Bucket note timestamps into year → month → day counts in the given
/// UTC offset.
pub fn build_timeline(timestamps: &[DateTime<Utc>], utc_offset_minutes: i32) -> Timeline {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());

    let mut timeline = Timeline::new();
    for ts in timestamps {
        let local = ts.with_timezone(&offset);
        let year = timeline.entry(local.year()).or_default();
        year.count += 1;
        let month = year.months.entry(local.month()).or_default();
        month.count += 1;
        month.days.entry(local.day()).or_default().count += 1;
    }
    timeline
}

/// GET /api/notes/timeline
pub async fn timeline(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<TimelineQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let timestamps = state.db.notes.update_timestamps().await?;
    Ok(Json(build_timeline(
        &timestamps,
        query.utc_offset.unwrap_or(0),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timeline_counts_nested_levels() {
        let timestamps = vec![
            Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 5, 18, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 9, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap(),
        ];
        let timeline = build_timeline(&timestamps, 0);

        assert_eq!(timeline[&2026].count, 3);
        assert_eq!(timeline[&2026].months[&3].count, 3);
        assert_eq!(timeline[&2026].months[&3].days[&5].count, 2);
        assert_eq!(timeline[&2026].months[&3].days[&9].count, 1);
        assert_eq!(timeline[&2025].count, 1);
    }

    #[test]
    fn test_timeline_offset_shifts_day_boundary() {
        // 23:30 UTC on Dec 31 is already Jan 1 at +60 minutes.
        let timestamps = vec![Utc.with_ymd_and_hms(2025, 12, 31, 23, 30, 0).unwrap()];

        let utc = build_timeline(&timestamps, 0);
        assert_eq!(utc[&2025].months[&12].days[&31].count, 1);

        let shifted = build_timeline(&timestamps, 60);
        assert_eq!(shifted[&2026].months[&1].days[&1].count, 1);
    }

    #[test]
    fn test_timeline_empty_input() {
        assert!(build_timeline(&[], 0).is_empty());
    }

    #[test]
    fn test_timeline_invalid_offset_falls_back_to_utc() {
        let timestamps = vec![Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()];
        // 30 hours east is not a real offset.
        let timeline = build_timeline(&timestamps, 30 * 60);
        assert_eq!(timeline[&2026].months[&6].days[&1].count, 1);
    }
}
