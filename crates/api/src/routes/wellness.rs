//! Mood tracking, gratitude journal and the weekly summary.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use domain::models::wellness::{
    average_mood, AddGratitudeRequest, AverageMoodResponse, CountResponse, DaysQuery,
    GratitudeEntry, GratitudeListQuery, LogMoodRequest, MoodEntry, WeeklySummary,
    DEFAULT_AVERAGE_DAYS, DEFAULT_MOOD_DAYS, SUMMARY_DAYS,
};
use persistence::repositories::{PostRepository, WellnessRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

fn since(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Log a mood value from 1 to 5.
///
/// POST /api/v1/moods
pub async fn log_mood(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<LogMoodRequest>,
) -> Result<(StatusCode, Json<MoodEntry>), ApiError> {
    request.validate()?;

    let note = request
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let entry: MoodEntry = WellnessRepository::new(state.pool.clone())
        .log_mood(user_auth.user_id, request.mood_value, note)
        .await?
        .into();

    info!(user_id = %user_auth.user_id, mood_value = entry.mood_value, "Mood logged");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Mood entries of the last `days` days (default 30), oldest first.
///
/// GET /api/v1/moods?days=
pub async fn list_moods(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<MoodEntry>>, ApiError> {
    query.validate()?;
    let days = query.days.unwrap_or(DEFAULT_MOOD_DAYS);

    let rows = WellnessRepository::new(state.pool.clone())
        .moods_since(user_auth.user_id, since(days))
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Mean mood over the last `days` days (default 7). `null` without entries.
///
/// GET /api/v1/moods/average?days=
pub async fn average_mood_for(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<DaysQuery>,
) -> Result<Json<AverageMoodResponse>, ApiError> {
    query.validate()?;
    let days = query.days.unwrap_or(DEFAULT_AVERAGE_DAYS);

    let values = WellnessRepository::new(state.pool.clone())
        .mood_values_since(user_auth.user_id, since(days))
        .await?;
    Ok(Json(AverageMoodResponse {
        days,
        average: average_mood(&values),
    }))
}

/// Add a gratitude journal entry.
///
/// POST /api/v1/gratitude
pub async fn add_gratitude(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<AddGratitudeRequest>,
) -> Result<(StatusCode, Json<GratitudeEntry>), ApiError> {
    request.validate()?;

    let entry: GratitudeEntry = WellnessRepository::new(state.pool.clone())
        .add_gratitude(user_auth.user_id, request.content.trim())
        .await?
        .into();
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Gratitude entries, newest first.
///
/// GET /api/v1/gratitude?limit=
pub async fn list_gratitude(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<GratitudeListQuery>,
) -> Result<Json<Vec<GratitudeEntry>>, ApiError> {
    query.validate()?;

    let rows = WellnessRepository::new(state.pool.clone())
        .list_gratitude(user_auth.user_id, query.limit)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// One random entry from the caller's journal, or `null` if it is empty.
///
/// GET /api/v1/gratitude/random
pub async fn random_gratitude(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<Option<GratitudeEntry>>, ApiError> {
    let entry = WellnessRepository::new(state.pool.clone())
        .random_gratitude(user_auth.user_id)
        .await?
        .map(Into::into);
    Ok(Json(entry))
}

/// GET /api/v1/gratitude/count
pub async fn gratitude_count(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<CountResponse>, ApiError> {
    let count = WellnessRepository::new(state.pool.clone())
        .gratitude_count(user_auth.user_id)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// Delete one of the caller's own entries.
///
/// DELETE /api/v1/gratitude/:entry_id
pub async fn delete_gratitude(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = WellnessRepository::new(state.pool.clone());
    let entry = repo
        .find_gratitude(entry_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Gratitude entry not found".to_string()))?;
    if entry.user_id != user_auth.user_id {
        return Err(ApiError::Forbidden(
            "You can only delete your own entries".to_string(),
        ));
    }

    repo.delete_gratitude(entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Posts written and mood trend over the last seven days.
///
/// GET /api/v1/wellness/weekly-summary
pub async fn weekly_summary(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<WeeklySummary>, ApiError> {
    let from = since(SUMMARY_DAYS);

    let post_count = PostRepository::new(state.pool.clone())
        .count_by_user_since(user_auth.user_id, from)
        .await?;
    let moods = WellnessRepository::new(state.pool.clone())
        .mood_values_since(user_auth.user_id, from)
        .await?;

    Ok(Json(WeeklySummary::build(post_count, &moods)))
}
