//! Group activity streaks: enrolment, daily check-ins and leaderboards.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::group::{activity_slug, GroupActivity};
use domain::models::streak::{
    rank_leaderboard, ActivityQuery, AvailableStreak, CheckInRequest, CheckInResponse,
    CreateStreakRequest, DailyUpdate, LeaderboardEntry, MyStreaksQuery, Streak,
    DAILY_UPDATES_PAGE, LEADERBOARD_SIZE,
};
use persistence::repositories::{GroupRepository, StreakRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_check_in;
use crate::routes::groups::{require_member, visible_group};

fn activity_filter(query: &ActivityQuery) -> Option<&str> {
    query
        .activity_type
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
}

/// Add an activity to a group. The creator is enrolled straight away.
///
/// POST /api/v1/groups/:group_id/streaks
pub async fn create_streak(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Json(request): Json<CreateStreakRequest>,
) -> Result<(StatusCode, Json<GroupActivity>), ApiError> {
    request.validate()?;

    let groups = GroupRepository::new(state.pool.clone());
    require_member(&groups, group_id, user_auth.user_id).await?;

    let name = request.name.trim();
    let activity_type = activity_slug(name);
    if activity_type.trim_matches('-').is_empty() {
        return Err(ApiError::Validation(
            "Streak name must contain letters or digits".to_string(),
        ));
    }

    let activity: GroupActivity = StreakRepository::new(state.pool.clone())
        .create_activity(
            group_id,
            &activity_type,
            name,
            request.description.as_deref(),
            user_auth.user_id,
        )
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(format!("Streak '{}' already exists in this group", activity_type))
        })?
        .into();

    info!(
        group_id = %group_id,
        activity_type = %activity.activity_type,
        created_by = %user_auth.user_id,
        "Streak created"
    );
    Ok((StatusCode::CREATED, Json(activity)))
}

/// Enrol in an activity. Accepting twice is a no-op.
///
/// POST /api/v1/groups/:group_id/streaks/:activity_type/accept
pub async fn accept_streak(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path((group_id, activity_type)): Path<(Uuid, String)>,
) -> Result<Json<Streak>, ApiError> {
    let groups = GroupRepository::new(state.pool.clone());
    require_member(&groups, group_id, user_auth.user_id).await?;

    let repo = StreakRepository::new(state.pool.clone());
    if repo.find_activity(group_id, &activity_type).await?.is_none() {
        return Err(ApiError::NotFound("Streak not found".to_string()));
    }

    let streak: Streak = repo
        .accept(group_id, user_auth.user_id, &activity_type)
        .await?
        .into();

    info!(
        group_id = %group_id,
        activity_type = %activity_type,
        user_id = %user_auth.user_id,
        "Streak accepted"
    );
    Ok(Json(streak.as_of(Utc::now().date_naive())))
}

/// Activities of a group with participant counts.
///
/// GET /api/v1/groups/:group_id/streaks
pub async fn available_streaks(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<AvailableStreak>>, ApiError> {
    let groups = GroupRepository::new(state.pool.clone());
    visible_group(&groups, group_id, user_auth.user_id).await?;

    let rows = StreakRepository::new(state.pool.clone())
        .available(group_id, user_auth.user_id)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Daily check-in: records today's update and advances the counter.
///
/// POST /api/v1/groups/:group_id/streaks/:activity_type/check-in
pub async fn check_in(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path((group_id, activity_type)): Path<(Uuid, String)>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<CheckInResponse>, ApiError> {
    request.validate()?;

    let today = Utc::now().date_naive();
    let (outcome, counter) = StreakRepository::new(state.pool.clone())
        .check_in(
            group_id,
            user_auth.user_id,
            &activity_type,
            &request.content_or_default(),
            today,
        )
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden("Accept this streak before checking in".to_string())
        })?;

    record_check_in(outcome.as_str());
    info!(
        group_id = %group_id,
        activity_type = %activity_type,
        user_id = %user_auth.user_id,
        outcome = outcome.as_str(),
        current_streak = counter.current_streak,
        "Streak check-in"
    );
    Ok(Json(CheckInResponse {
        outcome,
        current_streak: counter.current_streak,
        longest_streak: counter.longest_streak,
        last_update_date: counter.last_update_date,
    }))
}

/// The caller's streaks, across all groups or in one.
///
/// GET /api/v1/streaks/me?group_id=
pub async fn my_streaks(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<MyStreaksQuery>,
) -> Result<Json<Vec<Streak>>, ApiError> {
    let today = Utc::now().date_naive();
    let rows = StreakRepository::new(state.pool.clone())
        .for_user(user_auth.user_id, query.group_id)
        .await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| Streak::from(row).as_of(today))
            .collect(),
    ))
}

/// Top streaks in a group by effective current streak.
///
/// GET /api/v1/groups/:group_id/streaks/leaderboard?activity_type=
pub async fn leaderboard(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let groups = GroupRepository::new(state.pool.clone());
    visible_group(&groups, group_id, user_auth.user_id).await?;

    let rows = StreakRepository::new(state.pool.clone())
        .leaderboard_rows(group_id, activity_filter(&query))
        .await?;
    let entries = rank_leaderboard(
        rows.into_iter().map(|r| r.into_parts()).collect(),
        Utc::now().date_naive(),
        LEADERBOARD_SIZE as usize,
    );
    Ok(Json(entries))
}

/// Latest check-in posts for a group.
///
/// GET /api/v1/groups/:group_id/streaks/updates?activity_type=
pub async fn daily_updates(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<DailyUpdate>>, ApiError> {
    let groups = GroupRepository::new(state.pool.clone());
    visible_group(&groups, group_id, user_auth.user_id).await?;

    let rows = StreakRepository::new(state.pool.clone())
        .daily_updates(group_id, activity_filter(&query), DAILY_UPDATES_PAGE)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
