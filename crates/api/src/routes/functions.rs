//! Privileged functions: staff accounts, moderation approval, media upload
//! and login statistics.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use domain::models::admin::{
    fill_login_days, ApproveFlaggedPostRequest, ApproveFlaggedPostResponse,
    CreateStaffUserRequest, CreateStaffUserResponse, LoginStat, LoginStatsQuery,
    UploadMediaRequest, UploadMediaResponse, DEFAULT_LOGIN_STAT_DAYS,
};
use persistence::repositories::{PostRepository, UserRepository};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::routes::profiles::{require_admin, require_moderator};
use crate::services::{AuthService, Registration};

/// Create a staff account. Admin only.
///
/// POST /api/v1/functions/create-staff-user
pub async fn create_staff_user(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<CreateStaffUserRequest>,
) -> Result<(StatusCode, Json<CreateStaffUserResponse>), ApiError> {
    require_admin(&state, user_auth.user_id).await?;
    request.validate()?;

    let profile = AuthService::new(state.pool.clone(), state.jwt.clone())
        .create_account(Registration {
            email: &request.email,
            password: &request.password,
            display_name: request.display_name.as_deref(),
            anonymous_username: None,
            is_staff: true,
        })
        .await?;

    info!(
        staff_user_id = %profile.id,
        created_by = %user_auth.user_id,
        "Staff user created"
    );
    Ok((
        StatusCode::CREATED,
        Json(CreateStaffUserResponse {
            user_id: profile.id,
            email: profile.email,
        }),
    ))
}

/// Clear a flagged post and resolve its pending reports. Moderators only.
///
/// POST /api/v1/functions/approve-flagged-post
pub async fn approve_flagged_post(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<ApproveFlaggedPostRequest>,
) -> Result<Json<ApproveFlaggedPostResponse>, ApiError> {
    require_moderator(&state, user_auth.user_id).await?;

    let resolved_reports = PostRepository::new(state.pool.clone())
        .approve(request.post_id, user_auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    info!(
        post_id = %request.post_id,
        reviewer_id = %user_auth.user_id,
        resolved_reports,
        "Flagged post approved"
    );
    Ok(Json(ApproveFlaggedPostResponse {
        post_id: request.post_id,
        resolved_reports,
    }))
}

/// Store a base64 image or video under the caller's folder.
///
/// POST /api/v1/functions/upload-media
pub async fn upload_media(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<UploadMediaRequest>,
) -> Result<(StatusCode, Json<UploadMediaResponse>), ApiError> {
    request.validate()?;

    state
        .media
        .upload(
            user_auth.user_id,
            request.path.trim(),
            &request.content_type,
            &request.base64,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadMediaResponse {
            path: request.path.trim().to_string(),
        }),
    ))
}

/// Daily login counts, zero-filled. Admin only.
///
/// GET /api/v1/functions/login-stats?days=
pub async fn login_stats(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<LoginStatsQuery>,
) -> Result<Json<Vec<LoginStat>>, ApiError> {
    require_admin(&state, user_auth.user_id).await?;
    query.validate()?;

    let days = query.days.unwrap_or(DEFAULT_LOGIN_STAT_DAYS);
    let today = Utc::now().date_naive();
    let counts: Vec<_> = UserRepository::new(state.pool.clone())
        .login_counts_since(today - Duration::days(days))
        .await?
        .into_iter()
        .map(|row| (row.day, row.count))
        .collect();

    Ok(Json(fill_login_days(today, days, &counts)))
}
