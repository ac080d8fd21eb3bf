//! User reports and the moderation queue.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::post::{FlaggedPost, Report, ReportPostRequest};
use persistence::repositories::PostRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::routes::profiles::{public_profiles, require_moderator};

/// Report a post for review.
///
/// POST /api/v1/posts/:post_id/report
pub async fn report_post(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(post_id): Path<Uuid>,
    Json(request): Json<ReportPostRequest>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    request.validate()?;

    let repo = PostRepository::new(state.pool.clone());
    let post = repo
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    let report: Report = repo
        .create_report(post_id, post.user_id, user_auth.user_id, request.reason.trim())
        .await?
        .into();

    info!(
        report_id = %report.id,
        post_id = %post_id,
        reporter_id = %user_auth.user_id,
        "Post reported"
    );
    Ok((StatusCode::CREATED, Json(report)))
}

/// Posts held by the toxicity check, with their open report counts.
///
/// GET /api/v1/moderation/flagged-posts
///
/// Requires admin or staff.
pub async fn list_flagged_posts(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<Vec<FlaggedPost>>, ApiError> {
    require_moderator(&state, user_auth.user_id).await?;

    let rows = PostRepository::new(state.pool.clone()).list_flagged().await?;
    let mut author_ids: Vec<Uuid> = rows.iter().map(|r| r.post.user_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors = public_profiles(&state, &author_ids).await?;

    let flagged = rows
        .into_iter()
        .map(|row| FlaggedPost {
            author: authors.get(&row.post.user_id).cloned(),
            post: row.post.into(),
            pending_reports: row.pending_reports,
        })
        .collect();
    Ok(Json(flagged))
}
