//! In-app notifications.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::notification::{Notification, UnreadCountResponse, NOTIFICATION_PAGE};
use persistence::repositories::NotificationRepository;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// Latest notifications for the caller, newest first.
///
/// GET /api/v1/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let rows = NotificationRepository::new(state.pool.clone())
        .list_for_recipient(user_auth.user_id, NOTIFICATION_PAGE)
        .await?;
    Ok(Json(rows.into_iter().filter_map(|r| r.into_domain()).collect()))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let unread = NotificationRepository::new(state.pool.clone())
        .unread_count(user_auth.user_id)
        .await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// Mark one of the caller's notifications as read.
///
/// POST /api/v1/notifications/:notification_id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let updated = NotificationRepository::new(state.pool.clone())
        .mark_read(notification_id, user_auth.user_id)
        .await?;
    if !updated {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
