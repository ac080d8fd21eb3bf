//! Anonymous matching: discovery, requests, timed matches and match chat.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::conversation::{MessagePage, MessagesQuery};
use domain::models::matching::{
    filter_by_struggle, ActiveMatch, AvailableUsersQuery, Match, MatchCandidate, MatchMessage,
    MatchRequest, MatchRequestStatus, PendingMatchRequest, SendMatchMessageRequest,
    SendMatchRequest, AVAILABLE_USERS_LIMIT,
};
use persistence::repositories::{MatchRepository, UserRepository};
use shared::pagination::StreamCursor;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_match_accepted;
use crate::routes::profiles::public_profiles;
use crate::routes::streams;

/// Loads a match the caller takes part in. Outsiders get a 404.
async fn participant_match(
    repo: &MatchRepository,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<Match, ApiError> {
    repo.find_match(match_id)
        .await?
        .map(Match::from)
        .filter(|m| m.has_participant(user_id))
        .ok_or_else(|| ApiError::NotFound("Match not found".to_string()))
}

/// Loads a pending request addressed to the caller.
async fn incoming_request(
    repo: &MatchRepository,
    request_id: Uuid,
    user_id: Uuid,
) -> Result<MatchRequest, ApiError> {
    let request: MatchRequest = repo
        .find_request(request_id)
        .await?
        .map(MatchRequest::from)
        .filter(|r| r.receiver_id == user_id)
        .ok_or_else(|| ApiError::NotFound("Match request not found".to_string()))?;
    if request.status != MatchRequestStatus::Pending {
        return Err(ApiError::Conflict(
            "Match request is no longer pending".to_string(),
        ));
    }
    Ok(request)
}

async fn active_view(state: &AppState, m: &Match, user_id: Uuid) -> Result<ActiveMatch, ApiError> {
    let partner_id = m.partner_of(user_id);
    let mut profiles = public_profiles(state, &[partner_id]).await?;
    Ok(ActiveMatch::for_user(
        m,
        user_id,
        profiles.remove(&partner_id),
        Utc::now(),
    ))
}

/// Users open to matching, optionally narrowed to one struggle.
///
/// GET /api/v1/matches/available?category=
pub async fn available_users(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<AvailableUsersQuery>,
) -> Result<Json<Vec<MatchCandidate>>, ApiError> {
    let candidates: Vec<MatchCandidate> = UserRepository::new(state.pool.clone())
        .match_candidates(user_auth.user_id, AVAILABLE_USERS_LIMIT)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let struggle = query.category.as_deref().map(str::trim);
    Ok(Json(filter_by_struggle(candidates, struggle)))
}

/// Ask another user for a match.
///
/// POST /api/v1/matches/requests
pub async fn send_match_request(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<SendMatchRequest>,
) -> Result<(StatusCode, Json<MatchRequest>), ApiError> {
    if request.user_id == user_auth.user_id {
        return Err(ApiError::Validation(
            "You cannot send a match request to yourself".to_string(),
        ));
    }

    let receiver = UserRepository::new(state.pool.clone())
        .find_by_id(request.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if !receiver.available_for_matches {
        return Err(ApiError::Validation(
            "User is not available for matches".to_string(),
        ));
    }

    let created: MatchRequest = MatchRepository::new(state.pool.clone())
        .create_request(user_auth.user_id, receiver.id)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict("A match request to this user is already open".to_string())
        })?
        .into();

    info!(
        request_id = %created.id,
        sender_id = %user_auth.user_id,
        receiver_id = %receiver.id,
        "Match request sent"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// Pending requests addressed to the caller.
///
/// GET /api/v1/matches/requests
pub async fn pending_match_requests(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<Vec<PendingMatchRequest>>, ApiError> {
    let rows = MatchRepository::new(state.pool.clone())
        .pending_for_receiver(user_auth.user_id)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Accept a request, starting a timed match and notifying the sender.
///
/// POST /api/v1/matches/requests/:request_id/accept
pub async fn accept_match_request(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(request_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ActiveMatch>), ApiError> {
    let repo = MatchRepository::new(state.pool.clone());
    incoming_request(&repo, request_id, user_auth.user_id).await?;

    let started: Match = repo
        .accept_request(request_id, Utc::now())
        .await?
        .ok_or_else(|| ApiError::Conflict("Match request is no longer pending".to_string()))?
        .into();

    record_match_accepted();
    info!(
        request_id = %request_id,
        match_id = %started.id,
        expires_at = %started.expires_at,
        "Match started"
    );
    let view = active_view(&state, &started, user_auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Decline a pending request.
///
/// POST /api/v1/matches/requests/:request_id/decline
pub async fn decline_match_request(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(request_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = MatchRepository::new(state.pool.clone());
    incoming_request(&repo, request_id, user_auth.user_id).await?;

    if !repo.decline_request(request_id).await? {
        return Err(ApiError::Conflict(
            "Match request is no longer pending".to_string(),
        ));
    }
    info!(request_id = %request_id, user_id = %user_auth.user_id, "Match request declined");
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's current match with the time left on it.
///
/// GET /api/v1/matches/active
pub async fn active_match(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<ActiveMatch>, ApiError> {
    let current: Match = MatchRepository::new(state.pool.clone())
        .active_for_user(user_auth.user_id, Utc::now())
        .await?
        .ok_or_else(|| ApiError::NotFound("No active match".to_string()))?
        .into();
    Ok(Json(active_view(&state, &current, user_auth.user_id).await?))
}

/// Add fifteen minutes to an active match.
///
/// POST /api/v1/matches/:match_id/extend
pub async fn extend_match(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(match_id): Path<Uuid>,
) -> Result<Json<ActiveMatch>, ApiError> {
    let repo = MatchRepository::new(state.pool.clone());
    participant_match(&repo, match_id, user_auth.user_id).await?;

    let extended: Match = repo
        .extend(match_id, Utc::now())
        .await?
        .ok_or_else(|| ApiError::Conflict("Match has already ended".to_string()))?
        .into();

    info!(
        match_id = %match_id,
        user_id = %user_auth.user_id,
        expires_at = %extended.expires_at,
        "Match extended"
    );
    Ok(Json(active_view(&state, &extended, user_auth.user_id).await?))
}

/// End a match early.
///
/// POST /api/v1/matches/:match_id/end
pub async fn end_match(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(match_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = MatchRepository::new(state.pool.clone());
    participant_match(&repo, match_id, user_auth.user_id).await?;

    repo.end(match_id).await?;
    info!(match_id = %match_id, user_id = %user_auth.user_id, "Match ended");
    Ok(StatusCode::NO_CONTENT)
}

/// Send a chat message while the match is live.
///
/// POST /api/v1/matches/:match_id/messages
pub async fn send_match_message(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(match_id): Path<Uuid>,
    Json(request): Json<SendMatchMessageRequest>,
) -> Result<(StatusCode, Json<MatchMessage>), ApiError> {
    request.validate()?;

    let repo = MatchRepository::new(state.pool.clone());
    let current = participant_match(&repo, match_id, user_auth.user_id).await?;
    if !current.is_active(Utc::now()) {
        return Err(ApiError::Conflict("Match has ended".to_string()));
    }

    let message: MatchMessage = repo
        .insert_message(match_id, user_auth.user_id, request.content.trim())
        .await?
        .into();
    Ok((StatusCode::CREATED, Json(message)))
}

/// Match chat history, readable by both participants even after it ends.
///
/// GET /api/v1/matches/:match_id/messages?after=&limit=
pub async fn list_match_messages(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(match_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagePage<MatchMessage>>, ApiError> {
    let (after, limit) = streams::window(&query)?;

    let repo = MatchRepository::new(state.pool.clone());
    participant_match(&repo, match_id, user_auth.user_id).await?;

    let messages: Vec<MatchMessage> = repo
        .list_messages(match_id, after, limit)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(streams::page(messages, query.after.as_deref(), |m| {
        StreamCursor::new(m.created_at, m.id)
    })))
}
