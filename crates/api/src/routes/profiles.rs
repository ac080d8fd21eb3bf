//! Profile, follow graph, role and premium routes.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::user::{
    PremiumStatus, Profile, ProfilePage, PublicProfile, UpdateProfileRequest, UserRole,
};
use persistence::repositories::{ProfileChanges, UserRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// Public profiles for a batch of users, keyed by id.
pub(crate) async fn public_profiles(
    state: &AppState,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, PublicProfile>, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    let rows = repo.find_public_by_ids(ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let profile = PublicProfile::from(row);
            (profile.id, profile)
        })
        .collect())
}

/// Site role of the caller.
pub(crate) async fn caller_role(state: &AppState, user_id: Uuid) -> Result<UserRole, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    let user = repo.find_by_id(user_id).await?.ok_or_else(user_not_found)?;
    Ok(user.role())
}

/// Fails with 403 unless the caller is a site admin.
pub(crate) async fn require_admin(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    if caller_role(state, user_id).await?.is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".to_string()))
    }
}

/// Fails with 403 unless the caller is an admin or staff member.
pub(crate) async fn require_moderator(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    if caller_role(state, user_id).await?.can_moderate() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin or staff access required".to_string()))
    }
}

/// Get the caller's full profile.
///
/// GET /api/v1/profiles/me
pub async fn get_my_profile(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<Profile>, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    let user = repo
        .find_by_id(user_auth.user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user.into()))
}

/// Update the caller's profile. Absent fields are left alone.
///
/// PUT /api/v1/profiles/me
pub async fn update_my_profile(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    request.validate()?;
    if request.is_empty() {
        return Err(ApiError::Validation("No profile fields to update".to_string()));
    }

    let repo = UserRepository::new(state.pool.clone());
    let changes = ProfileChanges {
        display_name: request.display_name.map(|s| s.trim().to_string()),
        anonymous_username: request.anonymous_username,
        avatar_url: request.avatar_url,
        message_preference: request.message_preference.map(Into::into),
        available_for_matches: request.available_for_matches,
        match_struggles: request.match_struggles,
    };
    let user = repo
        .update_profile(user_auth.user_id, changes)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = %user_auth.user_id, "Profile updated");
    Ok(Json(user.into()))
}

/// Public profile with follower counters.
///
/// GET /api/v1/profiles/:user_id
pub async fn get_user_profile(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfilePage>, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    let user = repo.find_by_id(user_id).await?.ok_or_else(user_not_found)?;
    let stats = repo.profile_stats(user_id, user_auth.user_id).await?;

    let profile: Profile = user.into();
    Ok(Json(ProfilePage {
        profile: profile.public(),
        followers_count: stats.followers_count,
        following_count: stats.following_count,
        posts_count: stats.posts_count,
        is_following: stats.is_following,
    }))
}

/// Follow a user. Following twice is a no-op.
///
/// POST /api/v1/profiles/:user_id/follow
pub async fn follow(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if user_id == user_auth.user_id {
        return Err(ApiError::Validation("You cannot follow yourself".to_string()));
    }

    let repo = UserRepository::new(state.pool.clone());
    if repo.find_by_id(user_id).await?.is_none() {
        return Err(user_not_found());
    }
    repo.follow(user_auth.user_id, user_id).await?;

    info!(follower_id = %user_auth.user_id, following_id = %user_id, "User followed");
    Ok(StatusCode::NO_CONTENT)
}

/// Stop following a user.
///
/// DELETE /api/v1/profiles/:user_id/follow
pub async fn unfollow(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    if !repo.unfollow(user_auth.user_id, user_id).await? {
        return Err(ApiError::NotFound("Not following this user".to_string()));
    }
    info!(follower_id = %user_auth.user_id, following_id = %user_id, "User unfollowed");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/profiles/:user_id/followers
pub async fn followers(
    State(state): State<AppState>,
    _user_auth: UserAuth,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<PublicProfile>>, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    let rows = repo.followers(user_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/profiles/:user_id/following
pub async fn following(
    State(state): State<AppState>,
    _user_auth: UserAuth,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<PublicProfile>>, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    let rows = repo.following(user_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/profiles/me/role
pub async fn get_my_role(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<UserRole>, ApiError> {
    Ok(Json(caller_role(&state, user_auth.user_id).await?))
}

async fn set_premium(
    state: &AppState,
    user_id: Uuid,
    active: bool,
) -> Result<PremiumStatus, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    let (is_premium, premium_activated_at) = repo
        .set_premium(user_id, active)
        .await?
        .ok_or_else(user_not_found)?;
    info!(user_id = %user_id, is_premium, "Premium status changed");
    Ok(PremiumStatus {
        is_premium,
        premium_activated_at,
    })
}

/// POST /api/v1/premium/activate
pub async fn activate_premium(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<PremiumStatus>, ApiError> {
    Ok(Json(set_premium(&state, user_auth.user_id, true).await?))
}

/// POST /api/v1/premium/cancel
pub async fn cancel_premium(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<PremiumStatus>, ApiError> {
    Ok(Json(set_premium(&state, user_auth.user_id, false).await?))
}

/// GET /api/v1/premium/status
pub async fn premium_status(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<PremiumStatus>, ApiError> {
    let repo = UserRepository::new(state.pool.clone());
    let user = repo
        .find_by_id(user_auth.user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(PremiumStatus {
        is_premium: user.is_premium,
        premium_activated_at: user.premium_activated_at,
    }))
}
