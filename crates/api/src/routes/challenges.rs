//! Challenge groups: creation, daily proofs, progress and leaving.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::challenge::{
    can_leave_challenge, ChallengeCategory, ChallengeMemberProgress, ChallengeProgress,
    CreateChallengeRequest, LeaveChallengeQuery, MyChallengeProgress, OfficialChallengesQuery,
    ProofOutcome, ProofTodayResponse, SubmitProofRequest,
};
use domain::models::group::{Group, GroupRole, GroupSummary};
use persistence::repositories::{
    ChallengeRepository, GroupRepository, NewChallenge, NewGroup, ProofSubmission,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::routes::groups::{require_member, visible_group};
use crate::routes::profiles::caller_role;

pub const CHALLENGE_GROUP_CATEGORY: &str = "challenge";

/// Loads a group and checks it is a challenge.
async fn challenge_group(repo: &GroupRepository, group_id: Uuid) -> Result<Group, ApiError> {
    let group: Group = repo
        .find_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Challenge not found".to_string()))?
        .into();
    if !group.is_challenge {
        return Err(ApiError::Validation("Group is not a challenge".to_string()));
    }
    Ok(group)
}

/// Create a challenge group. Only site admins may mark it admin-managed.
///
/// POST /api/v1/challenges
pub async fn create_challenge(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<CreateChallengeRequest>,
) -> Result<(StatusCode, Json<GroupSummary>), ApiError> {
    request.validate()?;
    let duration_days = request.duration().ok_or_else(|| {
        ApiError::Validation("Duration must be between 1 and 365 days".to_string())
    })?;

    let managed_by_admin =
        request.managed_by_admin && caller_role(&state, user_auth.user_id).await?.is_admin;
    let category = ChallengeCategory::parse_lenient(request.challenge_category.as_deref());

    let repo = GroupRepository::new(state.pool.clone());
    let created = repo
        .create_group(NewGroup {
            name: request.name.trim(),
            description: request.description.as_deref(),
            category: CHALLENGE_GROUP_CATEGORY,
            creator_id: user_auth.user_id,
            cover_image_url: request.cover_image_url.as_deref(),
            is_public: true,
            challenge: Some(NewChallenge {
                goal: request.goal.trim(),
                duration_days,
                managed_by_admin,
                category: category.as_str(),
            }),
        })
        .await?;

    info!(
        group_id = %created.id,
        creator_id = %user_auth.user_id,
        duration_days,
        managed_by_admin,
        category = category.as_str(),
        "Challenge created"
    );

    let summary = visible_group(&repo, created.id, user_auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Submit today's proof photo. One per UTC day.
///
/// POST /api/v1/challenges/:group_id/proofs
pub async fn submit_proof(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Json(request): Json<SubmitProofRequest>,
) -> Result<(StatusCode, Json<ProofOutcome>), ApiError> {
    request.validate()?;

    let groups = GroupRepository::new(state.pool.clone());
    let group = challenge_group(&groups, group_id).await?;
    let duration_days = group
        .challenge
        .as_ref()
        .map(|c| c.challenge_duration_days)
        .ok_or_else(|| ApiError::Internal("Challenge group without duration".to_string()))?;

    let today = Utc::now().date_naive();
    let outcome = match ChallengeRepository::new(state.pool.clone())
        .submit_proof(
            group_id,
            user_auth.user_id,
            request.image_url.trim(),
            today,
            duration_days,
        )
        .await?
    {
        ProofSubmission::Recorded(outcome) => outcome,
        ProofSubmission::AlreadySubmitted => {
            return Err(ApiError::Conflict(
                "Proof already submitted today".to_string(),
            ))
        }
        ProofSubmission::NotMember => {
            return Err(ApiError::Forbidden(
                "You are not a member of this challenge".to_string(),
            ))
        }
    };

    info!(
        group_id = %group_id,
        user_id = %user_auth.user_id,
        current_streak = outcome.current_streak,
        completed = outcome.completed,
        "Challenge proof recorded"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Per-member streaks and today's proof flags, plus the caller's own record.
///
/// GET /api/v1/challenges/:group_id/progress
pub async fn challenge_progress(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ChallengeProgress>, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    let group = challenge_group(&repo, group_id).await?;

    let rows = repo.list_members(group_id, Utc::now().date_naive()).await?;
    let mut my_member = None;
    let members = rows
        .into_iter()
        .map(|row| {
            let user = row.profile();
            let member = row.member;
            if member.user_id == user_auth.user_id {
                my_member = Some(MyChallengeProgress {
                    current_streak: member.current_streak,
                    completed_at: member.completed_at,
                    last_proof_date: member.last_proof_date,
                });
            }
            ChallengeMemberProgress {
                user_id: member.user_id,
                user: Some(user),
                current_streak: member.current_streak,
                completed_at: member.completed_at,
                has_proof_today: row.has_proof_today,
            }
        })
        .collect();

    Ok(Json(ChallengeProgress {
        group,
        members,
        my_member,
    }))
}

/// Leave a challenge. Allowed once completed, or with `forfeit=true`.
///
/// POST /api/v1/challenges/:group_id/leave?forfeit=
pub async fn leave_challenge(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Query(query): Query<LeaveChallengeQuery>,
) -> Result<StatusCode, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    challenge_group(&repo, group_id).await?;

    let member = require_member(&repo, group_id, user_auth.user_id).await?;
    if member.role == GroupRole::Creator {
        return Err(ApiError::Conflict(
            "The creator cannot leave; delete the challenge instead".to_string(),
        ));
    }
    if !can_leave_challenge(member.completed_at, query.forfeit) {
        return Err(ApiError::Conflict(
            "Challenge not completed; pass forfeit=true to leave anyway".to_string(),
        ));
    }

    repo.remove_member(group_id, user_auth.user_id).await?;
    info!(
        group_id = %group_id,
        user_id = %user_auth.user_id,
        forfeit = member.completed_at.is_none(),
        "Left challenge"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Admin-managed challenges, optionally by category.
///
/// GET /api/v1/challenges/official?category=
pub async fn official_challenges(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<OfficialChallengesQuery>,
) -> Result<Json<Vec<GroupSummary>>, ApiError> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
        .map(|c| ChallengeCategory::parse_lenient(Some(c)));

    let rows = ChallengeRepository::new(state.pool.clone())
        .official_challenges(user_auth.user_id, category.as_ref().map(ChallengeCategory::as_str))
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Whether the caller has already submitted today's proof.
///
/// GET /api/v1/challenges/:group_id/proof-today
pub async fn has_proof_today(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ProofTodayResponse>, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    challenge_group(&repo, group_id).await?;

    let has_proof_today = ChallengeRepository::new(state.pool.clone())
        .has_proof_on(group_id, user_auth.user_id, Utc::now().date_naive())
        .await?;
    Ok(Json(ProofTodayResponse { has_proof_today }))
}
