//! Support groups: lifecycle, membership, moderation and chat.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::conversation::{MessagePage, MessagesQuery, SendMessageRequest};
use domain::models::group::{
    can_send_group_message, CreateGroupRequest, Group, GroupInvitation, GroupMember,
    GroupMessage, GroupRole, GroupSummary, InviteRequest, ListGroupsQuery, MemberActionRequest,
    MemberResponse, UpdateGroupSettingsRequest, WarningOutcome,
};
use domain::models::notification::{NewNotification, NotificationKind};
use persistence::repositories::{
    GroupRepository, GroupSettingsChanges, NewGroup, NotificationRepository, UserRepository,
    WarningResult,
};
use shared::pagination::StreamCursor;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::routes::streams;
use crate::services::auth::normalize_email;

pub const DEFAULT_GROUP_CATEGORY: &str = "general";

fn group_not_found() -> ApiError {
    ApiError::NotFound("Group not found".to_string())
}

/// The group as seen by `user_id`. Private groups are invisible to outsiders.
pub(crate) async fn visible_group(
    repo: &GroupRepository,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<GroupSummary, ApiError> {
    let summary: GroupSummary = repo
        .find_with_membership(group_id, user_id)
        .await?
        .ok_or_else(group_not_found)?
        .into();
    if !summary.group.is_public && !summary.is_member {
        return Err(group_not_found());
    }
    Ok(summary)
}

/// The caller's membership, or 403.
pub(crate) async fn require_member(
    repo: &GroupRepository,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<GroupMember, ApiError> {
    repo.find_member(group_id, user_id)
        .await?
        .map(GroupMember::from)
        .ok_or_else(|| ApiError::Forbidden("You are not a member of this group".to_string()))
}

/// The caller's role when it passes `allowed`, or 403.
async fn require_role(
    repo: &GroupRepository,
    group_id: Uuid,
    user_id: Uuid,
    allowed: fn(&GroupRole) -> bool,
    action: &str,
) -> Result<GroupRole, ApiError> {
    let member = require_member(repo, group_id, user_id).await?;
    if allowed(&member.role) {
        Ok(member.role)
    } else {
        Err(ApiError::Forbidden(format!(
            "Only group admins can {}",
            action
        )))
    }
}

/// Loads the target member and checks the actor may act on them.
async fn moderated_target(
    repo: &GroupRepository,
    group_id: Uuid,
    actor_role: GroupRole,
    target_id: Uuid,
) -> Result<GroupMember, ApiError> {
    let target: GroupMember = repo
        .find_member(group_id, target_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;
    if !actor_role.can_moderate(target.role) {
        return Err(ApiError::Forbidden(format!(
            "A group {} cannot act on a group {}",
            actor_role, target.role
        )));
    }
    Ok(target)
}

/// Create a support group. The caller becomes its creator.
///
/// POST /api/v1/groups
pub async fn create_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupSummary>), ApiError> {
    request.validate()?;

    let repo = GroupRepository::new(state.pool.clone());
    let created = repo
        .create_group(NewGroup {
            name: request.name.trim(),
            description: request.description.as_deref(),
            category: request
                .category
                .as_deref()
                .map(str::trim)
                .unwrap_or(DEFAULT_GROUP_CATEGORY),
            creator_id: user_auth.user_id,
            cover_image_url: request.cover_image_url.as_deref(),
            is_public: request.is_public.unwrap_or(true),
            challenge: None,
        })
        .await?;

    info!(group_id = %created.id, creator_id = %user_auth.user_id, "Group created");

    let summary = visible_group(&repo, created.id, user_auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Groups the caller can see.
///
/// GET /api/v1/groups?include_private=&category=
pub async fn list_groups(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<ListGroupsQuery>,
) -> Result<Json<Vec<GroupSummary>>, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let rows = repo
        .list_groups(user_auth.user_id, query.include_private, category)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/groups/:group_id
pub async fn get_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupSummary>, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    Ok(Json(visible_group(&repo, group_id, user_auth.user_id).await?))
}

/// Join a group. Private groups need a pending invitation for the caller's email.
///
/// POST /api/v1/groups/:group_id/join
pub async fn join_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupSummary>, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    let summary: GroupSummary = repo
        .find_with_membership(group_id, user_auth.user_id)
        .await?
        .ok_or_else(group_not_found)?
        .into();
    if summary.is_member {
        return Ok(Json(summary));
    }

    if !summary.group.is_public {
        let user = UserRepository::new(state.pool.clone())
            .find_by_id(user_auth.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        if !repo.consume_invitation(group_id, &user.email).await? {
            return Err(ApiError::Forbidden(
                "This group is private; an invitation is required".to_string(),
            ));
        }
    }

    repo.add_member(group_id, user_auth.user_id, GroupRole::Member.into())
        .await?;
    info!(group_id = %group_id, user_id = %user_auth.user_id, "Joined group");

    Ok(Json(visible_group(&repo, group_id, user_auth.user_id).await?))
}

/// Leave a regular group. Challenge groups use the challenge leave route.
///
/// POST /api/v1/groups/:group_id/leave
pub async fn leave_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    let group: Group = repo
        .find_by_id(group_id)
        .await?
        .ok_or_else(group_not_found)?
        .into();
    if group.is_challenge {
        return Err(ApiError::Conflict(
            "Leave challenge groups through the challenge leave route".to_string(),
        ));
    }

    let member = require_member(&repo, group_id, user_auth.user_id).await?;
    if member.role == GroupRole::Creator {
        return Err(ApiError::Conflict(
            "The creator cannot leave; delete the group instead".to_string(),
        ));
    }

    repo.remove_member(group_id, user_auth.user_id).await?;
    info!(group_id = %group_id, user_id = %user_auth.user_id, "Left group");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a group. Creator only.
///
/// DELETE /api/v1/groups/:group_id
pub async fn delete_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    let member = require_member(&repo, group_id, user_auth.user_id).await?;
    if !member.role.can_delete_group() {
        return Err(ApiError::Forbidden(
            "Only the group creator can delete the group".to_string(),
        ));
    }

    if !repo.delete_group(group_id).await? {
        return Err(group_not_found());
    }
    info!(group_id = %group_id, user_id = %user_auth.user_id, "Group deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Members with profile, role and warnings.
///
/// GET /api/v1/groups/:group_id/members
pub async fn list_members(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    visible_group(&repo, group_id, user_auth.user_id).await?;

    let rows = repo.list_members(group_id, Utc::now().date_naive()).await?;
    let members = rows
        .into_iter()
        .map(|row| {
            let user = row.profile();
            MemberResponse {
                user: Some(user),
                role: row.member.role.into(),
                warnings: row.member.warnings,
                joined_at: row.member.joined_at,
            }
        })
        .collect();
    Ok(Json(members))
}

/// Add a user directly. Group admins only.
///
/// POST /api/v1/groups/:group_id/members
pub async fn add_member(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Json(request): Json<MemberActionRequest>,
) -> Result<StatusCode, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    require_role(
        &repo,
        group_id,
        user_auth.user_id,
        GroupRole::can_manage_members,
        "add members",
    )
    .await?;

    if UserRepository::new(state.pool.clone())
        .find_by_id(request.user_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    if !repo
        .add_member(group_id, request.user_id, GroupRole::Member.into())
        .await?
    {
        return Err(ApiError::Conflict("User is already a member".to_string()));
    }

    info!(
        group_id = %group_id,
        user_id = %request.user_id,
        added_by = %user_auth.user_id,
        "Member added"
    );
    Ok(StatusCode::CREATED)
}

/// Remove a member. The creator cannot be removed.
///
/// DELETE /api/v1/groups/:group_id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    let actor = require_role(
        &repo,
        group_id,
        user_auth.user_id,
        GroupRole::can_manage_members,
        "remove members",
    )
    .await?;
    moderated_target(&repo, group_id, actor, user_id).await?;

    repo.remove_member(group_id, user_id).await?;
    info!(
        group_id = %group_id,
        user_id = %user_id,
        removed_by = %user_auth.user_id,
        "Member removed"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Promote a member to group admin.
///
/// POST /api/v1/groups/:group_id/members/:user_id/promote
pub async fn promote_member(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    let actor = require_role(
        &repo,
        group_id,
        user_auth.user_id,
        GroupRole::can_manage_members,
        "promote members",
    )
    .await?;
    let target = moderated_target(&repo, group_id, actor, user_id).await?;
    if target.role != GroupRole::Member {
        return Err(ApiError::Conflict("Member is already an admin".to_string()));
    }

    repo.set_role(group_id, user_id, GroupRole::Admin.into())
        .await?;
    info!(
        group_id = %group_id,
        user_id = %user_id,
        promoted_by = %user_auth.user_id,
        "Member promoted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Warn a member. The third warning removes them.
///
/// POST /api/v1/groups/:group_id/members/:user_id/warn
pub async fn issue_warning(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<WarningOutcome>, ApiError> {
    let repo = GroupRepository::new(state.pool.clone());
    let actor = require_role(
        &repo,
        group_id,
        user_auth.user_id,
        GroupRole::can_manage_members,
        "warn members",
    )
    .await?;
    moderated_target(&repo, group_id, actor, user_id).await?;

    let outcome = match repo.issue_warning(group_id, user_id).await? {
        WarningResult::Applied(outcome) => outcome,
        WarningResult::NotMember => {
            return Err(ApiError::NotFound("Member not found".to_string()))
        }
    };

    info!(
        group_id = %group_id,
        user_id = %user_id,
        warned_by = %user_auth.user_id,
        outcome = ?outcome,
        "Member warned"
    );
    Ok(Json(outcome))
}

/// Update name, description, visibility, member permissions or cover.
///
/// PATCH /api/v1/groups/:group_id/settings
pub async fn update_group_settings(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Json(request): Json<UpdateGroupSettingsRequest>,
) -> Result<Json<GroupSummary>, ApiError> {
    request.validate()?;

    let repo = GroupRepository::new(state.pool.clone());
    require_role(
        &repo,
        group_id,
        user_auth.user_id,
        GroupRole::can_update_settings,
        "change settings",
    )
    .await?;

    repo.update_settings(
        group_id,
        GroupSettingsChanges {
            name: request.name.map(|n| n.trim().to_string()),
            description: request.description,
            is_public: request.is_public,
            allow_member_posting: request.allow_member_posting,
            allow_member_messaging: request.allow_member_messaging,
            requires_approval: request.requires_approval,
            cover_image_url: request.cover_image_url,
        },
    )
    .await?
    .ok_or_else(group_not_found)?;

    info!(group_id = %group_id, user_id = %user_auth.user_id, "Group settings updated");
    Ok(Json(visible_group(&repo, group_id, user_auth.user_id).await?))
}

/// Invite someone by email. Registered users are notified.
///
/// POST /api/v1/groups/:group_id/invitations
pub async fn invite_user(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Json(request): Json<InviteRequest>,
) -> Result<(StatusCode, Json<GroupInvitation>), ApiError> {
    request.validate()?;

    let repo = GroupRepository::new(state.pool.clone());
    require_role(
        &repo,
        group_id,
        user_auth.user_id,
        GroupRole::can_manage_members,
        "invite users",
    )
    .await?;

    let email = normalize_email(&request.email);
    let invitation: GroupInvitation = repo
        .create_invitation(group_id, user_auth.user_id, &email)
        .await?
        .into();

    if let Some(invitee) = UserRepository::new(state.pool.clone())
        .find_by_email(&email)
        .await?
    {
        let notification = NewNotification::new(invitee.id, NotificationKind::GroupInvite)
            .from_user(user_auth.user_id)
            .for_group(group_id);
        if let Err(e) = NotificationRepository::new(state.pool.clone())
            .insert(&notification)
            .await
        {
            warn!(group_id = %group_id, error = %e, "Failed to store group invite notification");
        }
    }

    info!(
        group_id = %group_id,
        invitation_id = %invitation.id,
        inviter_id = %user_auth.user_id,
        "User invited"
    );
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// Post to group chat.
///
/// POST /api/v1/groups/:group_id/messages
pub async fn send_group_message(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<GroupMessage>), ApiError> {
    request.validate()?;

    let repo = GroupRepository::new(state.pool.clone());
    let summary = visible_group(&repo, group_id, user_auth.user_id).await?;
    if !can_send_group_message(summary.your_role, &summary.group.permissions) {
        return Err(ApiError::Forbidden(
            "You cannot send messages in this group".to_string(),
        ));
    }

    let message: GroupMessage = repo
        .insert_message(group_id, user_auth.user_id, request.content.trim())
        .await?
        .into();

    info!(
        group_id = %group_id,
        message_id = %message.id,
        user_id = %user_auth.user_id,
        "Group message sent"
    );
    Ok((StatusCode::CREATED, Json(message)))
}

/// Group chat in ascending order. Members only.
///
/// GET /api/v1/groups/:group_id/messages?after=&limit=
pub async fn list_group_messages(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagePage<GroupMessage>>, ApiError> {
    let (after, limit) = streams::window(&query)?;

    let repo = GroupRepository::new(state.pool.clone());
    require_member(&repo, group_id, user_auth.user_id).await?;

    let messages: Vec<GroupMessage> = repo
        .list_messages(group_id, after, limit)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(streams::page(messages, query.after.as_deref(), |m| {
        StreamCursor::new(m.created_at, m.id)
    })))
}
