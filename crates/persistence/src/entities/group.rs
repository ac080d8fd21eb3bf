//! Group entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::challenge::{ChallengeCategory, ChallengeInfo};
use domain::models::group::{
    Group, GroupActivity, GroupInvitation, GroupMember, GroupMessage, GroupPermissions, GroupRole,
    GroupSummary,
};
use domain::models::streak::AvailableStreak;
use domain::models::user::PublicProfile;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for group_role that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "group_role", rename_all = "lowercase")]
pub enum GroupRoleDb {
    Creator,
    Admin,
    Member,
}

impl From<GroupRoleDb> for GroupRole {
    fn from(db_role: GroupRoleDb) -> Self {
        match db_role {
            GroupRoleDb::Creator => GroupRole::Creator,
            GroupRoleDb::Admin => GroupRole::Admin,
            GroupRoleDb::Member => GroupRole::Member,
        }
    }
}

impl From<GroupRole> for GroupRoleDb {
    fn from(role: GroupRole) -> Self {
        match role {
            GroupRole::Creator => GroupRoleDb::Creator,
            GroupRole::Admin => GroupRoleDb::Admin,
            GroupRole::Member => GroupRoleDb::Member,
        }
    }
}

/// Database row mapping for the groups table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub creator_id: Uuid,
    pub cover_image_url: Option<String>,
    pub is_public: bool,
    pub allow_member_posting: bool,
    pub allow_member_messaging: bool,
    pub requires_approval: bool,
    pub is_challenge: bool,
    pub challenge_goal: Option<String>,
    pub challenge_duration_days: Option<i32>,
    pub managed_by_admin: bool,
    pub challenge_category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupEntity> for Group {
    fn from(entity: GroupEntity) -> Self {
        // Challenge columns are constrained to be present for challenge groups.
        let challenge = match (entity.is_challenge, entity.challenge_goal) {
            (true, Some(goal)) => Some(ChallengeInfo {
                challenge_goal: goal,
                challenge_duration_days: entity.challenge_duration_days.unwrap_or(7),
                managed_by_admin: entity.managed_by_admin,
                challenge_category: ChallengeCategory::parse_lenient(
                    entity.challenge_category.as_deref(),
                ),
            }),
            _ => None,
        };

        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            category: entity.category,
            creator_id: entity.creator_id,
            cover_image_url: entity.cover_image_url,
            is_public: entity.is_public,
            permissions: GroupPermissions {
                allow_member_posting: entity.allow_member_posting,
                allow_member_messaging: entity.allow_member_messaging,
                requires_approval: entity.requires_approval,
            },
            is_challenge: entity.is_challenge,
            challenge,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Group with aggregates for the caller.
#[derive(Debug, Clone, FromRow)]
pub struct GroupWithMembershipEntity {
    #[sqlx(flatten)]
    pub group: GroupEntity,
    pub member_count: i64,
    pub your_role: Option<GroupRoleDb>,
    pub creator_display_name: Option<String>,
    pub creator_anonymous_username: Option<String>,
    pub creator_avatar_url: Option<String>,
}

impl GroupWithMembershipEntity {
    pub fn creator(&self) -> PublicProfile {
        PublicProfile {
            id: self.group.creator_id,
            display_name: self.creator_display_name.clone(),
            anonymous_username: self.creator_anonymous_username.clone(),
            avatar_url: self.creator_avatar_url.clone(),
        }
    }
}

impl From<GroupWithMembershipEntity> for GroupSummary {
    fn from(row: GroupWithMembershipEntity) -> Self {
        let creator = row.creator();
        let your_role = row.your_role.map(GroupRole::from);
        Self {
            group: row.group.into(),
            creator,
            member_count: row.member_count,
            is_member: your_role.is_some(),
            your_role,
        }
    }
}

/// Database row mapping for the group_members table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberEntity {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRoleDb,
    pub warnings: i32,
    pub current_streak: i32,
    pub last_proof_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMemberEntity> for GroupMember {
    fn from(entity: GroupMemberEntity) -> Self {
        Self {
            group_id: entity.group_id,
            user_id: entity.user_id,
            role: entity.role.into(),
            warnings: entity.warnings,
            current_streak: entity.current_streak,
            last_proof_date: entity.last_proof_date,
            completed_at: entity.completed_at,
            joined_at: entity.joined_at,
        }
    }
}

/// Member joined with the user's public columns.
#[derive(Debug, Clone, FromRow)]
pub struct MemberWithUserEntity {
    #[sqlx(flatten)]
    pub member: GroupMemberEntity,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
    pub has_proof_today: bool,
}

impl MemberWithUserEntity {
    pub fn profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.member.user_id,
            display_name: self.display_name.clone(),
            anonymous_username: self.anonymous_username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Database row mapping for the group_activities table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupActivityEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub activity_type: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<GroupActivityEntity> for GroupActivity {
    fn from(entity: GroupActivityEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            activity_type: entity.activity_type,
            name: entity.name,
            description: entity.description,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AvailableStreakEntity {
    pub activity_type: String,
    pub name: String,
    pub description: Option<String>,
    pub participant_count: i64,
    pub is_accepted: bool,
}

impl From<AvailableStreakEntity> for AvailableStreak {
    fn from(entity: AvailableStreakEntity) -> Self {
        Self {
            activity_type: entity.activity_type,
            name: entity.name,
            description: entity.description,
            participant_count: entity.participant_count,
            is_accepted: entity.is_accepted,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupMessageEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<GroupMessageEntity> for GroupMessage {
    fn from(entity: GroupMessageEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            user_id: entity.user_id,
            content: entity.content,
            author: Some(PublicProfile {
                id: entity.user_id,
                display_name: entity.display_name,
                anonymous_username: entity.anonymous_username,
                avatar_url: entity.avatar_url,
            }),
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupInvitationEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<GroupInvitationEntity> for GroupInvitation {
    fn from(entity: GroupInvitationEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            inviter_id: entity.inviter_id,
            invitee_email: entity.invitee_email,
            status: entity.status,
            created_at: entity.created_at,
        }
    }
}
