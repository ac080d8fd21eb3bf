//! Support groups, their members and group chat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::challenge::ChallengeInfo;
use super::user::PublicProfile;
use shared::validation::validate_not_blank;

/// The third warning removes a member from the group.
pub const WARNING_LIMIT: i32 = 3;

/// Role within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Creator,
    Admin,
    Member,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Creator => "creator",
            GroupRole::Admin => "admin",
            GroupRole::Member => "member",
        }
    }

    /// Creator and admins run the group.
    pub fn is_group_admin(&self) -> bool {
        matches!(self, GroupRole::Creator | GroupRole::Admin)
    }

    pub fn can_manage_members(&self) -> bool {
        self.is_group_admin()
    }

    pub fn can_update_settings(&self) -> bool {
        self.is_group_admin()
    }

    pub fn can_delete_group(&self) -> bool {
        matches!(self, GroupRole::Creator)
    }

    /// Whether an actor with this role may warn, remove or promote `target`.
    /// Nobody acts on the creator, and admins do not act on each other.
    pub fn can_moderate(&self, target: GroupRole) -> bool {
        match (self, target) {
            (_, GroupRole::Creator) => false,
            (GroupRole::Creator, _) => true,
            (GroupRole::Admin, GroupRole::Member) => true,
            _ => false,
        }
    }
}

impl FromStr for GroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creator" => Ok(GroupRole::Creator),
            "admin" => Ok(GroupRole::Admin),
            "member" => Ok(GroupRole::Member),
            _ => Err(format!("Invalid group role: {}", s)),
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Toggles controlling what plain members may do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupPermissions {
    pub allow_member_posting: bool,
    pub allow_member_messaging: bool,
    pub requires_approval: bool,
}

impl Default for GroupPermissions {
    fn default() -> Self {
        Self {
            allow_member_posting: true,
            allow_member_messaging: true,
            requires_approval: false,
        }
    }
}

/// Who may post in group chat. `None` means not a member.
pub fn can_send_group_message(role: Option<GroupRole>, perms: &GroupPermissions) -> bool {
    match role {
        Some(role) if role.is_group_admin() => true,
        Some(GroupRole::Member) => perms.allow_member_messaging,
        _ => false,
    }
}

/// Result of warning a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum WarningOutcome {
    Warned { warnings: i32 },
    Removed { warnings: i32 },
}

/// Applies one more warning to a member who currently has `current`.
pub fn apply_warning(current: i32) -> WarningOutcome {
    let warnings = current + 1;
    if warnings >= WARNING_LIMIT {
        WarningOutcome::Removed { warnings }
    } else {
        WarningOutcome::Warned { warnings }
    }
}

/// Activity key derived from a display name: lowercased, whitespace runs
/// become `-`, anything outside `[a-z0-9-]` is dropped.
pub fn activity_slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            out.push(c);
        }
    }
    out
}

/// Activities every new group starts with: (activity_type, name, description).
pub const DEFAULT_ACTIVITIES: [(&str, &str, &str); 3] = [
    (
        "meditation",
        "Daily Meditation",
        "Take a few quiet minutes for yourself",
    ),
    (
        "journaling",
        "Daily Journaling",
        "Write down what is on your mind",
    ),
    (
        "gratitude",
        "Gratitude Sharing",
        "Share one thing you are grateful for",
    ),
];

#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub creator_id: Uuid,
    pub cover_image_url: Option<String>,
    pub is_public: bool,
    #[serde(flatten)]
    pub permissions: GroupPermissions,
    pub is_challenge: bool,
    #[serde(flatten)]
    pub challenge: Option<ChallengeInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub warnings: i32,
    pub current_streak: i32,
    pub last_proof_date: Option<chrono::NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: Group,
    pub creator: PublicProfile,
    pub member_count: i64,
    pub is_member: bool,
    pub your_role: Option<GroupRole>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub user: Option<PublicProfile>,
    pub role: GroupRole,
    pub warnings: i32,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Category must be between 1 and 50 characters"))]
    pub category: Option<String>,

    pub is_public: Option<bool>,

    #[validate(url(message = "Cover image must be a valid URL"))]
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateGroupSettingsRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub is_public: Option<bool>,
    pub allow_member_posting: Option<bool>,
    pub allow_member_messaging: Option<bool>,
    pub requires_approval: Option<bool>,

    /// `Some(None)` clears the cover image.
    #[serde(default, deserialize_with = "double_option")]
    pub cover_image_url: Option<Option<String>>,
}

fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListGroupsQuery {
    #[serde(default)]
    pub include_private: bool,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberActionRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupInvitation {
    pub id: Uuid,
    pub group_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupActivity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub activity_type: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub author: Option<PublicProfile>,
    pub created_at: DateTime<Utc>,
}
