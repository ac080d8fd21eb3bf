//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::matching::MatchCandidate;
use domain::models::user::{MessagePreference, Profile, PublicProfile, UserRole};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for message_preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "message_preference", rename_all = "lowercase")]
pub enum MessagePreferenceDb {
    Direct,
    Requests,
    None,
}

impl From<MessagePreferenceDb> for MessagePreference {
    fn from(db: MessagePreferenceDb) -> Self {
        match db {
            MessagePreferenceDb::Direct => MessagePreference::Direct,
            MessagePreferenceDb::Requests => MessagePreference::Requests,
            MessagePreferenceDb::None => MessagePreference::None,
        }
    }
}

impl From<MessagePreference> for MessagePreferenceDb {
    fn from(pref: MessagePreference) -> Self {
        match pref {
            MessagePreference::Direct => MessagePreferenceDb::Direct,
            MessagePreference::Requests => MessagePreferenceDb::Requests,
            MessagePreference::None => MessagePreferenceDb::None,
        }
    }
}

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub is_premium: bool,
    pub premium_activated_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_staff: bool,
    pub message_preference: MessagePreferenceDb,
    pub available_for_matches: bool,
    pub match_struggles: Vec<String>,
    pub reports_received_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserEntity {
    pub fn role(&self) -> UserRole {
        UserRole {
            is_admin: self.is_admin,
            is_staff: self.is_staff,
        }
    }
}

impl From<UserEntity> for Profile {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            display_name: entity.display_name,
            anonymous_username: entity.anonymous_username,
            avatar_url: entity.avatar_url,
            is_premium: entity.is_premium,
            premium_activated_at: entity.premium_activated_at,
            is_admin: entity.is_admin,
            is_staff: entity.is_staff,
            message_preference: entity.message_preference.into(),
            available_for_matches: entity.available_for_matches,
            match_struggles: entity.match_struggles,
            reports_received_count: entity.reports_received_count,
            created_at: entity.created_at,
        }
    }
}

/// Public columns of a user, for joins and batch lookups.
#[derive(Debug, Clone, FromRow)]
pub struct PublicProfileEntity {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<PublicProfileEntity> for PublicProfile {
    fn from(entity: PublicProfileEntity) -> Self {
        Self {
            id: entity.id,
            display_name: entity.display_name,
            anonymous_username: entity.anonymous_username,
            avatar_url: entity.avatar_url,
        }
    }
}

/// Profile counters for a profile page.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileStatsEntity {
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub is_following: bool,
}

/// A user who opted in to matching.
#[derive(Debug, Clone, FromRow)]
pub struct MatchCandidateEntity {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
    pub match_struggles: Vec<String>,
}

impl From<MatchCandidateEntity> for MatchCandidate {
    fn from(entity: MatchCandidateEntity) -> Self {
        Self {
            profile: PublicProfile {
                id: entity.id,
                display_name: entity.display_name,
                anonymous_username: entity.anonymous_username,
                avatar_url: entity.avatar_url,
            },
            match_struggles: entity.match_struggles,
        }
    }
}

/// Per-day login count row.
#[derive(Debug, Clone, FromRow)]
pub struct LoginDayEntity {
    pub day: chrono::NaiveDate,
    pub count: i64,
}
