//! Match request, match and match message entities.

use chrono::{DateTime, Utc};
use domain::models::matching::{
    Match, MatchCandidate, MatchMessage, MatchRequest, MatchRequestStatus, MatchStatus,
    PendingMatchRequest,
};
use domain::models::user::PublicProfile;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "match_request_status", rename_all = "lowercase")]
pub enum MatchRequestStatusDb {
    Pending,
    Accepted,
    Declined,
}

impl From<MatchRequestStatusDb> for MatchRequestStatus {
    fn from(db: MatchRequestStatusDb) -> Self {
        match db {
            MatchRequestStatusDb::Pending => MatchRequestStatus::Pending,
            MatchRequestStatusDb::Accepted => MatchRequestStatus::Accepted,
            MatchRequestStatusDb::Declined => MatchRequestStatus::Declined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
pub enum MatchStatusDb {
    Active,
    Ended,
}

impl From<MatchStatusDb> for MatchStatus {
    fn from(db: MatchStatusDb) -> Self {
        match db {
            MatchStatusDb::Active => MatchStatus::Active,
            MatchStatusDb::Ended => MatchStatus::Ended,
        }
    }
}

/// Database row mapping for the match_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct MatchRequestEntity {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: MatchRequestStatusDb,
    pub created_at: DateTime<Utc>,
}

impl From<MatchRequestEntity> for MatchRequest {
    fn from(entity: MatchRequestEntity) -> Self {
        Self {
            id: entity.id,
            sender_id: entity.sender_id,
            receiver_id: entity.receiver_id,
            status: entity.status.into(),
            created_at: entity.created_at,
        }
    }
}

/// Pending request joined with the sender's public columns.
#[derive(Debug, Clone, FromRow)]
pub struct PendingMatchRequestEntity {
    #[sqlx(flatten)]
    pub request: MatchRequestEntity,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
    pub match_struggles: Vec<String>,
}

impl From<PendingMatchRequestEntity> for PendingMatchRequest {
    fn from(entity: PendingMatchRequestEntity) -> Self {
        let sender = MatchCandidate {
            profile: PublicProfile {
                id: entity.request.sender_id,
                display_name: entity.display_name,
                anonymous_username: entity.anonymous_username,
                avatar_url: entity.avatar_url,
            },
            match_struggles: entity.match_struggles,
        };
        Self {
            request: entity.request.into(),
            sender: Some(sender),
        }
    }
}

/// Database row mapping for the matches table.
#[derive(Debug, Clone, FromRow)]
pub struct MatchEntity {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub request_id: Option<Uuid>,
    pub status: MatchStatusDb,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<MatchEntity> for Match {
    fn from(entity: MatchEntity) -> Self {
        Self {
            id: entity.id,
            user1_id: entity.user1_id,
            user2_id: entity.user2_id,
            request_id: entity.request_id,
            status: entity.status.into(),
            expires_at: entity.expires_at,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MatchMessageEntity {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<MatchMessageEntity> for MatchMessage {
    fn from(entity: MatchMessageEntity) -> Self {
        Self {
            id: entity.id,
            match_id: entity.match_id,
            sender_id: entity.sender_id,
            content: entity.content,
            created_at: entity.created_at,
        }
    }
}
