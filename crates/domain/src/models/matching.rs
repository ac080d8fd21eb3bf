//! Anonymous one-to-one matching with a timed chat.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::user::PublicProfile;
use shared::validation::validate_not_blank;

pub const MATCH_DURATION_MINUTES: i64 = 30;
pub const EXTENSION_MINUTES: i64 = 15;
pub const AVAILABLE_USERS_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchRequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl MatchRequestStatus {
    /// Pending and accepted requests block a repeat request.
    pub fn blocks_new_request(&self) -> bool {
        matches!(self, MatchRequestStatus::Pending | MatchRequestStatus::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Ended,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: MatchRequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingMatchRequest {
    #[serde(flatten)]
    pub request: MatchRequest,
    pub sender: Option<MatchCandidate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub request_id: Option<Uuid>,
    pub status: MatchStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Active only while the status says so and the clock has not run out.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == MatchStatus::Active && self.expires_at > now
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    pub fn partner_of(&self, user_id: Uuid) -> Uuid {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }

    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

pub fn initial_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(MATCH_DURATION_MINUTES)
}

pub fn extended_expiry(current: DateTime<Utc>) -> DateTime<Utc> {
    current + Duration::minutes(EXTENSION_MINUTES)
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveMatch {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub partner: Option<PublicProfile>,
    pub expires_at: DateTime<Utc>,
    pub seconds_remaining: i64,
}

impl ActiveMatch {
    pub fn for_user(
        m: &Match,
        user_id: Uuid,
        partner: Option<PublicProfile>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: m.id,
            partner_id: m.partner_of(user_id),
            partner,
            expires_at: m.expires_at,
            seconds_remaining: m.seconds_remaining(now),
        }
    }
}

/// A user who opted in to matching.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub match_struggles: Vec<String>,
}

/// Drops candidates that do not list `struggle`. `None` and `"All"` keep everyone.
pub fn filter_by_struggle(
    candidates: Vec<MatchCandidate>,
    struggle: Option<&str>,
) -> Vec<MatchCandidate> {
    match struggle {
        None | Some("All") | Some("") => candidates,
        Some(wanted) => candidates
            .into_iter()
            .filter(|c| c.match_struggles.iter().any(|s| s == wanted))
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchMessage {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMatchRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailableUsersQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMatchMessageRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 2000, message = "Message must be at most 2000 characters")
    )]
    pub content: String,
}
