//! Notification entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::notification::{Notification, NotificationKind};
use domain::models::user::PublicProfile;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Notification joined with the sender's public columns.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: String,
    pub from_user_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub from_display_name: Option<String>,
    pub from_anonymous_username: Option<String>,
    pub from_avatar_url: Option<String>,
}

impl NotificationEntity {
    /// Rows with a kind this build does not know are skipped.
    pub fn into_domain(self) -> Option<Notification> {
        let kind = NotificationKind::from_str(&self.kind).ok()?;
        let from_user = self.from_user_id.map(|id| PublicProfile {
            id,
            display_name: self.from_display_name,
            anonymous_username: self.from_anonymous_username,
            avatar_url: self.from_avatar_url,
        });
        Some(Notification {
            id: self.id,
            recipient_id: self.recipient_id,
            kind,
            from_user_id: self.from_user_id,
            from_user,
            match_id: self.match_id,
            request_id: self.request_id,
            group_id: self.group_id,
            conversation_id: self.conversation_id,
            read: self.read,
            created_at: self.created_at,
        })
    }
}
