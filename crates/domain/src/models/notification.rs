//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::user::PublicProfile;

pub const NOTIFICATION_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MatchAccepted,
    MessageRequest,
    GroupInvite,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::MatchAccepted => "match_accepted",
            NotificationKind::MessageRequest => "message_request",
            NotificationKind::GroupInvite => "group_invite",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match_accepted" => Ok(NotificationKind::MatchAccepted),
            "message_request" => Ok(NotificationKind::MessageRequest),
            "group_invite" => Ok(NotificationKind::GroupInvite),
            _ => Err(format!("Unknown notification kind: {}", s)),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields for a notification about to be stored.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub from_user_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
}

impl NewNotification {
    pub fn new(recipient_id: Uuid, kind: NotificationKind) -> Self {
        Self {
            recipient_id,
            kind,
            from_user_id: None,
            match_id: None,
            request_id: None,
            group_id: None,
            conversation_id: None,
        }
    }

    pub fn from_user(mut self, user_id: Uuid) -> Self {
        self.from_user_id = Some(user_id);
        self
    }

    pub fn for_match(mut self, match_id: Uuid, request_id: Uuid) -> Self {
        self.match_id = Some(match_id);
        self.request_id = Some(request_id);
        self
    }

    pub fn for_group(mut self, group_id: Uuid) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn for_conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub from_user_id: Option<Uuid>,
    pub from_user: Option<PublicProfile>,
    pub match_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        for kind in [
            NotificationKind::MatchAccepted,
            NotificationKind::MessageRequest,
            NotificationKind::GroupInvite,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
        assert!("game_invite".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn test_builder_sets_links() {
        let recipient = Uuid::new_v4();
        let sender = Uuid::new_v4();
        let m = Uuid::new_v4();
        let r = Uuid::new_v4();
        let n = NewNotification::new(recipient, NotificationKind::MatchAccepted)
            .from_user(sender)
            .for_match(m, r);
        assert_eq!(n.from_user_id, Some(sender));
        assert_eq!(n.match_id, Some(m));
        assert_eq!(n.request_id, Some(r));
        assert_eq!(n.group_id, None);
    }
}
