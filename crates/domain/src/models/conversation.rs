//! One-to-one conversations and message requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::user::{MessagePreference, PublicProfile};
use shared::validation::validate_not_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Pending,
    Accepted,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Pending => "pending",
            ConversationStatus::Accepted => "accepted",
        }
    }
}

/// Participants are stored lowest id first so a pair maps to one row.
pub fn ordered_participants(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("You cannot message yourself")]
    SelfConversation,
    #[error("This user is not accepting messages")]
    NotAccepting,
}

/// Status for a conversation opened by someone towards `recipient_pref`.
pub fn opening_status(
    initiator: Uuid,
    recipient: Uuid,
    recipient_pref: MessagePreference,
) -> Result<ConversationStatus, ConversationError> {
    if initiator == recipient {
        return Err(ConversationError::SelfConversation);
    }
    match recipient_pref {
        MessagePreference::None => Err(ConversationError::NotAccepting),
        MessagePreference::Direct => Ok(ConversationStatus::Accepted),
        MessagePreference::Requests => Ok(ConversationStatus::Pending),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub participant1_id: Uuid,
    pub participant2_id: Uuid,
    pub initiator_id: Uuid,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participant1_id == user_id || self.participant2_id == user_id
    }

    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.participant1_id == user_id {
            self.participant2_id
        } else {
            self.participant1_id
        }
    }

    /// Only the side that did not start a pending conversation may answer it.
    pub fn can_respond(&self, user_id: Uuid) -> bool {
        self.status == ConversationStatus::Pending
            && self.has_participant(user_id)
            && self.initiator_id != user_id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 2000, message = "Message must be at most 2000 characters")
    )]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartConversationRequest {
    pub user_id: Uuid,
}

/// Polling query for message streams.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesQuery {
    /// Cursor of the last message already seen.
    pub after: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagePage<T> {
    pub data: Vec<T>,
    /// Pass back as `after` to receive only newer messages.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user: Option<PublicProfile>,
    pub last_message: Option<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageRequestSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub from_user: Option<PublicProfile>,
    pub first_message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_participants_is_symmetric() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ordered_participants(a, b), ordered_participants(b, a));
        let (lo, hi) = ordered_participants(a, b);
        assert!(lo < hi);
    }

    #[test]
    fn test_opening_status_follows_preference() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(
            opening_status(a, b, MessagePreference::Direct),
            Ok(ConversationStatus::Accepted)
        );
        assert_eq!(
            opening_status(a, b, MessagePreference::Requests),
            Ok(ConversationStatus::Pending)
        );
        assert_eq!(
            opening_status(a, b, MessagePreference::None),
            Err(ConversationError::NotAccepting)
        );
        assert_eq!(
            opening_status(a, a, MessagePreference::Direct),
            Err(ConversationError::SelfConversation)
        );
    }

    #[test]
    fn test_only_recipient_can_respond() {
        let (p1, p2) = ordered_participants(Uuid::new_v4(), Uuid::new_v4());
        let conv = Conversation {
            id: Uuid::new_v4(),
            participant1_id: p1,
            participant2_id: p2,
            initiator_id: p2,
            status: ConversationStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(conv.can_respond(p1));
        assert!(!conv.can_respond(p2));
        assert!(!conv.can_respond(Uuid::new_v4()));
        assert_eq!(conv.other_participant(p1), p2);

        let accepted = Conversation {
            status: ConversationStatus::Accepted,
            ..conv
        };
        assert!(!accepted.can_respond(p1));
    }
}
