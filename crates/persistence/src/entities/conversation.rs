//! Conversation and message entities.

use chrono::{DateTime, Utc};
use domain::models::conversation::{Conversation, ConversationStatus, Message};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "conversation_status", rename_all = "lowercase")]
pub enum ConversationStatusDb {
    Pending,
    Accepted,
}

impl From<ConversationStatusDb> for ConversationStatus {
    fn from(db: ConversationStatusDb) -> Self {
        match db {
            ConversationStatusDb::Pending => ConversationStatus::Pending,
            ConversationStatusDb::Accepted => ConversationStatus::Accepted,
        }
    }
}

impl From<ConversationStatus> for ConversationStatusDb {
    fn from(status: ConversationStatus) -> Self {
        match status {
            ConversationStatus::Pending => ConversationStatusDb::Pending,
            ConversationStatus::Accepted => ConversationStatusDb::Accepted,
        }
    }
}

/// Database row mapping for the conversations table.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationEntity {
    pub id: Uuid,
    pub participant1_id: Uuid,
    pub participant2_id: Uuid,
    pub initiator_id: Uuid,
    pub status: ConversationStatusDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConversationEntity> for Conversation {
    fn from(entity: ConversationEntity) -> Self {
        Self {
            id: entity.id,
            participant1_id: entity.participant1_id,
            participant2_id: entity.participant2_id,
            initiator_id: entity.initiator_id,
            status: entity.status.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the messages table.
#[derive(Debug, Clone, FromRow)]
pub struct MessageEntity {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageEntity> for Message {
    fn from(entity: MessageEntity) -> Self {
        Self {
            id: entity.id,
            conversation_id: entity.conversation_id,
            sender_id: entity.sender_id,
            content: entity.content,
            created_at: entity.created_at,
        }
    }
}
