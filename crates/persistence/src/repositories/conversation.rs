//! Conversation repository for direct messaging.

use shared::pagination::StreamCursor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ConversationEntity, ConversationStatusDb, MessageEntity};
use crate::metrics::QueryTimer;

/// Repository for conversations and their messages.
#[derive(Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    /// Creates a new ConversationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ConversationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_conversation_by_id");
        let result = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT id, participant1_id, participant2_id, initiator_id, status,
                   created_at, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find the conversation for an ordered participant pair.
    pub async fn find_by_pair(
        &self,
        participant1_id: Uuid,
        participant2_id: Uuid,
    ) -> Result<Option<ConversationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_conversation_by_pair");
        let result = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT id, participant1_id, participant2_id, initiator_id, status,
                   created_at, updated_at
            FROM conversations
            WHERE participant1_id = $1 AND participant2_id = $2
            "#,
        )
        .bind(participant1_id)
        .bind(participant2_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a conversation for an ordered pair, or return the existing one.
    /// The flag tells whether a row was created.
    pub async fn get_or_create(
        &self,
        participant1_id: Uuid,
        participant2_id: Uuid,
        initiator_id: Uuid,
        status: ConversationStatusDb,
    ) -> Result<(ConversationEntity, bool), sqlx::Error> {
        let timer = QueryTimer::new("get_or_create_conversation");
        let inserted = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (participant1_id, participant2_id, initiator_id, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (participant1_id, participant2_id) DO NOTHING
            RETURNING id, participant1_id, participant2_id, initiator_id, status,
                      created_at, updated_at
            "#,
        )
        .bind(participant1_id)
        .bind(participant2_id)
        .bind(initiator_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        let result = match inserted {
            Some(conv) => (conv, true),
            None => {
                let existing = self
                    .find_by_pair(participant1_id, participant2_id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                (existing, false)
            }
        };
        timer.record();
        Ok(result)
    }

    /// Accepted conversations of a user, most recently active first.
    pub async fn list_accepted(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_accepted_conversations");
        let result = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT id, participant1_id, participant2_id, initiator_id, status,
                   created_at, updated_at
            FROM conversations
            WHERE (participant1_id = $1 OR participant2_id = $1) AND status = 'accepted'
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Pending conversations the user has been asked to join.
    pub async fn list_pending_for_recipient(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_message_requests");
        let result = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT id, participant1_id, participant2_id, initiator_id, status,
                   created_at, updated_at
            FROM conversations
            WHERE (participant1_id = $1 OR participant2_id = $1)
              AND initiator_id <> $1
              AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn accept(&self, id: Uuid) -> Result<Option<ConversationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("accept_conversation");
        let result = sqlx::query_as::<_, ConversationEntity>(
            r#"
            UPDATE conversations
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING id, participant1_id, participant2_id, initiator_id, status,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Delete a conversation. Its messages go with it.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_conversation");
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Store a message and mark the conversation as recently active.
    pub async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<MessageEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_message");
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, MessageEntity>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, conversation_id, sender_id, content, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(message)
    }

    /// Messages in ascending order. With a cursor, only messages after it;
    /// without one, the most recent `limit` messages.
    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        after: Option<StreamCursor>,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_messages");
        let result = match after {
            Some(cursor) => {
                sqlx::query_as::<_, MessageEntity>(
                    r#"
                    SELECT id, conversation_id, sender_id, content, created_at
                    FROM messages
                    WHERE conversation_id = $1 AND (created_at, id) > ($2, $3)
                    ORDER BY created_at ASC, id ASC
                    LIMIT $4
                    "#,
                )
                .bind(conversation_id)
                .bind(cursor.created_at)
                .bind(cursor.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, MessageEntity>(
                    r#"
                    SELECT * FROM (
                        SELECT id, conversation_id, sender_id, content, created_at
                        FROM messages
                        WHERE conversation_id = $1
                        ORDER BY created_at DESC, id DESC
                        LIMIT $2
                    ) latest
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(conversation_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        };
        timer.record();
        result
    }

    /// Newest message of each conversation in the batch.
    pub async fn last_messages(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<MessageEntity>, sqlx::Error> {
        if conversation_ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = QueryTimer::new("last_messages");
        let result = sqlx::query_as::<_, MessageEntity>(
            r#"
            SELECT DISTINCT ON (conversation_id) id, conversation_id, sender_id, content, created_at
            FROM messages
            WHERE conversation_id = ANY($1)
            ORDER BY conversation_id, created_at DESC, id DESC
            "#,
        )
        .bind(conversation_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Oldest message of each conversation in the batch.
    pub async fn first_messages(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<MessageEntity>, sqlx::Error> {
        if conversation_ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = QueryTimer::new("first_messages");
        let result = sqlx::query_as::<_, MessageEntity>(
            r#"
            SELECT DISTINCT ON (conversation_id) id, conversation_id, sender_id, content, created_at
            FROM messages
            WHERE conversation_id = ANY($1)
            ORDER BY conversation_id, created_at ASC, id ASC
            "#,
        )
        .bind(conversation_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
