//! Notification repository.

use domain::models::notification::NewNotification;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::NotificationEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Creates a new NotificationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, notification: &NewNotification) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("insert_notification");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO notifications (recipient_id, kind, from_user_id, match_id, request_id,
                                       group_id, conversation_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(notification.recipient_id)
        .bind(notification.kind.as_str())
        .bind(notification.from_user_id)
        .bind(notification.match_id)
        .bind(notification.request_id)
        .bind(notification.group_id)
        .bind(notification.conversation_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Newest first, with the sender's public columns.
    pub async fn list_for_recipient(
        &self,
        recipient_id: Uuid,
        limit: i64,
    ) -> Result<Vec<NotificationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_notifications");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT n.id, n.recipient_id, n.kind, n.from_user_id, n.match_id, n.request_id,
                   n.group_id, n.conversation_id, n.read, n.created_at,
                   u.display_name AS from_display_name,
                   u.anonymous_username AS from_anonymous_username,
                   u.avatar_url AS from_avatar_url
            FROM notifications n
            LEFT JOIN users u ON u.id = n.from_user_id
            WHERE n.recipient_id = $1
            ORDER BY n.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(recipient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_unread_notifications");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT read",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark one notification read. Only the recipient's own rows match.
    pub async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_notification_read");
        let result = sqlx::query(
            "UPDATE notifications SET read = true WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }
}
