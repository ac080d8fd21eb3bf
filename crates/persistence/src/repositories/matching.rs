//! Matching repository: requests, timed matches and match chat.

use chrono::{DateTime, Utc};
use domain::models::matching::{extended_expiry, initial_expiry};
use domain::models::notification::NotificationKind;
use shared::pagination::StreamCursor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{
    MatchEntity, MatchMessageEntity, MatchRequestEntity, MatchStatusDb, PendingMatchRequestEntity,
};
use crate::metrics::QueryTimer;

/// Repository for match requests, matches and their messages.
#[derive(Clone)]
pub struct MatchRepository {
    pool: PgPool,
}

impl MatchRepository {
    /// Creates a new MatchRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Send a request. Returns `None` when an open request from the sender
    /// to the receiver already exists.
    pub async fn create_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<MatchRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("create_match_request");
        let result = sqlx::query_as::<_, MatchRequestEntity>(
            r#"
            INSERT INTO match_requests (sender_id, receiver_id)
            VALUES ($1, $2)
            ON CONFLICT (sender_id, receiver_id) WHERE status IN ('pending', 'accepted')
            DO NOTHING
            RETURNING id, sender_id, receiver_id, status, created_at
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_request(&self, id: Uuid) -> Result<Option<MatchRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_match_request");
        let result = sqlx::query_as::<_, MatchRequestEntity>(
            r#"
            SELECT id, sender_id, receiver_id, status, created_at
            FROM match_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Pending requests addressed to the user, newest first.
    pub async fn pending_for_receiver(
        &self,
        receiver_id: Uuid,
    ) -> Result<Vec<PendingMatchRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_pending_match_requests");
        let result = sqlx::query_as::<_, PendingMatchRequestEntity>(
            r#"
            SELECT r.id, r.sender_id, r.receiver_id, r.status, r.created_at,
                   u.display_name, u.anonymous_username, u.avatar_url, u.match_struggles
            FROM match_requests r
            JOIN users u ON u.id = r.sender_id
            WHERE r.receiver_id = $1 AND r.status = 'pending'
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(receiver_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Accept a pending request: mark it accepted, open a match that runs
    /// from `now`, and notify the sender. Returns `None` when the request is
    /// no longer pending.
    pub async fn accept_request(
        &self,
        request_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<MatchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("accept_match_request");
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, MatchRequestEntity>(
            r#"
            SELECT id, sender_id, receiver_id, status, created_at
            FROM match_requests
            WHERE id = $1 AND status = 'pending'
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = request else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        sqlx::query(
            "UPDATE match_requests SET status = 'accepted', updated_at = NOW() WHERE id = $1",
        )
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, MatchEntity>(
            r#"
            INSERT INTO matches (user1_id, user2_id, request_id, status, expires_at)
            VALUES ($1, $2, $3, 'active', $4)
            RETURNING id, user1_id, user2_id, request_id, status, expires_at, created_at
            "#,
        )
        .bind(request.sender_id)
        .bind(request.receiver_id)
        .bind(request.id)
        .bind(initial_expiry(now))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, kind, from_user_id, match_id, request_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(request.sender_id)
        .bind(NotificationKind::MatchAccepted.as_str())
        .bind(request.receiver_id)
        .bind(created.id)
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(created))
    }

    /// Decline a pending request. Returns whether anything changed.
    pub async fn decline_request(&self, request_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("decline_match_request");
        let result = sqlx::query(
            r#"
            UPDATE match_requests
            SET status = 'declined', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(request_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_match(&self, id: Uuid) -> Result<Option<MatchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_match");
        let result = sqlx::query_as::<_, MatchEntity>(
            r#"
            SELECT id, user1_id, user2_id, request_id, status, expires_at, created_at
            FROM matches
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// The user's most recent match that is active at `now`.
    pub async fn active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<MatchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_match");
        let result = sqlx::query_as::<_, MatchEntity>(
            r#"
            SELECT id, user1_id, user2_id, request_id, status, expires_at, created_at
            FROM matches
            WHERE (user1_id = $1 OR user2_id = $1)
              AND status = 'active'
              AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Push the expiry of an active match forward. Returns `None` when the
    /// match is gone, ended or already expired at `now`.
    pub async fn extend(
        &self,
        match_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<MatchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("extend_match");
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, MatchEntity>(
            r#"
            SELECT id, user1_id, user2_id, request_id, status, expires_at, created_at
            FROM matches
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) =
            current.filter(|m| m.status == MatchStatusDb::Active && m.expires_at > now)
        else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, MatchEntity>(
            r#"
            UPDATE matches SET expires_at = $2
            WHERE id = $1
            RETURNING id, user1_id, user2_id, request_id, status, expires_at, created_at
            "#,
        )
        .bind(current.id)
        .bind(extended_expiry(current.expires_at))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(updated))
    }

    pub async fn end(&self, match_id: Uuid) -> Result<Option<MatchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("end_match");
        let result = sqlx::query_as::<_, MatchEntity>(
            r#"
            UPDATE matches SET status = 'ended'
            WHERE id = $1
            RETURNING id, user1_id, user2_id, request_id, status, expires_at, created_at
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn insert_message(
        &self,
        match_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<MatchMessageEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_match_message");
        let result = sqlx::query_as::<_, MatchMessageEntity>(
            r#"
            INSERT INTO match_messages (match_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, match_id, sender_id, content, created_at
            "#,
        )
        .bind(match_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Match chat in ascending order, optionally after a cursor.
    pub async fn list_messages(
        &self,
        match_id: Uuid,
        after: Option<StreamCursor>,
        limit: i64,
    ) -> Result<Vec<MatchMessageEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_match_messages");
        let (after_ts, after_id) = match after {
            Some(cursor) => (Some(cursor.created_at), Some(cursor.id)),
            None => (None, None),
        };
        let result = sqlx::query_as::<_, MatchMessageEntity>(
            r#"
            SELECT id, match_id, sender_id, content, created_at
            FROM match_messages
            WHERE match_id = $1
              AND ($2::timestamptz IS NULL OR (created_at, id) > ($2, $3))
            ORDER BY created_at ASC, id ASC
            LIMIT $4
            "#,
        )
        .bind(match_id)
        .bind(after_ts)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
