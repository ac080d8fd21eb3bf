//! User repository for database operations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{
    LoginDayEntity, MatchCandidateEntity, MessagePreferenceDb, ProfileStatsEntity,
    PublicProfileEntity, UserEntity,
};
use crate::metrics::QueryTimer;

/// Fields accepted by a partial profile update. `None` leaves a column alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
    pub message_preference: Option<MessagePreferenceDb>,
    pub available_for_matches: Option<bool>,
    pub match_struggles: Option<Vec<String>>,
}

/// Input for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub display_name: Option<&'a str>,
    pub anonymous_username: Option<&'a str>,
    pub is_staff: bool,
    pub email_verified: bool,
}

/// Repository for user-related database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new UserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, password_hash, display_name, anonymous_username, avatar_url,
                   email_verified, is_premium, premium_activated_at, is_admin, is_staff,
                   message_preference, available_for_matches, match_struggles,
                   reports_received_count, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a user by email address (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, password_hash, display_name, anonymous_username, avatar_url,
                   email_verified, is_premium, premium_activated_at, is_admin, is_staff,
                   message_preference, available_for_matches, match_struggles,
                   reports_received_count, created_at, updated_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Create a new user account. A duplicate email fails with a unique violation.
    pub async fn create_user(&self, user: NewUser<'_>) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users
                (email, password_hash, display_name, anonymous_username, is_staff, email_verified)
            VALUES (LOWER($1), $2, $3, $4, $5, $6)
            RETURNING id, email, password_hash, display_name, anonymous_username, avatar_url,
                      email_verified, is_premium, premium_activated_at, is_admin, is_staff,
                      message_preference, available_for_matches, match_struggles,
                      reports_received_count, created_at, updated_at
            "#,
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.display_name)
        .bind(user.anonymous_username)
        .bind(user.is_staff)
        .bind(user.email_verified)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Apply a partial profile update.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_user_profile");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                anonymous_username = COALESCE($3, anonymous_username),
                avatar_url = COALESCE($4, avatar_url),
                message_preference = COALESCE($5, message_preference),
                available_for_matches = COALESCE($6, available_for_matches),
                match_struggles = COALESCE($7, match_struggles),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, password_hash, display_name, anonymous_username, avatar_url,
                      email_verified, is_premium, premium_activated_at, is_admin, is_staff,
                      message_preference, available_for_matches, match_struggles,
                      reports_received_count, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(changes.display_name)
        .bind(changes.anonymous_username)
        .bind(changes.avatar_url)
        .bind(changes.message_preference)
        .bind(changes.available_for_matches)
        .bind(changes.match_struggles)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Turn premium on or off. Activation keeps the first activation time.
    pub async fn set_premium(
        &self,
        user_id: Uuid,
        active: bool,
    ) -> Result<Option<(bool, Option<DateTime<Utc>>)>, sqlx::Error> {
        let timer = QueryTimer::new("set_user_premium");
        let result = sqlx::query_as::<_, (bool, Option<DateTime<Utc>>)>(
            r#"
            UPDATE users
            SET is_premium = $2,
                premium_activated_at = CASE
                    WHEN $2 THEN COALESCE(premium_activated_at, NOW())
                    ELSE NULL
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING is_premium, premium_activated_at
            "#,
        )
        .bind(user_id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Public columns for a batch of users.
    pub async fn find_public_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<PublicProfileEntity>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = QueryTimer::new("find_public_profiles");
        let result = sqlx::query_as::<_, PublicProfileEntity>(
            r#"
            SELECT id, display_name, anonymous_username, avatar_url
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Follower, following and post counters for `user_id`, as seen by `viewer_id`.
    pub async fn profile_stats(
        &self,
        user_id: Uuid,
        viewer_id: Uuid,
    ) -> Result<ProfileStatsEntity, sqlx::Error> {
        let timer = QueryTimer::new("user_profile_stats");
        let result = sqlx::query_as::<_, ProfileStatsEntity>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = $1) AS followers_count,
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following_count,
                (SELECT COUNT(*) FROM posts WHERE user_id = $1) AS posts_count,
                EXISTS (
                    SELECT 1 FROM follows WHERE follower_id = $2 AND following_id = $1
                ) AS is_following
            "#,
        )
        .bind(user_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Follow a user. Following twice is a no-op.
    pub async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("follow_user");
        sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    /// Unfollow a user. Returns whether a follow existed.
    pub async fn unfollow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("unfollow_user");
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Ids the user follows.
    pub async fn following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("following_ids");
        let result = sqlx::query_scalar::<_, Uuid>(
            "SELECT following_id FROM follows WHERE follower_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Users following `user_id`, newest follow first.
    pub async fn followers(&self, user_id: Uuid) -> Result<Vec<PublicProfileEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_followers");
        let result = sqlx::query_as::<_, PublicProfileEntity>(
            r#"
            SELECT u.id, u.display_name, u.anonymous_username, u.avatar_url
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Users `user_id` follows, newest follow first.
    pub async fn following(&self, user_id: Uuid) -> Result<Vec<PublicProfileEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_following");
        let result = sqlx::query_as::<_, PublicProfileEntity>(
            r#"
            SELECT u.id, u.display_name, u.anonymous_username, u.avatar_url
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Users who opted in to matching, excluding `user_id` and anyone they
    /// already have a pending or accepted request to.
    pub async fn match_candidates(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<MatchCandidateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("match_candidates");
        let result = sqlx::query_as::<_, MatchCandidateEntity>(
            r#"
            SELECT u.id, u.display_name, u.anonymous_username, u.avatar_url, u.match_struggles
            FROM users u
            WHERE u.available_for_matches
              AND u.id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM match_requests r
                  WHERE r.sender_id = $1
                    AND r.receiver_id = u.id
                    AND r.status IN ('pending', 'accepted')
              )
            ORDER BY u.updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Record a successful login.
    pub async fn record_login(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("record_login");
        sqlx::query("INSERT INTO login_events (user_id) VALUES ($1)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(())
    }

    /// Login counts per UTC day since `since` (inclusive).
    pub async fn login_counts_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<LoginDayEntity>, sqlx::Error> {
        let timer = QueryTimer::new("login_counts_since");
        let result = sqlx::query_as::<_, LoginDayEntity>(
            r#"
            SELECT (logged_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS count
            FROM login_events
            WHERE logged_at >= ($1::date)::timestamp AT TIME ZONE 'UTC'
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
