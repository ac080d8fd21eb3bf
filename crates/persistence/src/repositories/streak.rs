//! Streak repository: group activities, per-user streaks and daily updates.

use chrono::NaiveDate;
use domain::models::streak::{CheckInOutcome, StreakCounter};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{
    AvailableStreakEntity, DailyUpdateEntity, GroupActivityEntity, NamedStreakEntity,
    StreakEntity, StreakWithUserEntity,
};
use crate::metrics::QueryTimer;

/// Repository for activities, streaks and daily updates.
#[derive(Clone)]
pub struct StreakRepository {
    pool: PgPool,
}

impl StreakRepository {
    /// Creates a new StreakRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_activity(
        &self,
        group_id: Uuid,
        activity_type: &str,
    ) -> Result<Option<GroupActivityEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_activity");
        let result = sqlx::query_as::<_, GroupActivityEntity>(
            r#"
            SELECT id, group_id, activity_type, name, description, created_at
            FROM group_activities
            WHERE group_id = $1 AND activity_type = $2
            "#,
        )
        .bind(group_id)
        .bind(activity_type)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Create an activity and enroll its creator. Returns `None` when the
    /// group already has an activity with that slug.
    pub async fn create_activity(
        &self,
        group_id: Uuid,
        activity_type: &str,
        name: &str,
        description: Option<&str>,
        created_by: Uuid,
    ) -> Result<Option<GroupActivityEntity>, sqlx::Error> {
        let timer = QueryTimer::new("create_group_activity");
        let mut tx = self.pool.begin().await?;

        let activity = sqlx::query_as::<_, GroupActivityEntity>(
            r#"
            INSERT INTO group_activities (group_id, activity_type, name, description, created_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (group_id, activity_type) DO NOTHING
            RETURNING id, group_id, activity_type, name, description, created_at
            "#,
        )
        .bind(group_id)
        .bind(activity_type)
        .bind(name)
        .bind(description)
        .bind(created_by)
        .fetch_optional(&mut *tx)
        .await?;

        if activity.is_some() {
            sqlx::query(
                r#"
                INSERT INTO streaks (group_id, user_id, activity_type)
                VALUES ($1, $2, $3)
                ON CONFLICT (group_id, user_id, activity_type) DO NOTHING
                "#,
            )
            .bind(group_id)
            .bind(created_by)
            .bind(activity_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(activity)
    }

    /// Enroll a user in an activity. Accepting twice returns the same row.
    pub async fn accept(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        activity_type: &str,
    ) -> Result<StreakEntity, sqlx::Error> {
        let timer = QueryTimer::new("accept_streak");
        let result = sqlx::query_as::<_, StreakEntity>(
            r#"
            INSERT INTO streaks (group_id, user_id, activity_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, user_id, activity_type)
            DO UPDATE SET activity_type = EXCLUDED.activity_type
            RETURNING id, group_id, user_id, activity_type, current_streak, longest_streak,
                      last_update_date, created_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(activity_type)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Activities of a group with their participant counts and whether
    /// the user has accepted each.
    pub async fn available(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<AvailableStreakEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_available_streaks");
        let result = sqlx::query_as::<_, AvailableStreakEntity>(
            r#"
            SELECT a.activity_type, a.name, a.description,
                   COUNT(s.id) AS participant_count,
                   COALESCE(BOOL_OR(s.user_id = $2), false) AS is_accepted
            FROM group_activities a
            LEFT JOIN streaks s
                   ON s.group_id = a.group_id AND s.activity_type = a.activity_type
            WHERE a.group_id = $1
            GROUP BY a.id, a.activity_type, a.name, a.description, a.created_at
            ORDER BY a.created_at ASC
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Check in for `today`. Returns `None` when the user has not accepted
    /// the activity.
    ///
    /// Today's daily update is written even when the counter does not move,
    /// so a second check-in replaces the day's text.
    pub async fn check_in(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        activity_type: &str,
        content: &str,
        today: NaiveDate,
    ) -> Result<Option<(CheckInOutcome, StreakCounter)>, sqlx::Error> {
        let timer = QueryTimer::new("streak_check_in");
        let mut tx = self.pool.begin().await?;

        let streak = sqlx::query_as::<_, StreakEntity>(
            r#"
            SELECT id, group_id, user_id, activity_type, current_streak, longest_streak,
                   last_update_date, created_at
            FROM streaks
            WHERE group_id = $1 AND user_id = $2 AND activity_type = $3
            FOR UPDATE
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(activity_type)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(streak) = streak else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        let mut counter = streak.counter();
        let outcome = counter.check_in(today);

        if outcome != CheckInOutcome::AlreadyCheckedIn {
            sqlx::query(
                r#"
                UPDATE streaks
                SET current_streak = $2, longest_streak = $3, last_update_date = $4,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(streak.id)
            .bind(counter.current_streak)
            .bind(counter.longest_streak)
            .bind(counter.last_update_date)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO daily_updates (group_id, user_id, activity_type, content, update_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (group_id, user_id, activity_type, update_date)
            DO UPDATE SET content = EXCLUDED.content
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(activity_type)
        .bind(content)
        .bind(today)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some((outcome, counter)))
    }

    /// The user's streaks, in one group or across all of them, with group
    /// and activity names.
    pub async fn for_user(
        &self,
        user_id: Uuid,
        group_id: Option<Uuid>,
    ) -> Result<Vec<NamedStreakEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_user_streaks");
        let result = sqlx::query_as::<_, NamedStreakEntity>(
            r#"
            SELECT s.id, s.group_id, s.user_id, s.activity_type, s.current_streak,
                   s.longest_streak, s.last_update_date, s.created_at,
                   g.name AS group_name, a.name AS activity_name
            FROM streaks s
            JOIN groups g ON g.id = s.group_id
            LEFT JOIN group_activities a
                   ON a.group_id = s.group_id AND a.activity_type = s.activity_type
            WHERE s.user_id = $1 AND ($2::uuid IS NULL OR s.group_id = $2)
            ORDER BY s.current_streak DESC, s.created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Leaderboard candidates. Ranking on effective counters is left to
    /// the caller since lapsed streaks still hold their stored value.
    pub async fn leaderboard_rows(
        &self,
        group_id: Uuid,
        activity_type: Option<&str>,
    ) -> Result<Vec<StreakWithUserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("streak_leaderboard");
        let result = sqlx::query_as::<_, StreakWithUserEntity>(
            r#"
            SELECT s.id, s.group_id, s.user_id, s.activity_type, s.current_streak,
                   s.longest_streak, s.last_update_date, s.created_at,
                   u.display_name, u.anonymous_username, u.avatar_url
            FROM streaks s
            JOIN users u ON u.id = s.user_id
            WHERE s.group_id = $1
              AND ($2::text IS NULL OR s.activity_type = $2)
            ORDER BY s.current_streak DESC, s.longest_streak DESC
            "#,
        )
        .bind(group_id)
        .bind(activity_type)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn daily_updates(
        &self,
        group_id: Uuid,
        activity_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DailyUpdateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_daily_updates");
        let result = sqlx::query_as::<_, DailyUpdateEntity>(
            r#"
            SELECT d.id, d.group_id, d.user_id, d.activity_type, d.content, d.update_date,
                   d.created_at, u.display_name, u.anonymous_username, u.avatar_url
            FROM daily_updates d
            JOIN users u ON u.id = d.user_id
            WHERE d.group_id = $1 AND ($2::text IS NULL OR d.activity_type = $2)
            ORDER BY d.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(group_id)
        .bind(activity_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
