//! Mood log and gratitude journal repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GratitudeEntryEntity, MoodEntryEntity};
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct WellnessRepository {
    pool: PgPool,
}

impl WellnessRepository {
    /// Creates a new WellnessRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Mood

    pub async fn log_mood(
        &self,
        user_id: Uuid,
        mood_value: i32,
        note: Option<&str>,
    ) -> Result<MoodEntryEntity, sqlx::Error> {
        let timer = QueryTimer::new("log_mood");
        let result = sqlx::query_as::<_, MoodEntryEntity>(
            r#"
            INSERT INTO mood_entries (user_id, mood_value, note)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, mood_value, note, created_at
            "#,
        )
        .bind(user_id)
        .bind(mood_value)
        .bind(note)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Entries since `since`, oldest first.
    pub async fn moods_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodEntryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_moods_since");
        let result = sqlx::query_as::<_, MoodEntryEntity>(
            r#"
            SELECT id, user_id, mood_value, note, created_at
            FROM mood_entries
            WHERE user_id = $1 AND created_at >= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Just the values since `since`, oldest first.
    pub async fn mood_values_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<i32>, sqlx::Error> {
        let timer = QueryTimer::new("list_mood_values_since");
        let result = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT mood_value
            FROM mood_entries
            WHERE user_id = $1 AND created_at >= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    // Gratitude

    pub async fn add_gratitude(
        &self,
        user_id: Uuid,
        content: &str,
    ) -> Result<GratitudeEntryEntity, sqlx::Error> {
        let timer = QueryTimer::new("add_gratitude");
        let result = sqlx::query_as::<_, GratitudeEntryEntity>(
            r#"
            INSERT INTO gratitude_entries (user_id, content)
            VALUES ($1, $2)
            RETURNING id, user_id, content, created_at
            "#,
        )
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Newest first. `None` returns every entry.
    pub async fn list_gratitude(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<GratitudeEntryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_gratitude");
        let result = sqlx::query_as::<_, GratitudeEntryEntity>(
            r#"
            SELECT id, user_id, content, created_at
            FROM gratitude_entries
            WHERE user_id = $1
            ORDER BY created_at DESC
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

    pub async fn random_gratitude(
        &self,
        user_id: Uuid,
    ) -> Result<Option<GratitudeEntryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("random_gratitude");
        let result = sqlx::query_as::<_, GratitudeEntryEntity>(
            r#"
            SELECT id, user_id, content, created_at
            FROM gratitude_entries
            WHERE user_id = $1
            ORDER BY random()
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn gratitude_count(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_gratitude");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM gratitude_entries WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_gratitude(
        &self,
        id: Uuid,
    ) -> Result<Option<GratitudeEntryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_gratitude");
        let result = sqlx::query_as::<_, GratitudeEntryEntity>(
            "SELECT id, user_id, content, created_at FROM gratitude_entries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete_gratitude(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_gratitude");
        let result = sqlx::query("DELETE FROM gratitude_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }
}
