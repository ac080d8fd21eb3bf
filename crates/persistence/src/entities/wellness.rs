//! Mood and gratitude entities.

use chrono::{DateTime, Utc};
use domain::models::wellness::{GratitudeEntry, MoodEntry};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct MoodEntryEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood_value: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MoodEntryEntity> for MoodEntry {
    fn from(entity: MoodEntryEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            mood_value: entity.mood_value,
            note: entity.note,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct GratitudeEntryEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<GratitudeEntryEntity> for GratitudeEntry {
    fn from(entity: GratitudeEntryEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            content: entity.content,
            created_at: entity.created_at,
        }
    }
}
