//! Streak and daily update entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::streak::{DailyUpdate, Streak, StreakCounter};
use domain::models::user::PublicProfile;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the streaks table.
#[derive(Debug, Clone, FromRow)]
pub struct StreakEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub activity_type: String,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_update_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl StreakEntity {
    pub fn counter(&self) -> StreakCounter {
        StreakCounter {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_update_date: self.last_update_date,
        }
    }
}

impl From<StreakEntity> for Streak {
    fn from(entity: StreakEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            user_id: entity.user_id,
            activity_type: entity.activity_type,
            current_streak: entity.current_streak,
            longest_streak: entity.longest_streak,
            last_update_date: entity.last_update_date,
            group_name: None,
            activity_name: None,
            created_at: entity.created_at,
        }
    }
}

/// Streak with group and activity names, for cross-group listings.
#[derive(Debug, Clone, FromRow)]
pub struct NamedStreakEntity {
    #[sqlx(flatten)]
    pub streak: StreakEntity,
    pub group_name: String,
    pub activity_name: Option<String>,
}

impl From<NamedStreakEntity> for Streak {
    fn from(entity: NamedStreakEntity) -> Self {
        Self {
            group_name: Some(entity.group_name),
            activity_name: entity.activity_name,
            ..entity.streak.into()
        }
    }
}

/// Streak joined with its owner's public columns, for leaderboards.
#[derive(Debug, Clone, FromRow)]
pub struct StreakWithUserEntity {
    #[sqlx(flatten)]
    pub streak: StreakEntity,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
}

impl StreakWithUserEntity {
    pub fn into_parts(self) -> (Streak, Option<PublicProfile>) {
        let profile = PublicProfile {
            id: self.streak.user_id,
            display_name: self.display_name,
            anonymous_username: self.anonymous_username,
            avatar_url: self.avatar_url,
        };
        (self.streak.into(), Some(profile))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DailyUpdateEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub activity_type: String,
    pub content: String,
    pub update_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<DailyUpdateEntity> for DailyUpdate {
    fn from(entity: DailyUpdateEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            user_id: entity.user_id,
            activity_type: entity.activity_type,
            content: entity.content,
            update_date: entity.update_date,
            user: Some(PublicProfile {
                id: entity.user_id,
                display_name: entity.display_name,
                anonymous_username: entity.anonymous_username,
                avatar_url: entity.avatar_url,
            }),
            created_at: entity.created_at,
        }
    }
}
