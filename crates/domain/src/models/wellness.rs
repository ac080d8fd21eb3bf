//! Mood tracking, gratitude journal and the weekly summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::validation::validate_not_blank;

pub const DEFAULT_MOOD_DAYS: i64 = 30;
pub const DEFAULT_AVERAGE_DAYS: i64 = 7;
pub const SUMMARY_DAYS: i64 = 7;

/// Averages must differ by more than this to count as a trend.
pub const TREND_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Serialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood_value: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GratitudeEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodTrend {
    Improving,
    Stable,
    Declining,
}

pub fn average_mood(values: &[i32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().map(|v| *v as i64).sum();
    Some(sum as f64 / values.len() as f64)
}

/// Compares the second half of chronologically ordered values with the
/// first half. The first half takes the extra value when the count is odd.
pub fn mood_trend(values: &[i32]) -> MoodTrend {
    if values.len() < 2 {
        return MoodTrend::Stable;
    }
    let split = values.len().div_ceil(2);
    let (first, second) = values.split_at(split);
    let (Some(first_avg), Some(second_avg)) = (average_mood(first), average_mood(second)) else {
        return MoodTrend::Stable;
    };

    if second_avg > first_avg + TREND_THRESHOLD {
        MoodTrend::Improving
    } else if second_avg < first_avg - TREND_THRESHOLD {
        MoodTrend::Declining
    } else {
        MoodTrend::Stable
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub post_count: i64,
    pub mood_count: usize,
    pub average_mood: Option<f64>,
    pub mood_trend: MoodTrend,
}

impl WeeklySummary {
    /// `moods` must be oldest first.
    pub fn build(post_count: i64, moods: &[i32]) -> Self {
        Self {
            post_count,
            mood_count: moods.len(),
            average_mood: average_mood(moods).map(|a| (a * 10.0).round() / 10.0),
            mood_trend: mood_trend(moods),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AverageMoodResponse {
    pub days: i64,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogMoodRequest {
    #[validate(range(min = 1, max = 5, message = "Mood value must be between 1 and 5"))]
    pub mood_value: i32,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddGratitudeRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 1000, message = "Gratitude must be at most 1000 characters")
    )]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DaysQuery {
    #[validate(range(min = 1, max = 365, message = "Days must be between 1 and 365"))]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GratitudeListQuery {
    #[validate(range(min = 1, max = 500, message = "Limit must be between 1 and 500"))]
    pub limit: Option<i64>,
}
