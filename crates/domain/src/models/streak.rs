//! Group activity streaks and daily updates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::user::PublicProfile;
use shared::validation::validate_not_blank;

pub const LEADERBOARD_SIZE: i64 = 20;
pub const DAILY_UPDATES_PAGE: i64 = 50;
pub const DEFAULT_CHECK_IN_CONTENT: &str = "Checked in! 🔥";

/// What a check-in did to the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInOutcome {
    Started,
    Continued,
    Reset,
    AlreadyCheckedIn,
}

impl CheckInOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInOutcome::Started => "started",
            CheckInOutcome::Continued => "continued",
            CheckInOutcome::Reset => "reset",
            CheckInOutcome::AlreadyCheckedIn => "already_checked_in",
        }
    }
}

/// Stored counters for one (group, user, activity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakCounter {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_update_date: Option<NaiveDate>,
}

impl StreakCounter {
    /// Applies a check-in on the UTC day `today`.
    pub fn check_in(&mut self, today: NaiveDate) -> CheckInOutcome {
        let yesterday = today.pred_opt();
        let outcome = match self.last_update_date {
            Some(last) if last == today => return CheckInOutcome::AlreadyCheckedIn,
            Some(last) if Some(last) == yesterday => {
                self.current_streak += 1;
                CheckInOutcome::Continued
            }
            Some(_) => {
                self.current_streak = 1;
                CheckInOutcome::Reset
            }
            None => {
                self.current_streak = 1;
                CheckInOutcome::Started
            }
        };
        self.last_update_date = Some(today);
        self.longest_streak = self.longest_streak.max(self.current_streak);
        outcome
    }

    /// Counter as it should be shown on `today`. A streak whose last
    /// check-in is older than yesterday has lapsed and reads as 0.
    pub fn effective_current(&self, today: NaiveDate) -> i32 {
        effective_current_streak(self.current_streak, self.last_update_date, today)
    }
}

pub fn effective_current_streak(
    current: i32,
    last_update_date: Option<NaiveDate>,
    today: NaiveDate,
) -> i32 {
    match last_update_date {
        Some(last) if last == today || Some(last) == today.pred_opt() => current,
        _ => 0,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Streak {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub activity_type: String,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_update_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Streak {
    /// Replaces the stored counter with what a reader on `today` should see.
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.current_streak =
            effective_current_streak(self.current_streak, self.last_update_date, today);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyUpdate {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub activity_type: String,
    pub content: String,
    pub update_date: NaiveDate,
    pub user: Option<PublicProfile>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInResponse {
    pub outcome: CheckInOutcome,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_update_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub user: Option<PublicProfile>,
    pub activity_type: String,
    pub current_streak: i32,
    pub longest_streak: i32,
}

/// Orders by effective current streak (then longest) and keeps the top rows.
pub fn rank_leaderboard(
    mut streaks: Vec<(Streak, Option<PublicProfile>)>,
    today: NaiveDate,
    size: usize,
) -> Vec<LeaderboardEntry> {
    for (streak, _) in streaks.iter_mut() {
        streak.current_streak =
            effective_current_streak(streak.current_streak, streak.last_update_date, today);
    }
    streaks.sort_by(|(a, _), (b, _)| {
        b.current_streak
            .cmp(&a.current_streak)
            .then(b.longest_streak.cmp(&a.longest_streak))
    });
    streaks
        .into_iter()
        .take(size)
        .enumerate()
        .map(|(i, (s, user))| LeaderboardEntry {
            rank: i + 1,
            user_id: s.user_id,
            user,
            activity_type: s.activity_type,
            current_streak: s.current_streak,
            longest_streak: s.longest_streak,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableStreak {
    pub activity_type: String,
    pub name: String,
    pub description: Option<String>,
    pub participant_count: i64,
    pub is_accepted: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStreakRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 60, message = "Name must be at most 60 characters")
    )]
    pub name: String,

    #[validate(length(max = 300, message = "Description must be at most 300 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CheckInRequest {
    #[validate(length(max = 1000, message = "Update must be at most 1000 characters"))]
    pub content: Option<String>,
}

impl CheckInRequest {
    pub fn content_or_default(&self) -> String {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CHECK_IN_CONTENT)
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityQuery {
    pub activity_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MyStreaksQuery {
    pub group_id: Option<Uuid>,
}
