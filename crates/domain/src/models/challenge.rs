//! Photo-proof challenges: groups where members post one proof a day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::user::PublicProfile;
use shared::validation::validate_not_blank;

pub const MAX_CHALLENGE_DAYS: i32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeCategory {
    Fitness,
    Chaos,
    Mindfulness,
    Habits,
    Creative,
    Social,
    Noscreen,
    Food,
    #[default]
    Other,
}

impl ChallengeCategory {
    pub const ALL: [ChallengeCategory; 9] = [
        ChallengeCategory::Fitness,
        ChallengeCategory::Chaos,
        ChallengeCategory::Mindfulness,
        ChallengeCategory::Habits,
        ChallengeCategory::Creative,
        ChallengeCategory::Social,
        ChallengeCategory::Noscreen,
        ChallengeCategory::Food,
        ChallengeCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeCategory::Fitness => "fitness",
            ChallengeCategory::Chaos => "chaos",
            ChallengeCategory::Mindfulness => "mindfulness",
            ChallengeCategory::Habits => "habits",
            ChallengeCategory::Creative => "creative",
            ChallengeCategory::Social => "social",
            ChallengeCategory::Noscreen => "noscreen",
            ChallengeCategory::Food => "food",
            ChallengeCategory::Other => "other",
        }
    }

    /// Unknown or missing categories fall back to `Other`.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(ChallengeCategory::Other)
    }
}

impl FromStr for ChallengeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ChallengeCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Invalid challenge category: {}", s))
    }
}

impl fmt::Display for ChallengeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Challenge fields carried by a challenge group.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChallengeInfo {
    pub challenge_goal: String,
    pub challenge_duration_days: i32,
    pub managed_by_admin: bool,
    pub challenge_category: ChallengeCategory,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChallengeRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,

    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 500, message = "Goal must be at most 500 characters")
    )]
    pub goal: String,

    /// Fractional days are rounded to the nearest whole day.
    pub duration_days: f64,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub managed_by_admin: bool,

    pub challenge_category: Option<String>,

    #[validate(url(message = "Cover image must be a valid URL"))]
    pub cover_image_url: Option<String>,
}

impl CreateChallengeRequest {
    /// Rounded duration, or `None` when outside `1..=365`.
    pub fn duration(&self) -> Option<i32> {
        if !self.duration_days.is_finite() {
            return None;
        }
        let days = self.duration_days.round();
        if (1.0..=MAX_CHALLENGE_DAYS as f64).contains(&days) {
            Some(days as i32)
        } else {
            None
        }
    }
}

/// A member's proof bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofState {
    pub current_streak: i32,
    pub last_proof_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProofOutcome {
    pub current_streak: i32,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("Proof already submitted today")]
    AlreadySubmittedToday,
}

/// Records a proof on `today`. The streak grows when the previous proof was
/// yesterday and restarts at 1 otherwise.
pub fn record_proof(
    state: ProofState,
    today: NaiveDate,
    duration_days: i32,
) -> Result<(ProofState, ProofOutcome), ProofError> {
    if state.last_proof_date == Some(today) {
        return Err(ProofError::AlreadySubmittedToday);
    }

    let streak = match (state.last_proof_date, today.pred_opt()) {
        (Some(last), Some(yesterday)) if last == yesterday => state.current_streak + 1,
        _ => 1,
    };

    Ok((
        ProofState {
            current_streak: streak,
            last_proof_date: Some(today),
        },
        ProofOutcome {
            current_streak: streak,
            completed: streak >= duration_days,
        },
    ))
}

/// Leaving is free once the challenge is completed, otherwise it needs an
/// explicit forfeit.
pub fn can_leave_challenge(completed_at: Option<DateTime<Utc>>, forfeit: bool) -> bool {
    completed_at.is_some() || forfeit
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitProofRequest {
    #[validate(custom(function = "validate_not_blank"), url(message = "Image must be a valid URL"))]
    pub image_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveChallengeQuery {
    #[serde(default)]
    pub forfeit: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfficialChallengesQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeMemberProgress {
    pub user_id: Uuid,
    pub user: Option<PublicProfile>,
    pub current_streak: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub has_proof_today: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyChallengeProgress {
    pub current_streak: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_proof_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeProgress {
    pub group: super::group::Group,
    pub members: Vec<ChallengeMemberProgress>,
    pub my_member: Option<MyChallengeProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProofTodayResponse {
    pub has_proof_today: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fresh() -> ProofState {
        ProofState {
            current_streak: 0,
            last_proof_date: None,
        }
    }

    #[test]
    fn test_first_proof_starts_streak() {
        let (state, outcome) = record_proof(fresh(), day(2025, 1, 10), 7).unwrap();
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.last_proof_date, Some(day(2025, 1, 10)));
        assert!(!outcome.completed);
    }

    #[test]
    fn test_consecutive_days_grow_streak_across_month_end() {
        let state = ProofState {
            current_streak: 4,
            last_proof_date: Some(day(2025, 1, 31)),
        };
        let (state, outcome) = record_proof(state, day(2025, 2, 1), 7).unwrap();
        assert_eq!(state.current_streak, 5);
        assert_eq!(outcome.current_streak, 5);
    }

    #[test]
    fn test_gap_resets_streak() {
        let state = ProofState {
            current_streak: 4,
            last_proof_date: Some(day(2025, 1, 8)),
        };
        let (state, _) = record_proof(state, day(2025, 1, 10), 7).unwrap();
        assert_eq!(state.current_streak, 1);
    }

    #[test]
    fn test_second_proof_same_day_rejected() {
        let today = day(2025, 1, 10);
        let (state, _) = record_proof(fresh(), today, 7).unwrap();
        assert_eq!(
            record_proof(state, today, 7),
            Err(ProofError::AlreadySubmittedToday)
        );
    }

    #[test]
    fn test_completion_at_duration() {
        let state = ProofState {
            current_streak: 2,
            last_proof_date: Some(day(2025, 3, 1)),
        };
        let (_, outcome) = record_proof(state, day(2025, 3, 2), 3).unwrap();
        assert!(outcome.completed);

        let (_, one_day) = record_proof(fresh(), day(2025, 3, 2), 1).unwrap();
        assert!(one_day.completed);
    }

    #[test]
    fn test_can_leave() {
        assert!(can_leave_challenge(Some(Utc::now()), false));
        assert!(can_leave_challenge(None, true));
        assert!(!can_leave_challenge(None, false));
    }

    #[test]
    fn test_category_lenient_parse() {
        assert_eq!(
            ChallengeCategory::parse_lenient(Some("Fitness")),
            ChallengeCategory::Fitness
        );
        assert_eq!(
            ChallengeCategory::parse_lenient(Some("knitting")),
            ChallengeCategory::Other
        );
        assert_eq!(ChallengeCategory::parse_lenient(None), ChallengeCategory::Other);
    }

    fn request(duration_days: f64) -> CreateChallengeRequest {
        CreateChallengeRequest {
            name: "No sugar".into(),
            goal: "Skip sugar every day".into(),
            duration_days,
            description: None,
            managed_by_admin: false,
            challenge_category: None,
            cover_image_url: None,
        }
    }

    #[test]
    fn test_duration_rounding_and_bounds() {
        assert_eq!(request(7.0).duration(), Some(7));
        assert_eq!(request(6.6).duration(), Some(7));
        assert_eq!(request(0.6).duration(), Some(1));
        assert_eq!(request(0.4).duration(), None);
        assert_eq!(request(365.0).duration(), Some(365));
        assert_eq!(request(366.0).duration(), None);
        assert_eq!(request(f64::NAN).duration(), None);
    }
}
