//! User accounts and profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use shared::validation::{validate_anonymous_username, validate_struggle_tags};

/// Who may open a direct conversation with a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessagePreference {
    /// Anyone may message; conversations start accepted.
    Direct,
    /// New conversations arrive as message requests.
    #[default]
    Requests,
    /// Nobody may start a conversation.
    None,
}

impl MessagePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagePreference::Direct => "direct",
            MessagePreference::Requests => "requests",
            MessagePreference::None => "none",
        }
    }
}

impl FromStr for MessagePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(MessagePreference::Direct),
            "requests" => Ok(MessagePreference::Requests),
            "none" => Ok(MessagePreference::None),
            _ => Err(format!("Invalid message preference: {}", s)),
        }
    }
}

impl fmt::Display for MessagePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Full profile as seen by its owner.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
    pub is_premium: bool,
    pub premium_activated_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_staff: bool,
    pub message_preference: MessagePreference,
    pub available_for_matches: bool,
    pub match_struggles: Vec<String>,
    pub reports_received_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn public(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            display_name: self.display_name.clone(),
            anonymous_username: self.anonymous_username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// What other users get to see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicProfile {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub anonymous_username: Option<String>,
    pub avatar_url: Option<String>,
}

impl PublicProfile {
    /// Name to show in lists: display name, then handle, then "Anonymous".
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.anonymous_username.as_deref())
            .unwrap_or("Anonymous")
    }
}

/// Public profile plus social counters, for profile pages.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub is_following: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct UserRole {
    pub is_admin: bool,
    pub is_staff: bool,
}

impl UserRole {
    /// Admins and staff may review moderation queues.
    pub fn can_moderate(&self) -> bool {
        self.is_admin || self.is_staff
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PremiumStatus {
    pub is_premium: bool,
    pub premium_activated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Display name must be between 1 and 50 characters"
    ))]
    pub display_name: Option<String>,

    #[validate(custom(function = "validate_anonymous_username"))]
    pub anonymous_username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: Profile,
    pub tokens: TokenPair,
}

/// Partial profile update. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Display name must be between 1 and 50 characters"
    ))]
    pub display_name: Option<String>,

    #[validate(custom(function = "validate_anonymous_username"))]
    pub anonymous_username: Option<String>,

    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar_url: Option<String>,

    pub message_preference: Option<MessagePreference>,

    pub available_for_matches: Option<bool>,

    #[validate(custom(function = "validate_struggle_tags"))]
    pub match_struggles: Option<Vec<String>>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.anonymous_username.is_none()
            && self.avatar_url.is_none()
            && self.message_preference.is_none()
            && self.available_for_matches.is_none()
            && self.match_struggles.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public(display: Option<&str>, handle: Option<&str>) -> PublicProfile {
        PublicProfile {
            id: Uuid::new_v4(),
            display_name: display.map(String::from),
            anonymous_username: handle.map(String::from),
            avatar_url: None,
        }
    }

    #[test]
    fn test_label_fallbacks() {
        assert_eq!(public(Some("Mia"), Some("zippy-cat-1")).label(), "Mia");
        assert_eq!(public(Some("  "), Some("zippy-cat-1")).label(), "zippy-cat-1");
        assert_eq!(public(None, Some("zippy-cat-1")).label(), "zippy-cat-1");
        assert_eq!(public(None, None).label(), "Anonymous");
    }

    #[test]
    fn test_message_preference_parse() {
        assert_eq!(
            "DIRECT".parse::<MessagePreference>().unwrap(),
            MessagePreference::Direct
        );
        assert_eq!(
            "none".parse::<MessagePreference>().unwrap(),
            MessagePreference::None
        );
        assert!("everyone".parse::<MessagePreference>().is_err());
        assert_eq!(MessagePreference::default(), MessagePreference::Requests);
    }

    #[test]
    fn test_message_preference_serde() {
        let json = serde_json::to_string(&MessagePreference::Direct).unwrap();
        assert_eq!(json, "\"direct\"");
    }

    #[test]
    fn test_user_role_moderation() {
        assert!(UserRole { is_admin: true, is_staff: false }.can_moderate());
        assert!(UserRole { is_admin: false, is_staff: true }.can_moderate());
        assert!(!UserRole { is_admin: false, is_staff: false }.can_moderate());
    }

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "sam@example.com".into(),
            password: "long-enough".into(),
            display_name: None,
            anonymous_username: Some("happy-frog-12".into()),
        };
        assert!(ok.validate().is_ok());

        let short = RegisterRequest {
            password: "short".into(),
            ..ok.clone()
        };
        assert!(short.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            ..ok
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_update_profile_empty() {
        assert!(UpdateProfileRequest::default().is_empty());
        let req = UpdateProfileRequest {
            available_for_matches: Some(true),
            ..Default::default()
        };
        assert!(!req.is_empty());
    }

    #[test]
    fn test_update_profile_rejects_bad_struggles() {
        let req = UpdateProfileRequest {
            match_struggles: Some(vec!["".into()]),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
