//! Administrative functions: staff accounts, media upload and login stats.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_LOGIN_STAT_DAYS: i64 = 30;
pub const IMAGE_BUCKET: &str = "image-data";
pub const VIDEO_BUCKET: &str = "video-data";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStaffUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 128,
        message = "Staff password must be at least 6 characters"
    ))]
    pub password: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Display name must be between 1 and 50 characters"
    ))]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStaffUserResponse {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApproveFlaggedPostRequest {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApproveFlaggedPostResponse {
    pub post_id: Uuid,
    pub resolved_reports: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadMediaRequest {
    #[validate(length(min = 1, message = "Payload is required"))]
    pub base64: String,

    #[validate(length(min = 1, message = "Content type is required"))]
    pub content_type: String,

    #[validate(length(min = 1, max = 512, message = "Path must be between 1 and 512 characters"))]
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadMediaResponse {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let lowered = content_type.trim().to_ascii_lowercase();
        let (top, sub) = lowered.split_once('/')?;
        if sub.is_empty() {
            return None;
        }
        match top {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn bucket(&self) -> &'static str {
        match self {
            MediaKind::Image => IMAGE_BUCKET,
            MediaKind::Video => VIDEO_BUCKET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaPathError {
    #[error("Content type must be an image or video type")]
    UnsupportedContentType,
    #[error("Path must start with {0}")]
    WrongPrefix(String),
    #[error("Path contains an invalid segment")]
    InvalidSegment,
}

/// Checks that `path` lives in the caller's folder of the bucket matching
/// `content_type`, and returns the media kind.
pub fn check_media_path(
    path: &str,
    content_type: &str,
    user_id: Uuid,
) -> Result<MediaKind, MediaPathError> {
    let kind = MediaKind::from_content_type(content_type)
        .ok_or(MediaPathError::UnsupportedContentType)?;
    let prefix = format!("{}/{}/", kind.bucket(), user_id);

    let rest = path
        .strip_prefix(&prefix)
        .ok_or_else(|| MediaPathError::WrongPrefix(prefix.clone()))?;

    if rest.is_empty()
        || rest.contains('\\')
        || rest
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(MediaPathError::InvalidSegment);
    }
    Ok(kind)
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginStatsQuery {
    #[validate(range(min = 1, max = 365, message = "Days must be between 1 and 365"))]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginStat {
    pub date: NaiveDate,
    pub count: i64,
}

/// One entry per day from `today - days` through `today`, oldest first,
/// with zero for days that saw no logins.
pub fn fill_login_days(today: NaiveDate, days: i64, counts: &[(NaiveDate, i64)]) -> Vec<LoginStat> {
    let by_day: HashMap<NaiveDate, i64> = counts.iter().copied().collect();
    (0..=days)
        .rev()
        .map(|offset| today - Duration::days(offset))
        .map(|date| LoginStat {
            date,
            count: by_day.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind() {
        assert_eq!(MediaKind::from_content_type("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_content_type("Video/MP4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_content_type("application/pdf"), None);
        assert_eq!(MediaKind::from_content_type("image/"), None);
        assert_eq!(MediaKind::from_content_type("image"), None);
    }

    #[test]
    fn test_media_path_accepts_own_folder() {
        let uid = Uuid::new_v4();
        let path = format!("image-data/{}/avatar.png", uid);
        assert_eq!(check_media_path(&path, "image/png", uid), Ok(MediaKind::Image));

        let nested = format!("video-data/{}/2025/clip.mp4", uid);
        assert_eq!(check_media_path(&nested, "video/mp4", uid), Ok(MediaKind::Video));
    }

    #[test]
    fn test_media_path_rejects_other_user_and_bucket() {
        let uid = Uuid::new_v4();
        let other = format!("image-data/{}/a.png", Uuid::new_v4());
        assert!(matches!(
            check_media_path(&other, "image/png", uid),
            Err(MediaPathError::WrongPrefix(_))
        ));
        let wrong_bucket = format!("video-data/{}/a.png", uid);
        assert!(matches!(
            check_media_path(&wrong_bucket, "image/png", uid),
            Err(MediaPathError::WrongPrefix(_))
        ));
    }

    #[test]
    fn test_media_path_rejects_traversal() {
        let uid = Uuid::new_v4();
        for bad in ["../x.png", "a/../../x.png", "", "a//b.png", "./a.png"] {
            let path = format!("image-data/{}/{}", uid, bad);
            assert_eq!(
                check_media_path(&path, "image/png", uid),
                Err(MediaPathError::InvalidSegment),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_fill_login_days_includes_zero_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let stats = fill_login_days(today, 3, &[(yesterday, 4)]);
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[0].date, NaiveDate::from_ymd_opt(2025, 2, 27).unwrap());
        assert_eq!(stats[2], LoginStat { date: yesterday, count: 4 });
        assert_eq!(stats[3], LoginStat { date: today, count: 0 });
    }
}
