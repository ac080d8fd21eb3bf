//! Post, vote, comment and report entities.

use chrono::{DateTime, Utc};
use domain::models::post::{
    Comment, Post, PostCategory, PostStats, Report, ReportStatus, VoteType,
};
use domain::models::user::PublicProfile;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "post_category", rename_all = "snake_case")]
pub enum PostCategoryDb {
    General,
    AnxietyShare,
    DepressionVent,
}

impl From<PostCategoryDb> for PostCategory {
    fn from(db: PostCategoryDb) -> Self {
        match db {
            PostCategoryDb::General => PostCategory::General,
            PostCategoryDb::AnxietyShare => PostCategory::AnxietyShare,
            PostCategoryDb::DepressionVent => PostCategory::DepressionVent,
        }
    }
}

impl From<PostCategory> for PostCategoryDb {
    fn from(category: PostCategory) -> Self {
        match category {
            PostCategory::General => PostCategoryDb::General,
            PostCategory::AnxietyShare => PostCategoryDb::AnxietyShare,
            PostCategory::DepressionVent => PostCategoryDb::DepressionVent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "vote_type", rename_all = "lowercase")]
pub enum VoteTypeDb {
    Upvote,
    Downvote,
}

impl From<VoteTypeDb> for VoteType {
    fn from(db: VoteTypeDb) -> Self {
        match db {
            VoteTypeDb::Upvote => VoteType::Upvote,
            VoteTypeDb::Downvote => VoteType::Downvote,
        }
    }
}

impl From<VoteType> for VoteTypeDb {
    fn from(vote: VoteType) -> Self {
        match vote {
            VoteType::Upvote => VoteTypeDb::Upvote,
            VoteType::Downvote => VoteTypeDb::Downvote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
pub enum ReportStatusDb {
    Pending,
    Resolved,
}

impl From<ReportStatusDb> for ReportStatus {
    fn from(db: ReportStatusDb) -> Self {
        match db {
            ReportStatusDb::Pending => ReportStatus::Pending,
            ReportStatusDb::Resolved => ReportStatus::Resolved,
        }
    }
}

/// Database row mapping for the posts table.
#[derive(Debug, Clone, FromRow)]
pub struct PostEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub category: PostCategoryDb,
    pub media_url: Option<String>,
    pub is_vent: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub upvotes_count: i32,
    pub downvotes_count: i32,
    pub views_count: i32,
    pub comments_count: i32,
    pub flagged_for_toxicity: bool,
    pub toxicity_score: Option<f64>,
    pub flagged_at: Option<DateTime<Utc>>,
    pub approved_safe_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<PostEntity> for Post {
    fn from(entity: PostEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            content: entity.content,
            category: entity.category.into(),
            media_url: entity.media_url,
            is_vent: entity.is_vent,
            expires_at: entity.expires_at,
            stats: PostStats {
                upvotes_count: entity.upvotes_count,
                downvotes_count: entity.downvotes_count,
                views_count: entity.views_count,
                comments_count: entity.comments_count,
            },
            flagged_for_toxicity: entity.flagged_for_toxicity,
            toxicity_score: entity.toxicity_score,
            flagged_at: entity.flagged_at,
            approved_safe_at: entity.approved_safe_at,
            created_at: entity.created_at,
        }
    }
}

/// A caller's vote on one post.
#[derive(Debug, Clone, FromRow)]
pub struct PostVoteEntity {
    pub post_id: Uuid,
    pub vote_type: VoteTypeDb,
}

/// Comment joined with its author's public columns.
#[derive(Debug, Clone, FromRow)]
pub struct CommentEntity {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_display_name: Option<String>,
    pub author_anonymous_username: Option<String>,
    pub author_avatar_url: Option<String>,
}

impl From<CommentEntity> for Comment {
    fn from(entity: CommentEntity) -> Self {
        Self {
            id: entity.id,
            post_id: entity.post_id,
            user_id: entity.user_id,
            parent_comment_id: entity.parent_comment_id,
            content: entity.content,
            author: Some(PublicProfile {
                id: entity.user_id,
                display_name: entity.author_display_name,
                anonymous_username: entity.author_anonymous_username,
                avatar_url: entity.author_avatar_url,
            }),
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the reports table.
#[derive(Debug, Clone, FromRow)]
pub struct ReportEntity {
    pub id: Uuid,
    pub post_id: Uuid,
    pub post_owner_id: Option<Uuid>,
    pub reporter_id: Option<Uuid>,
    pub reason: String,
    pub status: ReportStatusDb,
    pub created_at: DateTime<Utc>,
}

impl From<ReportEntity> for Report {
    fn from(entity: ReportEntity) -> Self {
        Self {
            id: entity.id,
            post_id: entity.post_id,
            post_owner_id: entity.post_owner_id,
            reporter_id: entity.reporter_id,
            reason: entity.reason,
            status: entity.status.into(),
            created_at: entity.created_at,
        }
    }
}

/// Flagged post with its pending report count.
#[derive(Debug, Clone, FromRow)]
pub struct FlaggedPostEntity {
    #[sqlx(flatten)]
    pub post: PostEntity,
    pub pending_reports: i64,
}
