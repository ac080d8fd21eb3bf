//! Post repository: posts, votes, comments and reports.

use chrono::{DateTime, Utc};
use domain::models::post::{VoteDelta, VoteType};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{
    CommentEntity, FlaggedPostEntity, PostCategoryDb, PostEntity, PostVoteEntity, ReportEntity,
    VoteTypeDb,
};
use crate::metrics::QueryTimer;

/// Input for a new post.
#[derive(Debug, Clone)]
pub struct NewPost<'a> {
    pub user_id: Uuid,
    pub content: &'a str,
    pub category: PostCategoryDb,
    pub media_url: Option<&'a str>,
    pub is_vent: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Counters after a vote change.
#[derive(Debug, Clone, Copy)]
pub struct VoteCounts {
    pub user_vote: Option<VoteType>,
    pub upvotes_count: i32,
    pub downvotes_count: i32,
}

/// Repository for post-related database operations.
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    /// Creates a new PostRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, post: NewPost<'_>) -> Result<PostEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_post");
        let result = sqlx::query_as::<_, PostEntity>(
            r#"
            INSERT INTO posts (user_id, content, category, media_url, is_vent, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, content, category, media_url, is_vent, expires_at,
                      upvotes_count, downvotes_count, views_count, comments_count,
                      flagged_for_toxicity, toxicity_score, flagged_at, approved_safe_at, created_at
            "#,
        )
        .bind(post.user_id)
        .bind(post.content)
        .bind(post.category)
        .bind(post.media_url)
        .bind(post.is_vent)
        .bind(post.expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Direct fetch. Expired vents are still returned.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PostEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_post_by_id");
        let result = sqlx::query_as::<_, PostEntity>(
            r#"
            SELECT id, user_id, content, category, media_url, is_vent, expires_at,
                   upvotes_count, downvotes_count, views_count, comments_count,
                   flagged_for_toxicity, toxicity_score, flagged_at, approved_safe_at, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Bump the view counter and return the fresh row.
    pub async fn record_view(&self, id: Uuid) -> Result<Option<PostEntity>, sqlx::Error> {
        let timer = QueryTimer::new("record_post_view");
        let result = sqlx::query_as::<_, PostEntity>(
            r#"
            UPDATE posts SET views_count = views_count + 1
            WHERE id = $1
            RETURNING id, user_id, content, category, media_url, is_vent, expires_at,
                      upvotes_count, downvotes_count, views_count, comments_count,
                      flagged_for_toxicity, toxicity_score, flagged_at, approved_safe_at, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Newest posts first, unfiltered. Feed rules are applied by the caller.
    pub async fn recent(&self, limit: i64) -> Result<Vec<PostEntity>, sqlx::Error> {
        let timer = QueryTimer::new("recent_posts");
        let result = sqlx::query_as::<_, PostEntity>(
            r#"
            SELECT id, user_id, content, category, media_url, is_vent, expires_at,
                   upvotes_count, downvotes_count, views_count, comments_count,
                   flagged_for_toxicity, toxicity_score, flagged_at, approved_safe_at, created_at
            FROM posts
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_post");
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_user_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_posts_since");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    // Votes

    /// The caller's votes on a batch of posts.
    pub async fn votes_for(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<PostVoteEntity>, sqlx::Error> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = QueryTimer::new("votes_for_posts");
        let result = sqlx::query_as::<_, PostVoteEntity>(
            "SELECT post_id, vote_type FROM post_votes WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Replace the caller's vote and move the counters by the difference.
    /// Returns `None` when the post does not exist.
    pub async fn set_vote(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        vote: Option<VoteType>,
    ) -> Result<Option<VoteCounts>, sqlx::Error> {
        let timer = QueryTimer::new("set_post_vote");
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let previous = sqlx::query_scalar::<_, VoteTypeDb>(
            "SELECT vote_type FROM post_votes WHERE post_id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(VoteType::from);

        match vote {
            Some(v) => {
                sqlx::query(
                    r#"
                    INSERT INTO post_votes (post_id, user_id, vote_type)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (post_id, user_id)
                    DO UPDATE SET vote_type = EXCLUDED.vote_type, updated_at = NOW()
                    "#,
                )
                .bind(post_id)
                .bind(user_id)
                .bind(VoteTypeDb::from(v))
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM post_votes WHERE post_id = $1 AND user_id = $2")
                    .bind(post_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let delta = VoteDelta::between(previous, vote);
        let (upvotes_count, downvotes_count) = sqlx::query_as::<_, (i32, i32)>(
            r#"
            UPDATE posts
            SET upvotes_count = GREATEST(0, upvotes_count + $2),
                downvotes_count = GREATEST(0, downvotes_count + $3)
            WHERE id = $1
            RETURNING upvotes_count, downvotes_count
            "#,
        )
        .bind(post_id)
        .bind(delta.upvotes)
        .bind(delta.downvotes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(VoteCounts {
            user_vote: vote,
            upvotes_count,
            downvotes_count,
        }))
    }

    // Comments

    pub async fn find_comment(&self, id: Uuid) -> Result<Option<CommentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_comment");
        let result = sqlx::query_as::<_, CommentEntity>(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.parent_comment_id, c.content, c.created_at,
                   u.display_name AS author_display_name,
                   u.anonymous_username AS author_anonymous_username,
                   u.avatar_url AS author_avatar_url
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// All comments on a post, oldest first.
    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_comments");
        let result = sqlx::query_as::<_, CommentEntity>(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.parent_comment_id, c.content, c.created_at,
                   u.display_name AS author_display_name,
                   u.anonymous_username AS author_anonymous_username,
                   u.avatar_url AS author_avatar_url
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a comment and bump the post's comment counter.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        parent_comment_id: Option<Uuid>,
        content: &str,
    ) -> Result<CommentEntity, sqlx::Error> {
        let timer = QueryTimer::new("add_comment");
        let mut tx = self.pool.begin().await?;

        let comment = sqlx::query_as::<_, CommentEntity>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, user_id, parent_comment_id, content)
                VALUES ($1, $2, $3, $4)
                RETURNING id, post_id, user_id, parent_comment_id, content, created_at
            )
            SELECT i.id, i.post_id, i.user_id, i.parent_comment_id, i.content, i.created_at,
                   u.display_name AS author_display_name,
                   u.anonymous_username AS author_anonymous_username,
                   u.avatar_url AS author_avatar_url
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(parent_comment_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(comment)
    }

    /// Delete a comment with its replies and drop the counter accordingly.
    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        post_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_comment");
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments WHERE id = $1 OR parent_comment_id = $1",
        )
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted > 0 {
            sqlx::query(
                "UPDATE posts SET comments_count = GREATEST(0, comments_count - $2) WHERE id = $1",
            )
            .bind(post_id)
            .bind(removed as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(deleted > 0)
    }

    // Reports and moderation

    pub async fn create_report(
        &self,
        post_id: Uuid,
        post_owner_id: Uuid,
        reporter_id: Uuid,
        reason: &str,
    ) -> Result<ReportEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_report");
        let mut tx = self.pool.begin().await?;

        let report = sqlx::query_as::<_, ReportEntity>(
            r#"
            INSERT INTO reports (post_id, post_owner_id, reporter_id, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, post_owner_id, reporter_id, reason, status, created_at
            "#,
        )
        .bind(post_id)
        .bind(post_owner_id)
        .bind(reporter_id)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET reports_received_count = reports_received_count + 1 WHERE id = $1",
        )
        .bind(post_owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(report)
    }

    /// Flag a post as toxic, open one system report and bump the author's
    /// report counter. A post that is already flagged is left alone and
    /// `false` is returned.
    pub async fn flag_toxic(
        &self,
        post_id: Uuid,
        score: f64,
        reason: &str,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("flag_toxic_post");
        let mut tx = self.pool.begin().await?;

        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE posts
            SET flagged_for_toxicity = true, toxicity_score = $2, flagged_at = NOW()
            WHERE id = $1 AND NOT flagged_for_toxicity
            RETURNING user_id
            "#,
        )
        .bind(post_id)
        .bind(score)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(owner) = owner else {
            tx.rollback().await?;
            timer.record();
            return Ok(false);
        };

        sqlx::query(
            r#"
            INSERT INTO reports (post_id, post_owner_id, reporter_id, reason)
            VALUES ($1, $2, NULL, $3)
            "#,
        )
        .bind(post_id)
        .bind(owner)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET reports_received_count = reports_received_count + 1 WHERE id = $1",
        )
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(true)
    }

    /// Clear a post for display and resolve its pending reports.
    /// Returns the number of reports resolved, or `None` for an unknown post.
    pub async fn approve(
        &self,
        post_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<Option<u64>, sqlx::Error> {
        let timer = QueryTimer::new("approve_flagged_post");
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET approved_safe_at = NOW(), flagged_for_toxicity = false
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        }

        let resolved = sqlx::query(
            r#"
            UPDATE reports
            SET status = 'resolved', resolved_at = NOW(), resolved_by = $2
            WHERE post_id = $1 AND status = 'pending'
            "#,
        )
        .bind(post_id)
        .bind(reviewer_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        timer.record();
        Ok(Some(resolved))
    }

    /// Posts held by the classifier or carrying open reports, newest first.
    pub async fn list_flagged(&self) -> Result<Vec<FlaggedPostEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_flagged_posts");
        let result = sqlx::query_as::<_, FlaggedPostEntity>(
            r#"
            SELECT p.id, p.user_id, p.content, p.category, p.media_url, p.is_vent, p.expires_at,
                   p.upvotes_count, p.downvotes_count, p.views_count, p.comments_count,
                   p.flagged_for_toxicity, p.toxicity_score, p.flagged_at, p.approved_safe_at,
                   p.created_at,
                   (SELECT COUNT(*) FROM reports r
                    WHERE r.post_id = p.id AND r.status = 'pending') AS pending_reports
            FROM posts p
            WHERE p.flagged_for_toxicity
               OR EXISTS (SELECT 1 FROM reports r WHERE r.post_id = p.id AND r.status = 'pending')
            ORDER BY COALESCE(p.flagged_at, p.created_at) DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn reports_for_post(&self, post_id: Uuid) -> Result<Vec<ReportEntity>, sqlx::Error> {
        let timer = QueryTimer::new("reports_for_post");
        let result = sqlx::query_as::<_, ReportEntity>(
            r#"
            SELECT id, post_id, post_owner_id, reporter_id, reason, status, created_at
            FROM reports
            WHERE post_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
