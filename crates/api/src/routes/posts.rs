//! Post, feed, vote and comment routes.

use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::post::{
    assemble_feed, thread_comments, vent_expiry, Comment, CommentThread, CreateCommentRequest,
    CreatePostRequest, FeedQuery, Post, PostView, VoteRequest, VoteResponse, VoteType,
    FEED_CANDIDATES,
};
use persistence::repositories::{NewPost, PostRepository, UserRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_post_created;
use crate::routes::profiles::public_profiles;
use crate::services::moderation::spawn_post_check;

fn post_not_found() -> ApiError {
    ApiError::NotFound("Post not found".to_string())
}

/// Attaches authors and the viewer's votes to a list of posts.
async fn build_views(
    state: &AppState,
    posts: Vec<Post>,
    viewer: Uuid,
) -> Result<Vec<PostView>, ApiError> {
    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors = public_profiles(state, &author_ids).await?;
    let votes: HashMap<Uuid, VoteType> = PostRepository::new(state.pool.clone())
        .votes_for(viewer, &post_ids)
        .await?
        .into_iter()
        .map(|v| (v.post_id, v.vote_type.into()))
        .collect();

    Ok(posts
        .into_iter()
        .map(|post| {
            let author = authors.get(&post.user_id).cloned();
            let vote = votes.get(&post.id).copied();
            PostView::build(post, author, vote, viewer)
        })
        .collect())
}

/// Create a post. Vent posts get an expiry; the toxicity check runs afterwards.
///
/// POST /api/v1/posts
pub async fn create_post(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    request.validate()?;

    let content = request.content.trim();
    let max = state.config.limits.max_post_length;
    if content.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "Post must be at most {} characters",
            max
        )));
    }

    let category = request.category.unwrap_or_default();
    let expires_at = request.is_vent.then(|| {
        let minutes = request
            .vent_duration_minutes
            .unwrap_or(state.config.limits.default_vent_minutes);
        vent_expiry(Utc::now(), Some(minutes))
    });

    let repo = PostRepository::new(state.pool.clone());
    let entity = repo
        .create(NewPost {
            user_id: user_auth.user_id,
            content,
            category: category.into(),
            media_url: request.media_url.as_deref(),
            is_vent: request.is_vent,
            expires_at,
        })
        .await?;
    let post: Post = entity.into();

    record_post_created(category.as_str(), post.is_vent);
    info!(
        post_id = %post.id,
        user_id = %user_auth.user_id,
        category = %category,
        is_vent = post.is_vent,
        "Post created"
    );

    if let Some(classifier) = state.classifier.clone() {
        spawn_post_check(
            state.pool.clone(),
            classifier,
            post.id,
            post.content.clone(),
            state.config.moderation.threshold,
        );
    }

    let mut views = build_views(&state, vec![post], user_auth.user_id).await?;
    let view = views.pop().ok_or_else(post_not_found)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Home feed: recent posts with lapsed vents removed, alternating followed
/// authors and discovery.
///
/// GET /api/v1/posts/feed?category=
pub async fn feed(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<PostView>>, ApiError> {
    let category = query.category_filter().map_err(ApiError::Validation)?;

    let repo = PostRepository::new(state.pool.clone());
    let candidates: Vec<Post> = repo
        .recent(FEED_CANDIDATES)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let following: HashSet<Uuid> = UserRepository::new(state.pool.clone())
        .following_ids(user_auth.user_id)
        .await?
        .into_iter()
        .collect();

    let posts = assemble_feed(
        candidates,
        &following,
        category,
        Utc::now(),
        state.config.limits.feed_size,
    );
    let views = build_views(&state, posts, user_auth.user_id).await?;
    Ok(Json(views))
}

/// Fetch one post and count the view. Expired vents are still returned.
///
/// GET /api/v1/posts/:post_id
pub async fn get_post(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostView>, ApiError> {
    let repo = PostRepository::new(state.pool.clone());
    let post: Post = repo
        .record_view(post_id)
        .await?
        .ok_or_else(post_not_found)?
        .into();

    let mut views = build_views(&state, vec![post], user_auth.user_id).await?;
    views.pop().map(Json).ok_or_else(post_not_found)
}

/// Delete one of the caller's posts.
///
/// DELETE /api/v1/posts/:post_id
pub async fn delete_post(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(post_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = PostRepository::new(state.pool.clone());
    let post = repo.find_by_id(post_id).await?.ok_or_else(post_not_found)?;
    if post.user_id != user_auth.user_id {
        return Err(ApiError::Forbidden(
            "You can only delete your own posts".to_string(),
        ));
    }

    repo.delete(post_id).await?;
    info!(post_id = %post_id, user_id = %user_auth.user_id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Set, change or clear the caller's vote.
///
/// PUT /api/v1/posts/:post_id/vote
pub async fn vote(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(post_id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let repo = PostRepository::new(state.pool.clone());
    let counts = repo
        .set_vote(post_id, user_auth.user_id, request.vote_type)
        .await?
        .ok_or_else(post_not_found)?;

    info!(
        post_id = %post_id,
        user_id = %user_auth.user_id,
        vote = ?counts.user_vote,
        "Vote recorded"
    );
    Ok(Json(VoteResponse {
        post_id,
        user_vote: counts.user_vote,
        upvotes_count: counts.upvotes_count,
        downvotes_count: counts.downvotes_count,
    }))
}

/// Comment on a post, optionally replying to a top-level comment.
///
/// POST /api/v1/posts/:post_id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(post_id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    request.validate()?;

    let repo = PostRepository::new(state.pool.clone());
    if repo.find_by_id(post_id).await?.is_none() {
        return Err(post_not_found());
    }

    if let Some(parent_id) = request.parent_comment_id {
        let parent = repo
            .find_comment(parent_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Parent comment not found".to_string()))?;
        if parent.post_id != post_id {
            return Err(ApiError::Validation(
                "Parent comment belongs to another post".to_string(),
            ));
        }
        // One level of nesting only.
        if parent.parent_comment_id.is_some() {
            return Err(ApiError::Validation(
                "Replies cannot be replied to".to_string(),
            ));
        }
    }

    let comment: Comment = repo
        .add_comment(
            post_id,
            user_auth.user_id,
            request.parent_comment_id,
            request.content.trim(),
        )
        .await?
        .into();

    info!(
        comment_id = %comment.id,
        post_id = %post_id,
        user_id = %user_auth.user_id,
        "Comment added"
    );
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Threaded comments, oldest first.
///
/// GET /api/v1/posts/:post_id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    _user_auth: UserAuth,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<CommentThread>>, ApiError> {
    let repo = PostRepository::new(state.pool.clone());
    if repo.find_by_id(post_id).await?.is_none() {
        return Err(post_not_found());
    }
    let comments: Vec<Comment> = repo
        .list_comments(post_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(thread_comments(comments)))
}

/// Delete one of the caller's comments along with its replies.
///
/// DELETE /api/v1/posts/:post_id/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let repo = PostRepository::new(state.pool.clone());
    let comment = repo
        .find_comment(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
    if comment.user_id != user_auth.user_id {
        return Err(ApiError::Forbidden(
            "You can only delete your own comments".to_string(),
        ));
    }

    repo.delete_comment(comment_id, post_id).await?;
    info!(comment_id = %comment_id, post_id = %post_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
