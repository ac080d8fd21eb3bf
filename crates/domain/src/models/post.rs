//! Posts, votes, comments and the home feed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::user::PublicProfile;
use shared::validation::validate_not_blank;

pub const MAX_POST_LENGTH: usize = 1000;
/// Vent posts disappear from the feed after a day unless told otherwise.
pub const DEFAULT_VENT_MINUTES: i64 = 24 * 60;
/// Longest a vent may stay visible: one week.
pub const MAX_VENT_MINUTES: i64 = 7 * 24 * 60;
/// How many recent posts the feed considers before filtering.
pub const FEED_CANDIDATES: i64 = 150;
/// How many posts the feed returns.
pub const FEED_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    #[default]
    General,
    AnxietyShare,
    DepressionVent,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::General => "general",
            PostCategory::AnxietyShare => "anxiety_share",
            PostCategory::DepressionVent => "depression_vent",
        }
    }
}

impl FromStr for PostCategory {
    type Err = String;

    /// Accepts both the wire form and the labels shown in the app.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "general" => Ok(PostCategory::General),
            "anxiety_share" => Ok(PostCategory::AnxietyShare),
            "depression_vent" => Ok(PostCategory::DepressionVent),
            _ => Err(format!("Invalid post category: {}", s)),
        }
    }
}

impl fmt::Display for PostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Upvote => "upvote",
            VoteType::Downvote => "downvote",
        }
    }
}

/// Counter movement caused by replacing one vote with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteDelta {
    pub upvotes: i32,
    pub downvotes: i32,
}

impl VoteDelta {
    pub fn between(old: Option<VoteType>, new: Option<VoteType>) -> Self {
        let mut delta = VoteDelta::default();
        match old {
            Some(VoteType::Upvote) => delta.upvotes -= 1,
            Some(VoteType::Downvote) => delta.downvotes -= 1,
            None => {}
        }
        match new {
            Some(VoteType::Upvote) => delta.upvotes += 1,
            Some(VoteType::Downvote) => delta.downvotes += 1,
            None => {}
        }
        delta
    }

    pub fn is_zero(&self) -> bool {
        self.upvotes == 0 && self.downvotes == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostStats {
    pub upvotes_count: i32,
    pub downvotes_count: i32,
    pub views_count: i32,
    pub comments_count: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub category: PostCategory,
    pub media_url: Option<String>,
    pub is_vent: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub stats: PostStats,
    pub flagged_for_toxicity: bool,
    pub toxicity_score: Option<f64>,
    pub flagged_at: Option<DateTime<Utc>>,
    pub approved_safe_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// A post is listed iff it is not a vent, or its vent window is still
    /// open at `now`. Direct fetches ignore this.
    pub fn is_visible_in_feed(&self, now: DateTime<Utc>) -> bool {
        is_visible_in_feed(self.is_vent, self.expires_at, now)
    }

    /// Auto-flagged and not yet cleared by a moderator.
    pub fn is_held_for_review(&self) -> bool {
        self.flagged_for_toxicity && self.approved_safe_at.is_none()
    }
}

pub fn is_visible_in_feed(
    is_vent: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if !is_vent {
        return true;
    }
    match expires_at {
        Some(expires_at) => expires_at > now,
        // Rows are constrained to carry an expiry; treat a missing one as lapsed.
        None => false,
    }
}

/// Expiry for a vent posted at `now`.
pub fn vent_expiry(now: DateTime<Utc>, minutes: Option<i64>) -> DateTime<Utc> {
    now + Duration::minutes(minutes.unwrap_or(DEFAULT_VENT_MINUTES))
}

/// Alternates followed and discovery posts, one each, preserving the order
/// within each list, then truncates.
pub fn interleave_feed<T>(followed: Vec<T>, discovery: Vec<T>, take: usize) -> Vec<T> {
    let mut out = Vec::with_capacity((followed.len() + discovery.len()).min(take));
    let mut followed = followed.into_iter();
    let mut discovery = discovery.into_iter();
    loop {
        let a = followed.next();
        let b = discovery.next();
        if a.is_none() && b.is_none() {
            break;
        }
        out.extend(a);
        out.extend(b);
        if out.len() >= take {
            break;
        }
    }
    out.truncate(take);
    out
}

/// Applies vent expiry, the optional category filter and the
/// followed/discovery interleave to the newest-first candidate list.
pub fn assemble_feed(
    candidates: Vec<Post>,
    following: &HashSet<Uuid>,
    category: Option<PostCategory>,
    now: DateTime<Utc>,
    take: usize,
) -> Vec<Post> {
    let (followed, discovery): (Vec<Post>, Vec<Post>) = candidates
        .into_iter()
        .filter(|p| p.is_visible_in_feed(now))
        .filter(|p| category.map_or(true, |c| p.category == c))
        .partition(|p| following.contains(&p.user_id));

    interleave_feed(followed, discovery, take)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 1000, message = "Post must be at most 1000 characters")
    )]
    pub content: String,

    pub category: Option<PostCategory>,

    #[validate(url(message = "Media URL must be a valid URL"))]
    pub media_url: Option<String>,

    #[serde(default)]
    pub is_vent: bool,

    #[validate(range(
        min = 1,
        max = 10080,
        message = "Vent duration must be between 1 minute and 7 days"
    ))]
    pub vent_duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    /// Category label; `All` or absent means no filter.
    pub category: Option<String>,
}

impl FeedQuery {
    pub fn category_filter(&self) -> Result<Option<PostCategory>, String> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(c) if c.eq_ignore_ascii_case("all") => Ok(None),
            Some(c) => c.parse().map(Some),
        }
    }
}

/// Post as returned to a reader, with author and the reader's own vote.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author: Option<PublicProfile>,
    pub content: String,
    pub content_hidden: bool,
    pub category: PostCategory,
    pub media_url: Option<String>,
    pub is_vent: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub stats: PostStats,
    pub user_vote: Option<VoteType>,
    pub created_at: DateTime<Utc>,
}

impl PostView {
    /// Held posts keep their metadata but not their text, except for the author.
    pub fn build(
        post: Post,
        author: Option<PublicProfile>,
        user_vote: Option<VoteType>,
        viewer: Uuid,
    ) -> Self {
        let hidden = post.is_held_for_review() && post.user_id != viewer;
        Self {
            id: post.id,
            user_id: post.user_id,
            author,
            content: if hidden { String::new() } else { post.content },
            content_hidden: hidden,
            category: post.category,
            media_url: if hidden { None } else { post.media_url },
            is_vent: post.is_vent,
            expires_at: post.expires_at,
            stats: post.stats,
            user_vote,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteRequest {
    /// `null` clears the vote.
    pub vote_type: Option<VoteType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteResponse {
    pub post_id: Uuid,
    pub user_vote: Option<VoteType>,
    pub upvotes_count: i32,
    pub downvotes_count: i32,
}

// Comments

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub author: Option<PublicProfile>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Groups oldest-first comments into top-level threads with their replies.
/// Replies whose parent is missing are dropped.
pub fn thread_comments(comments: Vec<Comment>) -> Vec<CommentThread> {
    let (roots, replies): (Vec<Comment>, Vec<Comment>) = comments
        .into_iter()
        .partition(|c| c.parent_comment_id.is_none());

    let mut by_parent: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for reply in replies {
        if let Some(parent) = reply.parent_comment_id {
            by_parent.entry(parent).or_default().push(reply);
        }
    }

    roots
        .into_iter()
        .map(|comment| {
            let replies = by_parent.remove(&comment.id).unwrap_or_default();
            CommentThread { comment, replies }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 1000, message = "Comment must be at most 1000 characters")
    )]
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
}

// Reports

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: Uuid,
    pub post_id: Uuid,
    pub post_owner_id: Option<Uuid>,
    /// `None` for reports raised by the moderation hook.
    pub reporter_id: Option<Uuid>,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportPostRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 500, message = "Reason must be at most 500 characters")
    )]
    pub reason: String,
}

/// A post in the moderation queue with its open reports.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedPost {
    pub post: Post,
    pub author: Option<PublicProfile>,
    pub pending_reports: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(user_id: Uuid, created_at: DateTime<Utc>) -> Post {
        Post {
            id: Uuid::new_v4(),
            user_id,
            content: "today was a lot".into(),
            category: PostCategory::General,
            media_url: None,
            is_vent: false,
            expires_at: None,
            stats: PostStats {
                upvotes_count: 0,
                downvotes_count: 0,
                views_count: 0,
                comments_count: 0,
            },
            flagged_for_toxicity: false,
            toxicity_score: None,
            flagged_at: None,
            approved_safe_at: None,
            created_at,
        }
    }

    fn vent(expires_at: DateTime<Utc>) -> Post {
        Post {
            is_vent: true,
            expires_at: Some(expires_at),
            ..post(Uuid::new_v4(), Utc::now())
        }
    }

    #[test]
    fn test_regular_post_always_visible() {
        let now = Utc::now();
        assert!(post(Uuid::new_v4(), now).is_visible_in_feed(now + Duration::days(365)));
    }

    #[test]
    fn test_vent_visible_until_expiry() {
        let now = Utc::now();
        let p = vent(now + Duration::seconds(1));
        assert!(p.is_visible_in_feed(now));
        assert!(!p.is_visible_in_feed(now + Duration::seconds(1)));
        assert!(!p.is_visible_in_feed(now + Duration::seconds(2)));
    }

    #[test]
    fn test_vent_without_expiry_hidden() {
        assert!(!is_visible_in_feed(true, None, Utc::now()));
    }

    #[test]
    fn test_vent_expiry_defaults_to_a_day() {
        let now = Utc::now();
        assert_eq!(vent_expiry(now, None), now + Duration::hours(24));
        assert_eq!(vent_expiry(now, Some(30)), now + Duration::minutes(30));
    }

    #[test]
    fn test_vote_delta() {
        use VoteType::*;
        assert_eq!(VoteDelta::between(None, Some(Upvote)), VoteDelta { upvotes: 1, downvotes: 0 });
        assert_eq!(
            VoteDelta::between(Some(Upvote), Some(Downvote)),
            VoteDelta { upvotes: -1, downvotes: 1 }
        );
        assert_eq!(
            VoteDelta::between(Some(Downvote), None),
            VoteDelta { upvotes: 0, downvotes: -1 }
        );
        assert!(VoteDelta::between(Some(Upvote), Some(Upvote)).is_zero());
        assert!(VoteDelta::between(None, None).is_zero());
    }

    #[test]
    fn test_interleave_alternates_then_drains() {
        let out = interleave_feed(vec![1, 2, 3], vec![10, 20], 100);
        assert_eq!(out, vec![1, 10, 2, 20, 3]);

        let out = interleave_feed(Vec::<i32>::new(), vec![10, 20], 100);
        assert_eq!(out, vec![10, 20]);
    }

    #[test]
    fn test_interleave_truncates() {
        let out = interleave_feed(vec![1, 2, 3], vec![10, 20, 30], 3);
        assert_eq!(out, vec![1, 10, 2]);
    }

    #[test]
    fn test_assemble_feed_filters_and_interleaves() {
        let now = Utc::now();
        let friend = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let f1 = post(friend, now);
        let s1 = post(stranger, now - Duration::minutes(1));
        let expired = Post {
            user_id: stranger,
            ..vent(now - Duration::seconds(5))
        };
        let anxious = Post {
            category: PostCategory::AnxietyShare,
            ..post(stranger, now - Duration::minutes(2))
        };
        let f2 = post(friend, now - Duration::minutes(3));

        let following: HashSet<Uuid> = [friend].into_iter().collect();
        let ids = |v: Vec<Post>| v.into_iter().map(|p| p.id).collect::<Vec<_>>();

        let all = assemble_feed(
            vec![f1.clone(), s1.clone(), expired.clone(), anxious.clone(), f2.clone()],
            &following,
            None,
            now,
            FEED_SIZE,
        );
        assert_eq!(ids(all), vec![f1.id, s1.id, f2.id, anxious.id]);

        let only_anxiety = assemble_feed(
            vec![f1, s1, expired, anxious.clone(), f2],
            &following,
            Some(PostCategory::AnxietyShare),
            now,
            FEED_SIZE,
        );
        assert_eq!(ids(only_anxiety), vec![anxious.id]);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Anxiety Share".parse::<PostCategory>().unwrap(), PostCategory::AnxietyShare);
        assert_eq!(
            "depression_vent".parse::<PostCategory>().unwrap(),
            PostCategory::DepressionVent
        );
        assert!("Sports".parse::<PostCategory>().is_err());

        let q = FeedQuery { category: Some("All".into()) };
        assert_eq!(q.category_filter().unwrap(), None);
        let q = FeedQuery { category: Some("General".into()) };
        assert_eq!(q.category_filter().unwrap(), Some(PostCategory::General));
        assert!(FeedQuery { category: Some("x".into()) }.category_filter().is_err());
    }

    #[test]
    fn test_held_post_hides_content_from_others() {
        let author = Uuid::new_v4();
        let held = Post {
            flagged_for_toxicity: true,
            toxicity_score: Some(0.91),
            ..post(author, Utc::now())
        };

        let for_reader = PostView::build(held.clone(), None, None, Uuid::new_v4());
        assert!(for_reader.content_hidden);
        assert!(for_reader.content.is_empty());

        let for_author = PostView::build(held.clone(), None, None, author);
        assert!(!for_author.content_hidden);

        let approved = Post {
            approved_safe_at: Some(Utc::now()),
            ..held
        };
        assert!(!PostView::build(approved, None, None, Uuid::new_v4()).content_hidden);
    }

    #[test]
    fn test_create_post_validation() {
        let ok = CreatePostRequest {
            content: "hello".into(),
            category: None,
            media_url: None,
            is_vent: false,
            vent_duration_minutes: None,
        };
        assert!(ok.validate().is_ok());

        let blank = CreatePostRequest { content: "   ".into(), ..ok.clone() };
        assert!(blank.validate().is_err());

        let long = CreatePostRequest { content: "a".repeat(1001), ..ok.clone() };
        assert!(long.validate().is_err());

        let bad_vent = CreatePostRequest { vent_duration_minutes: Some(0), ..ok };
        assert!(bad_vent.validate().is_err());
    }

    fn comment(parent: Option<Uuid>) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            post_id: Uuid::nil(),
            user_id: Uuid::new_v4(),
            parent_comment_id: parent,
            content: "same here".into(),
            author: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_thread_comments() {
        let a = comment(None);
        let b = comment(None);
        let a1 = comment(Some(a.id));
        let a2 = comment(Some(a.id));
        let orphan = comment(Some(Uuid::new_v4()));

        let threads = thread_comments(vec![a.clone(), a1.clone(), b.clone(), orphan, a2.clone()]);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, a.id);
        assert_eq!(
            threads[0].replies.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![a1.id, a2.id]
        );
        assert_eq!(threads[1].comment.id, b.id);
        assert!(threads[1].replies.is_empty());
    }
}
