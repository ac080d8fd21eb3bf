//! Post-creation toxicity hook.
//!
//! Runs after the create-post response has been sent. Any failure is logged
//! and the post stays as it is.

use std::sync::Arc;

use domain::services::moderation::{screen_text, ToxicityClassifier, ToxicityFlag, Verdict};
use persistence::repositories::PostRepository;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::middleware::metrics::{record_moderation_failure, record_post_flagged};

/// Screens `content` and returns the flag to apply, if any.
pub async fn evaluate(
    classifier: &dyn ToxicityClassifier,
    post_id: Uuid,
    content: &str,
    threshold: f64,
) -> Option<ToxicityFlag> {
    match screen_text(classifier, content, threshold).await {
        Ok(Verdict::Flag(flag)) => Some(flag),
        Ok(Verdict::Clean { score }) => {
            tracing::debug!(post_id = %post_id, score, "Post passed toxicity check");
            None
        }
        Ok(Verdict::Skipped) => None,
        Err(e) => {
            record_moderation_failure();
            tracing::warn!(
                post_id = %post_id,
                error = %e,
                "Toxicity check failed; post left unflagged"
            );
            None
        }
    }
}

/// Screens a post and, when it crosses the threshold, flags it and files
/// the system report. Returns whether the post was flagged by this call.
pub async fn check_post(
    posts: &PostRepository,
    classifier: &dyn ToxicityClassifier,
    post_id: Uuid,
    content: &str,
    threshold: f64,
) -> bool {
    let Some(flag) = evaluate(classifier, post_id, content, threshold).await else {
        return false;
    };

    match posts.flag_toxic(post_id, flag.score, &flag.reason).await {
        Ok(true) => {
            record_post_flagged();
            tracing::info!(post_id = %post_id, score = flag.score, "Post flagged for toxicity");
            true
        }
        Ok(false) => false,
        Err(e) => {
            record_moderation_failure();
            tracing::error!(post_id = %post_id, error = %e, "Failed to store toxicity flag");
            false
        }
    }
}

/// Fire-and-forget wrapper around [`check_post`], carrying the request span.
pub fn spawn_post_check(
    pool: PgPool,
    classifier: Arc<dyn ToxicityClassifier>,
    post_id: Uuid,
    content: String,
    threshold: f64,
) -> JoinHandle<()> {
    let span = tracing::info_span!("toxicity_check", post_id = %post_id);
    tokio::spawn(
        async move {
            let posts = PostRepository::new(pool);
            check_post(&posts, classifier.as_ref(), post_id, &content, threshold).await;
        }
        .instrument(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::moderation::{MockToxicityClassifier, TOXICITY_THRESHOLD};

    #[tokio::test]
    async fn test_high_score_is_flagged() {
        let classifier = MockToxicityClassifier::with_score(0.91);
        let flag = evaluate(&classifier, Uuid::new_v4(), "you are awful", TOXICITY_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(flag.score, 0.91);
        assert_eq!(flag.reason, "Auto-flagged: toxicity score 91% (Perspective API)");
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let classifier = MockToxicityClassifier::with_score(0.7);
        assert!(evaluate(&classifier, Uuid::new_v4(), "borderline", TOXICITY_THRESHOLD)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_low_score_is_clean() {
        let classifier = MockToxicityClassifier::with_score(0.69);
        assert!(evaluate(&classifier, Uuid::new_v4(), "nice day", TOXICITY_THRESHOLD)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_classifier_failure_fails_open() {
        let classifier = MockToxicityClassifier::failing();
        assert!(evaluate(&classifier, Uuid::new_v4(), "anything", TOXICITY_THRESHOLD)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_blank_content_is_skipped() {
        let classifier = MockToxicityClassifier::with_score(1.0);
        assert!(evaluate(&classifier, Uuid::new_v4(), "   ", TOXICITY_THRESHOLD)
            .await
            .is_none());
    }
}
