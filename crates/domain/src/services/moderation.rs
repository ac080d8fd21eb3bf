//! Toxicity screening for new posts.
//!
//! A classifier scores text between 0 and 1. Scores at or above the
//! threshold flag the post and open a system report for reviewers. Any
//! classifier failure leaves the post untouched.

use thiserror::Error;

/// Default score at which a post is flagged.
pub const TOXICITY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Classifier is not configured")]
    NotConfigured,

    #[error("Classifier request failed: {0}")]
    Request(String),

    #[error("Classifier returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Classifier response could not be parsed: {0}")]
    InvalidResponse(String),
}

/// Scores text for toxicity.
#[async_trait::async_trait]
pub trait ToxicityClassifier: Send + Sync {
    /// Returns a score in `0.0..=1.0`.
    async fn score(&self, text: &str) -> Result<f64, ModerationError>;
}

/// Outcome of screening one post.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Nothing to check (blank text).
    Skipped,
    Clean { score: f64 },
    Flag(ToxicityFlag),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToxicityFlag {
    /// Score rounded to two decimals.
    pub score: f64,
    pub reason: String,
}

impl ToxicityFlag {
    pub fn from_score(score: f64) -> Self {
        Self {
            score: (score * 100.0).round() / 100.0,
            reason: format!(
                "Auto-flagged: toxicity score {:.0}% (Perspective API)",
                score * 100.0
            ),
        }
    }
}

pub fn verdict_for_score(score: f64, threshold: f64) -> Verdict {
    if score >= threshold {
        Verdict::Flag(ToxicityFlag::from_score(score))
    } else {
        Verdict::Clean { score }
    }
}

/// Trims `content` and asks the classifier about it. Blank text is never
/// sent.
pub async fn screen_text(
    classifier: &dyn ToxicityClassifier,
    content: &str,
    threshold: f64,
) -> Result<Verdict, ModerationError> {
    let text = content.trim();
    if text.is_empty() {
        return Ok(Verdict::Skipped);
    }
    let score = classifier.score(text).await?;
    Ok(verdict_for_score(score, threshold))
}

/// Mock classifier for development and testing.
///
/// Returns a fixed score, or fails when `simulate_failure` is set.
#[derive(Debug, Clone, Default)]
pub struct MockToxicityClassifier {
    pub fixed_score: f64,
    pub simulate_failure: bool,
}

impl MockToxicityClassifier {
    pub fn with_score(score: f64) -> Self {
        Self {
            fixed_score: score,
            simulate_failure: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fixed_score: 0.0,
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl ToxicityClassifier for MockToxicityClassifier {
    async fn score(&self, text: &str) -> Result<f64, ModerationError> {
        if self.simulate_failure {
            tracing::warn!(text_len = text.len(), "Mock classifier simulating failure");
            return Err(ModerationError::Request("Simulated failure".to_string()));
        }
        tracing::debug!(
            text_len = text.len(),
            score = self.fixed_score,
            "Mock: returning fixed toxicity score"
        );
        Ok(self.fixed_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(matches!(verdict_for_score(0.7, TOXICITY_THRESHOLD), Verdict::Flag(_)));
        assert!(matches!(
            verdict_for_score(0.69, TOXICITY_THRESHOLD),
            Verdict::Clean { .. }
        ));
    }

    #[test]
    fn test_flag_rounding_and_reason() {
        let flag = ToxicityFlag::from_score(0.87654);
        assert_eq!(flag.score, 0.88);
        assert_eq!(flag.reason, "Auto-flagged: toxicity score 88% (Perspective API)");
    }

    #[tokio::test]
    async fn test_screen_text_flags_high_scores() {
        let classifier = MockToxicityClassifier::with_score(0.93);
        let verdict = screen_text(&classifier, "  awful words  ", TOXICITY_THRESHOLD)
            .await
            .unwrap();
        match verdict {
            Verdict::Flag(flag) => assert_eq!(flag.score, 0.93),
            other => panic!("expected flag, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_screen_text_skips_blank() {
        let classifier = MockToxicityClassifier::failing();
        let verdict = screen_text(&classifier, "   ", TOXICITY_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Skipped);
    }

    #[tokio::test]
    async fn test_screen_text_surfaces_failures() {
        let classifier = MockToxicityClassifier::failing();
        assert!(screen_text(&classifier, "hello", TOXICITY_THRESHOLD)
            .await
            .is_err());
    }
}
