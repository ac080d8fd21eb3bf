//! Domain services.

pub mod moderation;

pub use moderation::{
    screen_text, verdict_for_score, MockToxicityClassifier, ModerationError,
    ToxicityClassifier, ToxicityFlag, Verdict, TOXICITY_THRESHOLD,
};
