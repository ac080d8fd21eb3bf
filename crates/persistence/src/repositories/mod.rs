//! Repository implementations for database operations.

pub mod challenge;
pub mod conversation;
pub mod group;
pub mod matching;
pub mod notification;
pub mod post;
pub mod streak;
pub mod user;
pub mod wellness;

pub use challenge::{ChallengeRepository, ProofSubmission};
pub use conversation::ConversationRepository;
pub use group::{GroupRepository, GroupSettingsChanges, NewChallenge, NewGroup, WarningResult};
pub use matching::MatchRepository;
pub use notification::NotificationRepository;
pub use post::{NewPost, PostRepository, VoteCounts};
pub use streak::StreakRepository;
pub use user::{NewUser, ProfileChanges, UserRepository};
pub use wellness::WellnessRepository;
