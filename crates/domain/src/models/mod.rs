//! Domain models for Spill.

pub mod admin;
pub mod challenge;
pub mod conversation;
pub mod group;
pub mod matching;
pub mod notification;
pub mod post;
pub mod streak;
pub mod user;
pub mod wellness;

pub use conversation::{Conversation, ConversationStatus, Message};
pub use group::{Group, GroupMember, GroupRole};
pub use matching::{Match, MatchRequest};
pub use notification::{Notification, NotificationKind};
pub use post::{Comment, Post, PostCategory, Report};
pub use streak::Streak;
pub use user::{MessagePreference, Profile, PublicProfile};
