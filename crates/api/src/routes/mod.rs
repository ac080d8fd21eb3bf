//! HTTP route handlers.

pub mod auth;
pub mod challenges;
pub mod conversations;
pub mod functions;
pub mod groups;
pub mod health;
pub mod matches;
pub mod moderation;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod streaks;
pub mod streams;
pub mod wellness;
