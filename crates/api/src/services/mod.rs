//! Application services and external integrations.

pub mod auth;
pub mod media;
pub mod moderation;
pub mod perspective;

pub use auth::{AuthError, AuthService, Registration};
pub use media::{MediaError, MediaStore};
pub use perspective::PerspectiveClient;
