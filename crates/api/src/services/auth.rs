//! Account registration, login and token refresh.

use std::sync::Arc;

use domain::models::user::{AuthResponse, Profile, TokenPair};
use persistence::repositories::{NewUser, UserRepository};
use shared::jwt::{JwtConfig, JwtError};
use shared::password::{hash_password, verify_password, PasswordError};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Token error: {0}")]
    TokenError(#[from] JwtError),

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailAlreadyExists => ApiError::Conflict(err.to_string()),
            AuthError::InvalidCredentials | AuthError::InvalidRefreshToken => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::TokenError(e) => ApiError::Internal(format!("Token error: {}", e)),
            AuthError::PasswordError(e) => ApiError::Internal(format!("Password error: {}", e)),
            AuthError::DatabaseError(e) => ApiError::from(e),
        }
    }
}

/// Input for a new account, after request validation.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub display_name: Option<&'a str>,
    pub anonymous_username: Option<&'a str>,
    pub is_staff: bool,
}

pub struct AuthService {
    users: UserRepository,
    jwt: Arc<JwtConfig>,
}

/// Emails are matched case-insensitively and stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(pool: PgPool, jwt: Arc<JwtConfig>) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt,
        }
    }

    fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let access = self.jwt.issue_access_token(user_id)?;
        let refresh = self.jwt.issue_refresh_token(user_id)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer",
            expires_in: access.expires_in,
        })
    }

    /// Creates the account. Users without a chosen handle get a random one.
    pub async fn create_account(&self, input: Registration<'_>) -> Result<Profile, AuthError> {
        let email = normalize_email(input.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = hash_password(input.password)?;
        let generated;
        let anonymous_username = match input.anonymous_username {
            Some(name) => name,
            None => {
                generated = shared::names::anonymous_username();
                generated.as_str()
            }
        };

        let user = self
            .users
            .create_user(NewUser {
                email: &email,
                password_hash: &password_hash,
                display_name: input.display_name,
                anonymous_username: Some(anonymous_username),
                is_staff: input.is_staff,
                email_verified: input.is_staff,
            })
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                    AuthError::EmailAlreadyExists
                }
                _ => AuthError::DatabaseError(e),
            })?;

        Ok(user.into())
    }

    pub async fn register(&self, input: Registration<'_>) -> Result<AuthResponse, AuthError> {
        let user = self.create_account(input).await?;
        let tokens = self.issue_pair(user.id)?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(AuthResponse { user, tokens })
    }

    /// Verifies the password and records a login event.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.users.record_login(user.id).await?;
        let tokens = self.issue_pair(user.id)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(AuthResponse {
            user: user.into(),
            tokens,
        })
    }

    /// New access token for a valid refresh token. The refresh token itself
    /// is handed back unchanged.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        let user_id = claims
            .user_id()
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        // Deleted accounts cannot refresh.
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let access = self.jwt.issue_access_token(user_id)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh_token.to_string(),
            token_type: "Bearer",
            expires_in: access.expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Someone@Example.COM "), "someone@example.com");
    }

    #[test]
    fn test_auth_error_mapping() {
        use axum::http::StatusCode;
        assert_eq!(
            ApiError::from(AuthError::EmailAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidRefreshToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::TokenError(JwtError::InvalidToken)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(
            AuthError::EmailAlreadyExists.to_string(),
            "Email already registered"
        );
    }
}
