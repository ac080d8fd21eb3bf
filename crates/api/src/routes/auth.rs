//! Account registration, login and token refresh.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::user::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenPair};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::{AuthService, Registration};

/// Register a new account.
///
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let service = AuthService::new(state.pool.clone(), state.jwt.clone());
    let response = service
        .register(Registration {
            email: &request.email,
            password: &request.password,
            display_name: request.display_name.as_deref(),
            anonymous_username: request.anonymous_username.as_deref(),
            is_staff: false,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange credentials for a token pair.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    request.validate()?;

    let service = AuthService::new(state.pool.clone(), state.jwt.clone());
    let response = service.login(&request.email, &request.password).await?;
    Ok(Json(response))
}

/// Issue a fresh access token.
///
/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    request.validate()?;

    let service = AuthService::new(state.pool.clone(), state.jwt.clone());
    let tokens = service.refresh(&request.refresh_token).await?;
    info!("Access token refreshed");
    Ok(Json(tokens))
}
