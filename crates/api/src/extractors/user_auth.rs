//! Bearer token authentication.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use shared::jwt::JwtError;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// The caller, as proven by a valid access token.
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub user_id: Uuid,
    /// Token id, logged for session tracing.
    pub jti: String,
}

/// Token part of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<UserAuth, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| {
        ApiError::Unauthorized("Missing or malformed Authorization header".to_string())
    })?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| match e {
        JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
        _ => ApiError::Unauthorized("Invalid token".to_string()),
    })?;

    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

    Ok(UserAuth {
        user_id,
        jti: claims.jti,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(auth.clone());
        }
        let auth = authenticate(&parts.headers, state)?;
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers_with("bearer   xyz ")), Some("xyz"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers_with("Bearer")), None);
        assert_eq!(bearer_token(&headers_with("Bearer  ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
