//! Access and refresh tokens for Spill sessions.
//!
//! Production deployments sign with RS256. A shared-secret HS256 signer is
//! available for local development and test harnesses.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default leeway in seconds for clock skew tolerance.
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub token_type: TokenType,
}

impl Claims {
    /// Parses the subject as a user id.
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidToken)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// A freshly signed token together with its id.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_in: i64,
}

/// Signs and validates session tokens.
#[derive(Clone)]
pub struct JwtConfig {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    pub access_token_expiry_secs: i64,
    pub refresh_token_expiry_secs: i64,
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.refresh_token_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}

impl JwtConfig {
    /// Builds an RS256 signer from a PEM key pair.
    pub fn from_rsa_pem(
        private_key_pem: &str,
        public_key_pem: &str,
        access_token_expiry_secs: i64,
        refresh_token_expiry_secs: i64,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding_key,
            decoding_key,
            access_token_expiry_secs,
            refresh_token_expiry_secs,
            leeway_secs,
        })
    }

    /// Builds an HS256 signer from a shared secret.
    pub fn from_secret(
        secret: &str,
        access_token_expiry_secs: i64,
        refresh_token_expiry_secs: i64,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        if secret.len() < 16 {
            return Err(JwtError::InvalidKey(
                "Secret must be at least 16 bytes".to_string(),
            ));
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry_secs,
            refresh_token_expiry_secs,
            leeway_secs,
        })
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<IssuedToken, JwtError> {
        self.issue(user_id, TokenType::Access, self.access_token_expiry_secs)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<IssuedToken, JwtError> {
        self.issue(user_id, TokenType::Refresh, self.refresh_token_expiry_secs)
    }

    fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        expiry_secs: i64,
    ) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let jti = Uuid::new_v4().to_string();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
            token_type,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(IssuedToken {
            token,
            jti,
            expires_in: expiry_secs,
        })
    }

    fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

        if data.claims.token_type != expected {
            return Err(JwtError::InvalidToken);
        }
        Ok(data.claims)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(token, TokenType::Access)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(token, TokenType::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> JwtConfig {
        JwtConfig::from_secret("spill-test-secret-0123456789", 900, 86_400, 0).unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let config = signer();
        let user_id = Uuid::new_v4();

        let issued = config.issue_access_token(user_id).unwrap();
        let claims = config.validate_access_token(&issued.token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(issued.expires_in, 900);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let config = signer();
        let issued = config.issue_refresh_token(Uuid::new_v4()).unwrap();

        assert!(matches!(
            config.validate_access_token(&issued.token),
            Err(JwtError::InvalidToken)
        ));
        assert!(config.validate_refresh_token(&issued.token).is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut config = signer();
        config.access_token_expiry_secs = -120;
        let issued = config.issue_access_token(Uuid::new_v4()).unwrap();

        assert!(matches!(
            config.validate_access_token(&issued.token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issued = signer().issue_access_token(Uuid::new_v4()).unwrap();
        let other = JwtConfig::from_secret("another-secret-abcdefghijk", 900, 900, 0).unwrap();

        assert!(matches!(
            other.validate_access_token(&issued.token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            JwtConfig::from_secret("short", 900, 900, 0),
            Err(JwtError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_invalid_pem_rejected() {
        let result = JwtConfig::from_rsa_pem("not a key", "not a key", 900, 900, 30);
        assert!(matches!(result, Err(JwtError::InvalidKey(_))));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let debug = format!("{:?}", signer());
        assert!(!debug.contains("spill-test-secret"));
        assert!(debug.contains("HS256"));
    }
}
