//! JWT service for token generation and validation
//!
//! Access and refresh tokens are HS256-signed with two distinct secrets.
//! Tokens are stateless: nothing is persisted server-side, so an issued token
//! stays valid until it expires.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret for access tokens
    pub access_token_secret: String,
    /// HMAC secret for refresh tokens, must differ from the access secret
    pub refresh_token_secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: u64,
}

fn default_access_token_expiry() -> u64 {
    900
}

fn default_refresh_token_expiry() -> u64 {
    604800
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Token errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to get current time: {0}")]
    Clock(String),
}

#[derive(Clone)]
struct SigningKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// JWT service
#[derive(Clone)]
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
    config: JwtConfig,
}

impl TokenService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        TokenService {
            access: SigningKeys::from_secret(&config.access_token_secret),
            refresh: SigningKeys::from_secret(&config.refresh_token_secret),
            validation,
            config,
        }
    }

    /// Generate an access token for a user
    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(
            user_id,
            TokenType::Access,
            self.config.access_token_expiry,
            &self.access,
        )
    }

    /// Generate a refresh token for a user
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(
            user_id,
            TokenType::Refresh,
            self.config.refresh_token_expiry,
            &self.refresh,
        )
    }

    /// Validate an access token and return the user it was issued to
    pub fn verify_access_token(&self, token: &str) -> Result<Uuid, TokenError> {
        self.verify(token, TokenType::Access, &self.access)
    }

    /// Validate a refresh token and return the user it was issued to
    pub fn verify_refresh_token(&self, token: &str) -> Result<Uuid, TokenError> {
        self.verify(token, TokenType::Refresh, &self.refresh)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        lifetime: u64,
        keys: &SigningKeys,
    ) -> Result<String, TokenError> {
        let now = now_secs()?;
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now.saturating_add(lifetime),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding_key)
            .map_err(TokenError::Encoding)
    }

    fn verify(
        &self,
        token: &str,
        expected: TokenType,
        keys: &SigningKeys,
    ) -> Result<Uuid, TokenError> {
        let token_data =
            decode::<Claims>(token, &keys.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::InvalidSignature,
                }
            })?;

        if token_data.claims.token_type != expected {
            return Err(TokenError::InvalidSignature);
        }

        Ok(token_data.claims.sub)
    }
}

fn now_secs() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TokenError::Clock(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(JwtConfig {
            access_token_secret: "access-secret-for-tests".to_string(),
            refresh_token_secret: "refresh-secret-for-tests".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = service();
        let user_id = Uuid::new_v4();

        let token = service.issue_access_token(user_id).unwrap();
        assert_eq!(service.verify_access_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let service = service();
        let user_id = Uuid::new_v4();

        let token = service.issue_refresh_token(user_id).unwrap();
        assert_eq!(service.verify_refresh_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let service = service();
        let user_id = Uuid::new_v4();

        let access = service.issue_access_token(user_id).unwrap();
        let refresh = service.issue_refresh_token(user_id).unwrap();

        assert!(matches!(
            service.verify_refresh_token(&access),
            Err(TokenError::InvalidSignature)
        ));
        assert!(matches!(
            service.verify_access_token(&refresh),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = TokenService::new(JwtConfig {
            access_token_secret: "some-other-secret".to_string(),
            refresh_token_secret: "yet-another-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
        });
        let token = other.issue_access_token(Uuid::new_v4()).unwrap();

        assert!(matches!(
            service().verify_access_token(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_oversized_lifetime_saturates() {
        let service = TokenService::new(JwtConfig {
            access_token_secret: "access-secret-for-tests".to_string(),
            refresh_token_secret: "refresh-secret-for-tests".to_string(),
            access_token_expiry: u64::MAX,
            refresh_token_expiry: u64::MAX,
        });
        let user_id = Uuid::new_v4();

        let token = service.issue_access_token(user_id).unwrap();
        assert_eq!(service.verify_access_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            service().verify_access_token("not.a.token"),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = service();
        let now = now_secs().unwrap();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now - 7200,
            exp: now - 3600,
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &service.access.encoding_key,
        )
        .unwrap();

        assert!(matches!(
            service.verify_access_token(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_new_token_does_not_retire_old_one() {
        let service = service();
        let user_id = Uuid::new_v4();

        let first = service.issue_access_token(user_id).unwrap();
        let _second = service.issue_access_token(user_id).unwrap();

        assert_eq!(service.verify_access_token(&first).unwrap(), user_id);
    }
}
