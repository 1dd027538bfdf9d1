//! # Authentication
//!
//! HS256 access tokens for API users, argon2 password hashing and HMAC
//! signatures for worker webhooks.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderValue;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AuthConfig;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("JWT processing error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthFormat,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Missing signature")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Access token claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AuthError::InvalidToken("subject is not a user id".to_string()))
    }
}

/// Issues and validates user access tokens
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry: Duration,
}

impl fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("token_expiry", &self.token_expiry)
            .finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_expiry: Duration::minutes(config.token_expiry_minutes),
        }
    }

    pub fn generate_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.token_expiry).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        debug!(user_id = %user_id, exp = claims.exp, "Access token issued");
        Ok(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!(error = %e, "Access token rejected");
            AuthError::JwtError(e)
        })?;
        Ok(data.claims)
    }

    /// Extract bearer token from Authorization header
    pub fn extract_bearer_token(auth_header: &HeaderValue) -> Result<&str, AuthError> {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AuthError::InvalidAuthFormat)?;

        let (scheme, token) = auth_str
            .split_once(' ')
            .ok_or(AuthError::InvalidAuthFormat)?;
        if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
            return Err(AuthError::InvalidAuthFormat);
        }
        Ok(token.trim())
    }
}

/// Hash a password into an argon2 PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::b64_encode(Uuid::new_v4().as_bytes())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Check a password against a stored PHC string; malformed hashes never match
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is not a valid PHC string");
            false
        }
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body`, as sent in `X-Signature`
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::InvalidSignature)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a webhook signature. No secret means signatures are not enforced.
pub fn verify_signature(
    secret: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), AuthError> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return Ok(());
    };
    let signature = signature.ok_or(AuthError::MissingSignature)?;
    let expected = hex::decode(signature.trim()).map_err(|_| AuthError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| AuthError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator(minutes: i64) -> JwtAuthenticator {
        JwtAuthenticator::from_config(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_expiry_minutes: minutes,
        })
    }

    #[test]
    fn test_token_round_trip() {
        let auth = authenticator(60);
        let user_id = Uuid::new_v4();
        let token = auth.generate_token(user_id).unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = authenticator(-5);
        let token = auth.generate_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::JwtError(_))
        ));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other = JwtAuthenticator::from_config(&AuthConfig {
            jwt_secret: "other".to_string(),
            token_expiry_minutes: 60,
        });
        let token = other.generate_token(Uuid::new_v4()).unwrap();
        assert!(authenticator(60).validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        let header = HeaderValue::from_static("Bearer abc.def");
        assert_eq!(JwtAuthenticator::extract_bearer_token(&header).unwrap(), "abc.def");

        let header = HeaderValue::from_static("Basic dXNlcg==");
        assert!(JwtAuthenticator::extract_bearer_token(&header).is_err());

        let header = HeaderValue::from_static("Bearer ");
        assert!(JwtAuthenticator::extract_bearer_token(&header).is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_signature_verification() {
        let body = br#"{"task_id":"x"}"#;
        let signature = sign_payload("s3cret", body).unwrap();

        assert!(verify_signature(None, body, None).is_ok());
        assert!(verify_signature(Some("s3cret"), body, Some(&signature)).is_ok());
        assert!(matches!(
            verify_signature(Some("s3cret"), body, None),
            Err(AuthError::MissingSignature)
        ));
        assert!(matches!(
            verify_signature(Some("s3cret"), b"tampered", Some(&signature)),
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            verify_signature(Some("s3cret"), body, Some("zz")),
            Err(AuthError::InvalidSignature)
        ));
    }
}
