//! Session issuance
//!
//! Mints the credential returned to a client after a successful login.
//! The core treats the credential as an opaque output value; the JWT
//! implementation here is one issuer, not a stored entity.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;

/// Session issuance errors (infrastructure-level)
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,
}

/// Opaque session credential handed back to the client
#[derive(Debug, Clone)]
pub struct SessionCredential {
    pub token: String,
    pub expires_in: i64,
}

/// Issues a session credential for a resolved identity
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn issue(&self, user: &User) -> Result<SessionCredential, SessionError>;
}

/// JWT claims for session tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Wallet public key the session was proven with
    pub wallet: String,
    /// JWT ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// HS256 JWT session issuer
#[derive(Clone)]
pub struct JwtSessionIssuer {
    secret: String,
    ttl_seconds: i64,
}

impl JwtSessionIssuer {
    pub fn new(secret: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds,
        }
    }
}

#[async_trait]
impl SessionIssuer for JwtSessionIssuer {
    async fn issue(&self, user: &User) -> Result<SessionCredential, SessionError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_seconds);

        let claims = Claims {
            sub: user.id.to_string(),
            wallet: user.public_key.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SessionError::EncodingFailed(e.to_string()))?;

        Ok(SessionCredential {
            token,
            expires_in: self.ttl_seconds,
        })
    }
}

/// Verify and decode a session token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, SessionError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        if e.to_string().contains("ExpiredSignature") {
            SessionError::TokenExpired
        } else {
            SessionError::DecodingFailed(e.to_string())
        }
    })?;

    Ok(token_data.claims)
}
