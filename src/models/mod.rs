//! Data models for the walletgate backend

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// User model
///
/// One record per wallet public key, created lazily on first successful
/// login and never deleted by the auth core. The `nonce` column is a
/// residual challenge reference cleared after every successful login.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub public_key: String,
    pub email: Option<String>,
    pub nonce: Option<String>,
    pub last_auth_at: Option<DateTime<Utc>>,
    pub last_auth_status: Option<AuthStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a completed login attempt, kept on the user record for audit
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "auth_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Success,
    Failure,
}
