//! Identity repository
//!
//! Lookup and lazy creation of user records keyed by wallet public key,
//! plus the audit-field updates performed after a completed login.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{AuthStatus, User};

/// Identity repository errors (infrastructure-level)
#[derive(Error, Debug)]
pub enum IdentityRepoError {
    #[error("Identity repository backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for IdentityRepoError {
    fn from(e: sqlx::Error) -> Self {
        IdentityRepoError::Backend(e.to_string())
    }
}

/// User record access keyed by public key
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_by_public_key(&self, public_key: &str)
        -> Result<Option<User>, IdentityRepoError>;

    /// Create a user record for a public key seen for the first time.
    /// Idempotent: if a record already exists for the key, it is returned.
    async fn create(&self, public_key: &str) -> Result<User, IdentityRepoError>;

    /// Record the outcome of a completed login attempt on the user record
    /// and clear any residual nonce reference it carries.
    async fn record_auth_result(
        &self,
        public_key: &str,
        status: AuthStatus,
        at: DateTime<Utc>,
    ) -> Result<(), IdentityRepoError>;
}

/// Placeholder contact address for users provisioned from a bare public key
fn placeholder_email(public_key: &str) -> String {
    format!("{}@wallet.local", public_key)
}

const USER_COLUMNS: &str =
    "id, public_key, email, nonce, last_auth_at, last_auth_status, created_at, updated_at";

/// Postgres-backed identity repository
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn find_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<User>, IdentityRepoError> {
        let user: Option<User> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_key = $1"
        ))
        .bind(public_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, public_key: &str) -> Result<User, IdentityRepoError> {
        // ON CONFLICT DO NOTHING keeps concurrent first logins for the same
        // key from creating two records; the loser reads the winner's row.
        let inserted: Option<User> = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, public_key, email, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (public_key) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(public_key)
        .bind(placeholder_email(public_key))
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(user) => Ok(user),
            None => self.find_by_public_key(public_key).await?.ok_or_else(|| {
                IdentityRepoError::Backend("user vanished during creation".to_string())
            }),
        }
    }

    async fn record_auth_result(
        &self,
        public_key: &str,
        status: AuthStatus,
        at: DateTime<Utc>,
    ) -> Result<(), IdentityRepoError> {
        sqlx::query(
            r#"
            UPDATE users
            SET nonce = NULL, last_auth_at = $2, last_auth_status = $3, updated_at = NOW()
            WHERE public_key = $1
            "#,
        )
        .bind(public_key)
        .bind(at)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory identity repository for tests and local development
#[derive(Default)]
pub struct InMemoryIdentityRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored user records
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn find_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<User>, IdentityRepoError> {
        Ok(self.users.read().await.get(public_key).cloned())
    }

    async fn create(&self, public_key: &str) -> Result<User, IdentityRepoError> {
        let mut users = self.users.write().await;

        if let Some(existing) = users.get(public_key) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            public_key: public_key.to_string(),
            email: Some(placeholder_email(public_key)),
            nonce: None,
            last_auth_at: None,
            last_auth_status: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(public_key.to_string(), user.clone());

        Ok(user)
    }

    async fn record_auth_result(
        &self,
        public_key: &str,
        status: AuthStatus,
        at: DateTime<Utc>,
    ) -> Result<(), IdentityRepoError> {
        let mut users = self.users.write().await;

        if let Some(user) = users.get_mut(public_key) {
            user.nonce = None;
            user.last_auth_at = Some(at);
            user.last_auth_status = Some(status);
            user.updated_at = at;
        }

        Ok(())
    }
}
