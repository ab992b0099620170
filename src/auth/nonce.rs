//! Nonce challenge store
//!
//! Durable, expiring mapping from a wallet public key to its outstanding
//! authentication challenge. At most one active challenge exists per key;
//! issuing a new nonce supersedes the previous one, and a nonce is consumed
//! exactly once on successful login.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

/// Nonce store errors (all infrastructure-level; protocol outcomes such as
/// "nonce mismatch" are reported through return values, not errors)
#[derive(Error, Debug)]
pub enum NonceStoreError {
    #[error("Nonce store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for NonceStoreError {
    fn from(e: sqlx::Error) -> Self {
        NonceStoreError::Backend(e.to_string())
    }
}

/// Time source, injectable so expiry behavior is testable
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Challenge store contract
///
/// `issue` and `consume` must be linearizable per key: under concurrent
/// duplicate submissions of the same valid nonce, exactly one `consume`
/// succeeds.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Generate and persist a fresh nonce for the key, superseding any
    /// outstanding challenge, and return it.
    async fn issue(&self, identity_key: &str) -> Result<String, NonceStoreError>;

    /// Return the active, unexpired nonce for the key without consuming it.
    async fn peek(&self, identity_key: &str) -> Result<Option<String>, NonceStoreError>;

    /// Atomically check-and-delete the challenge for the key if it is
    /// unexpired and its nonce equals `presented`. Returns whether the
    /// challenge was consumed; a failed attempt has no side effect.
    async fn consume(&self, identity_key: &str, presented: &str) -> Result<bool, NonceStoreError>;

    /// Reclaim storage held by expired challenges. Hygiene only: expiry is
    /// always decided at `peek`/`consume` time, never by this sweep.
    async fn purge_expired(&self) -> Result<u64, NonceStoreError>;
}

/// Generate a cryptographically secure nonce (32 random bytes, hex)
pub fn generate_secure_nonce() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Postgres-backed nonce store
///
/// One row per wallet key in `auth_nonces`; the upsert on `issue` and the
/// single-statement conditional delete on `consume` give the per-key
/// atomicity the protocol requires.
#[derive(Clone)]
pub struct PgNonceStore {
    pool: PgPool,
    ttl_seconds: i64,
}

impl PgNonceStore {
    pub fn new(pool: PgPool, ttl_seconds: i64) -> Self {
        Self { pool, ttl_seconds }
    }
}

#[async_trait]
impl NonceStore for PgNonceStore {
    async fn issue(&self, identity_key: &str) -> Result<String, NonceStoreError> {
        let nonce = generate_secure_nonce();
        let expires_at = Utc::now() + Duration::seconds(self.ttl_seconds);

        sqlx::query(
            r#"
            INSERT INTO auth_nonces (wallet_address, nonce, expires_at, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (wallet_address)
            DO UPDATE SET nonce = EXCLUDED.nonce, expires_at = EXCLUDED.expires_at, created_at = NOW()
            "#,
        )
        .bind(identity_key)
        .bind(&nonce)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(nonce)
    }

    async fn peek(&self, identity_key: &str) -> Result<Option<String>, NonceStoreError> {
        let nonce: Option<String> = sqlx::query_scalar(
            r#"
            SELECT nonce FROM auth_nonces
            WHERE wallet_address = $1 AND expires_at > NOW()
            "#,
        )
        .bind(identity_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(nonce)
    }

    async fn consume(&self, identity_key: &str, presented: &str) -> Result<bool, NonceStoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM auth_nonces
            WHERE wallet_address = $1 AND nonce = $2 AND expires_at > NOW()
            "#,
        )
        .bind(identity_key)
        .bind(presented)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }

    async fn purge_expired(&self) -> Result<u64, NonceStoreError> {
        let purged = sqlx::query("DELETE FROM auth_nonces WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(purged)
    }
}

#[derive(Debug, Clone)]
struct StoredChallenge {
    nonce: String,
    expires_at: DateTime<Utc>,
}

/// In-memory nonce store for tests and local development
///
/// All state transitions happen under a single write lock, which makes
/// `consume` atomic with respect to concurrent duplicate submissions.
pub struct InMemoryNonceStore {
    entries: RwLock<HashMap<String, StoredChallenge>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemoryNonceStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self::with_clock(ttl_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
            clock,
        }
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn issue(&self, identity_key: &str) -> Result<String, NonceStoreError> {
        let nonce = generate_secure_nonce();
        let challenge = StoredChallenge {
            nonce: nonce.clone(),
            expires_at: self.clock.now() + self.ttl,
        };

        self.entries
            .write()
            .await
            .insert(identity_key.to_string(), challenge);

        Ok(nonce)
    }

    async fn peek(&self, identity_key: &str) -> Result<Option<String>, NonceStoreError> {
        let entries = self.entries.read().await;
        let now = self.clock.now();

        Ok(entries
            .get(identity_key)
            .filter(|challenge| challenge.expires_at > now)
            .map(|challenge| challenge.nonce.clone()))
    }

    async fn consume(&self, identity_key: &str, presented: &str) -> Result<bool, NonceStoreError> {
        let mut entries = self.entries.write().await;
        let now = self.clock.now();

        let matches = entries
            .get(identity_key)
            .map(|challenge| challenge.nonce == presented && challenge.expires_at > now)
            .unwrap_or(false);

        if matches {
            entries.remove(identity_key);
        }

        Ok(matches)
    }

    async fn purge_expired(&self) -> Result<u64, NonceStoreError> {
        let mut entries = self.entries.write().await;
        let now = self.clock.now();

        let before = entries.len();
        entries.retain(|_, challenge| challenge.expires_at > now);

        Ok((before - entries.len()) as u64)
    }
}
