//! Authentication service
//!
//! The challenge-response protocol state machine: issues nonces, validates
//! signed login responses, resolves identity and triggers session issuance.
//! Per identity key the flow is Unchallenged -> Challenged -> (Verified |
//! Rejected) -> Consumed; a login with no prior challenge is rejected at
//! the nonce-consumption step like any other stale nonce.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use super::identity::{IdentityRepoError, IdentityRepository};
use super::message::{MessageError, SignedAuthMessage};
use super::nonce::{NonceStore, NonceStoreError};
use super::session::{SessionCredential, SessionError, SessionIssuer};
use crate::models::AuthStatus;

/// Auth protocol errors
///
/// The first three are attributable to the caller; `Infrastructure` maps to
/// a server-side failure after (or instead of) a successful proof. The
/// wording of the unauthorized variants is deliberately uninformative:
/// bad-key, bad-signature and absent/expired/mismatched-nonce cases are not
/// distinguished to the caller.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Malformed authentication message: {0}")]
    MalformedMessage(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid or expired nonce")]
    InvalidOrExpiredNonce,

    #[error("Authentication infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<NonceStoreError> for AuthError {
    fn from(e: NonceStoreError) -> Self {
        AuthError::Infrastructure(e.to_string())
    }
}

impl From<IdentityRepoError> for AuthError {
    fn from(e: IdentityRepoError) -> Self {
        AuthError::Infrastructure(e.to_string())
    }
}

impl From<SessionError> for AuthError {
    fn from(e: SessionError) -> Self {
        AuthError::Infrastructure(e.to_string())
    }
}

/// Challenge-response orchestrator over injected collaborators
pub struct AuthService {
    nonces: Arc<dyn NonceStore>,
    identities: Arc<dyn IdentityRepository>,
    sessions: Arc<dyn SessionIssuer>,
}

impl AuthService {
    pub fn new(
        nonces: Arc<dyn NonceStore>,
        identities: Arc<dyn IdentityRepository>,
        sessions: Arc<dyn SessionIssuer>,
    ) -> Self {
        Self {
            nonces,
            identities,
            sessions,
        }
    }

    /// Issue a fresh challenge nonce for a wallet address
    ///
    /// Supersedes any outstanding challenge for the same address.
    pub async fn request_nonce(&self, address: &str) -> Result<String, AuthError> {
        let nonce = self.nonces.issue(address).await?;
        tracing::debug!(address = %address, "Issued authentication nonce");
        Ok(nonce)
    }

    /// Verify a signed login message and issue a session credential
    pub async fn login(
        &self,
        raw_message: &str,
        signature: &str,
    ) -> Result<SessionCredential, AuthError> {
        // 1. Parse the self-describing message
        let message = SignedAuthMessage::parse(raw_message)
            .map_err(|e| AuthError::MalformedMessage(e.to_string()))?;

        // 2. Verify the signature before touching the nonce, so a failed
        //    verification leaves the challenge consumable by a correctly
        //    signed retry. Structural failures (undecodable key or
        //    signature) fail closed as an invalid signature.
        let valid = match message.verify(signature) {
            Ok(valid) => valid,
            Err(MessageError::Malformed(e)) => return Err(AuthError::MalformedMessage(e)),
            Err(MessageError::InvalidPublicKey(_))
            | Err(MessageError::InvalidSignatureFormat(_)) => false,
        };
        if !valid {
            tracing::debug!(public_key = %message.public_key, "Signature verification failed");
            return Err(AuthError::InvalidSignature);
        }

        // 3. Consume the nonce: atomic check-and-delete doubles as replay
        //    protection. Absent, expired and mismatched all look the same.
        if !self
            .nonces
            .consume(&message.public_key, &message.nonce)
            .await?
        {
            tracing::debug!(public_key = %message.public_key, "Nonce rejected");
            return Err(AuthError::InvalidOrExpiredNonce);
        }

        // 4. Resolve identity, creating it lazily on first login. From here
        //    on the nonce is spent; failures surface as infrastructure
        //    errors and the client must restart the flow.
        let user = match self
            .identities
            .find_by_public_key(&message.public_key)
            .await?
        {
            Some(user) => user,
            None => {
                let user = self.identities.create(&message.public_key).await?;
                tracing::info!(
                    public_key = %message.public_key,
                    user_id = %user.id,
                    "Provisioned new user"
                );
                user
            }
        };

        // 5. Issue the session credential and record the audit outcome
        let credential = self.sessions.issue(&user).await?;
        self.identities
            .record_auth_result(&message.public_key, AuthStatus::Success, Utc::now())
            .await?;

        tracing::info!(public_key = %message.public_key, user_id = %user.id, "Login succeeded");
        Ok(credential)
    }
}
