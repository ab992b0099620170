//! Signed authentication message
//!
//! Parsing and ed25519 verification of the payload a wallet signs during
//! login. The message is self-describing: the public key used for
//! verification is the one embedded in the message itself.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Statement line used when the client does not provide one
pub const DEFAULT_STATEMENT: &str = "Sign this message to authenticate with walletgate.";

/// Errors that can occur while parsing or verifying a signed message
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Invalid public key encoding: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature encoding: {0}")]
    InvalidSignatureFormat(String),
}

/// The structured payload carried in a login request
///
/// The client serializes this as JSON, signs the canonical rendering of its
/// fields, and submits both the raw JSON and the base64 signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedAuthMessage {
    /// Hex-encoded 32-byte ed25519 public key of the claimed signer
    pub public_key: String,
    /// Nonce previously issued for this key
    pub nonce: String,
    /// Optional human-readable context line shown by the wallet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

impl SignedAuthMessage {
    /// Parse the raw JSON payload from a login request
    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        serde_json::from_str(raw).map_err(|e| MessageError::Malformed(e.to_string()))
    }

    /// Canonical byte representation that the wallet signs
    ///
    /// Rendered deterministically from the parsed fields, so tampering with
    /// any field changes the payload and fails verification.
    pub fn canonical_payload(&self) -> String {
        format!(
            "{}\n\nPublic key: {}\nNonce: {}",
            self.statement.as_deref().unwrap_or(DEFAULT_STATEMENT),
            self.public_key,
            self.nonce
        )
    }

    /// Verify a base64-encoded ed25519 signature over the canonical payload
    ///
    /// Returns `Ok(false)` for a cryptographically invalid signature. Errors
    /// only on structural failures: an undecodable embedded public key or a
    /// signature that is not 64 bytes of valid base64.
    pub fn verify(&self, signature_base64: &str) -> Result<bool, MessageError> {
        let verifying_key = decode_public_key(&self.public_key)?;

        let signature_bytes = BASE64
            .decode(signature_base64.trim())
            .map_err(|e| MessageError::InvalidSignatureFormat(e.to_string()))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|e| MessageError::InvalidSignatureFormat(e.to_string()))?;

        Ok(verifying_key
            .verify(self.canonical_payload().as_bytes(), &signature)
            .is_ok())
    }
}

/// Decode a hex-encoded 32-byte ed25519 public key
pub fn decode_public_key(public_key_hex: &str) -> Result<VerifyingKey, MessageError> {
    let bytes = hex::decode(public_key_hex)
        .map_err(|e| MessageError::InvalidPublicKey(e.to_string()))?;

    let key_bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
        MessageError::InvalidPublicKey(format!("expected 32 bytes, got {}", b.len()))
    })?;

    VerifyingKey::from_bytes(&key_bytes).map_err(|e| MessageError::InvalidPublicKey(e.to_string()))
}
