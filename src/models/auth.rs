//! Authentication request/response DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request for an authentication nonce
#[derive(Debug, Deserialize, Validate)]
pub struct NonceRequest {
    /// Hex-encoded 32-byte ed25519 public key
    #[validate(length(equal = 64, message = "address must be a 64-character hex public key"))]
    pub address: String,
}

/// Response carrying the issued nonce
#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

/// Login request: the serialized signed message plus its signature
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// JSON-serialized `SignedAuthMessage`
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
    /// Base64-encoded ed25519 signature over the canonical payload
    #[validate(length(min = 1, message = "signature must not be empty"))]
    pub signature: String,
}

/// Login response carrying the session credential
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}
