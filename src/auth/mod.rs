//! Authentication module for walletgate
//!
//! Wallet-based challenge-response authentication:
//! - nonce challenges with TTL and single-use consumption
//! - ed25519 verification of self-describing signed messages
//! - identity resolution and JWT session issuance

pub mod identity;
pub mod message;
pub mod nonce;
pub mod service;
pub mod session;

pub use identity::{IdentityRepository, InMemoryIdentityRepository, PgIdentityRepository};
pub use message::SignedAuthMessage;
pub use nonce::{InMemoryNonceStore, NonceStore, PgNonceStore};
pub use service::{AuthError, AuthService};
pub use session::{verify_token, Claims, JwtSessionIssuer, SessionCredential, SessionIssuer};
