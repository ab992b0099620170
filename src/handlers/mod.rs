//! API handlers for the walletgate backend

pub mod auth;
pub mod health;

pub use auth::{login, request_nonce};
pub use health::{health_check, root};
