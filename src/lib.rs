//! walletgate library
//!
//! Wallet-based challenge-response authentication: a client proves
//! ownership of an ed25519 keypair by signing a server-issued nonce; the
//! server verifies the proof, resolves the identity to a user record and
//! issues a JWT session credential.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;

/// Build the application router over a prepared state
///
/// Config-dependent layers (rate limiting, CORS) are added by the binary;
/// everything here is shared with the integration tests.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::service_routes())
        .merge(routes::auth_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}
