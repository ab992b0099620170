//! Route definitions for the walletgate API

mod auth;

pub use auth::auth_routes;

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

/// Routes that are not part of the auth protocol surface
pub fn service_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
}
