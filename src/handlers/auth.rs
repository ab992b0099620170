//! Authentication HTTP handlers
//!
//! Endpoints for wallet-based challenge-response authentication.

use axum::{extract::State, Json};
use validator::Validate;

use crate::error::ApiError;
use crate::models::{LoginRequest, LoginResponse, NonceRequest, NonceResponse};
use crate::state::AppState;

/// POST /auth/nonce - Request a challenge nonce for a wallet address
pub async fn request_nonce(
    State(state): State<AppState>,
    Json(req): Json<NonceRequest>,
) -> Result<Json<NonceResponse>, ApiError> {
    req.validate()?;

    let nonce = state.auth_service.request_nonce(&req.address).await?;

    Ok(Json(NonceResponse { nonce }))
}

/// POST /auth/login - Verify a signed message and issue a session token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    req.validate()?;

    let credential = state.auth_service.login(&req.message, &req.signature).await?;

    Ok(Json(LoginResponse {
        token: credential.token,
    }))
}
