//! walletgate server
//!
//! Binary entrypoint: loads configuration, wires the Postgres-backed
//! collaborators into the auth service, and serves the HTTP API with
//! graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use walletgate::auth::{
    AuthService, JwtSessionIssuer, NonceStore, PgIdentityRepository, PgNonceStore,
};
use walletgate::config::Config;
use walletgate::state::AppState;
use walletgate::{db, middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = %config.environment.as_str(), "Starting walletgate");

    let db_pool = db::create_pool(&config).await?;
    db::run_migrations(&db_pool).await?;

    // Wire the auth collaborators
    let nonce_store = Arc::new(PgNonceStore::new(
        db_pool.clone(),
        config.auth_nonce_ttl_seconds,
    ));
    let identities = Arc::new(PgIdentityRepository::new(db_pool.clone()));
    let sessions = Arc::new(JwtSessionIssuer::new(
        config.jwt_secret.clone(),
        config.session_ttl_seconds,
    ));
    let auth_service = Arc::new(AuthService::new(
        nonce_store.clone(),
        identities,
        sessions,
    ));

    // Background sweep reclaiming expired challenges. Storage hygiene only:
    // expiry is enforced at consume time regardless of this task.
    let sweep_store = nonce_store.clone();
    let sweep_interval = config.nonce_sweep_interval_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            match sweep_store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired nonces"),
                Err(e) => tracing::warn!(error = %e, "Nonce sweep failed"),
            }
        }
    });

    let rate_limiter = middleware::RateLimiter::new(config.rate_limit_rps);

    let state = AppState::new(auth_service, Some(db_pool));
    let app = walletgate::app(state)
        .layer(axum::middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            middleware::rate_limit_layer(limiter)(req, next)
        }))
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins_str.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
