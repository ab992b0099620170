//! End-to-end tests for the wallet authentication flow
//!
//! Drives the full axum router with in-memory collaborators: nonce request,
//! signed login, replay rejection and the failure paths a client can hit.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use http_body_util::BodyExt;
use rand::rngs::OsRng;
use serde_json::{json, Value};
use tower::ServiceExt;

use walletgate::auth::{
    verify_token, AuthService, InMemoryIdentityRepository, InMemoryNonceStore, JwtSessionIssuer,
    SignedAuthMessage,
};
use walletgate::state::AppState;

const TEST_SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
    identities: Arc<InMemoryIdentityRepository>,
}

fn test_app() -> TestApp {
    let nonces = Arc::new(InMemoryNonceStore::new(300));
    let identities = Arc::new(InMemoryIdentityRepository::new());
    let sessions = Arc::new(JwtSessionIssuer::new(TEST_SECRET, 900));
    let service = Arc::new(AuthService::new(nonces, identities.clone(), sessions));

    TestApp {
        router: walletgate::app(AppState::new(service, None)),
        identities,
    }
}

fn test_keypair() -> (SigningKey, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key = hex::encode(signing_key.verifying_key().as_bytes());
    (signing_key, public_key)
}

async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn request_nonce(app: &TestApp, address: &str) -> String {
    let (status, body) = post_json(&app.router, "/auth/nonce", json!({ "address": address })).await;
    assert_eq!(status, StatusCode::OK);
    body["nonce"].as_str().expect("nonce in response").to_string()
}

fn signed_login_body(key: &SigningKey, public_key: &str, nonce: &str) -> Value {
    let message = SignedAuthMessage {
        public_key: public_key.to_string(),
        nonce: nonce.to_string(),
        statement: None,
    };
    let signature = BASE64.encode(key.sign(message.canonical_payload().as_bytes()).to_bytes());
    json!({
        "message": serde_json::to_string(&message).unwrap(),
        "signature": signature,
    })
}

#[tokio::test]
async fn test_end_to_end_login_and_replay_rejection() {
    let app = test_app();
    let (key, public_key) = test_keypair();

    let nonce = request_nonce(&app, &public_key).await;
    let body = signed_login_body(&key, &public_key, &nonce);

    let (status, response) = post_json(&app.router, "/auth/login", body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let token = response["token"].as_str().expect("token in response");
    let claims = verify_token(token, TEST_SECRET).unwrap();
    assert_eq!(claims.wallet, public_key);

    // Replaying the identical (message, signature) pair must fail
    let (status, response) = post_json(&app.router, "/auth/login", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_foreign_signature_rejected_and_nonce_survives() {
    let app = test_app();
    let (key, public_key) = test_keypair();
    let (foreign_key, _) = test_keypair();

    let nonce = request_nonce(&app, &public_key).await;

    // Well-formed message, signature from an unrelated keypair
    let bad_body = signed_login_body(&foreign_key, &public_key, &nonce);
    let (status, _) = post_json(&app.router, "/auth/login", bad_body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The failed verification must not have consumed the nonce
    let good_body = signed_login_body(&key, &public_key, &nonce);
    let (status, _) = post_json(&app.router, "/auth/login", good_body).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_creates_identity_exactly_once() {
    let app = test_app();
    let (key, public_key) = test_keypair();

    for _ in 0..2 {
        let nonce = request_nonce(&app, &public_key).await;
        let body = signed_login_body(&key, &public_key, &nonce);
        let (status, _) = post_json(&app.router, "/auth/login", body).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.identities.len().await, 1);
}

#[tokio::test]
async fn test_malformed_message_is_bad_request() {
    let app = test_app();

    let (status, response) = post_json(
        &app.router,
        "/auth/login",
        json!({ "message": "not json at all", "signature": "AAAA" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_login_without_prior_nonce_is_unauthorized() {
    let app = test_app();
    let (key, public_key) = test_keypair();

    let body = signed_login_body(&key, &public_key, &"aa".repeat(32));
    let (status, _) = post_json(&app.router, "/auth/login", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_nonce_request_validates_address_shape() {
    let app = test_app();

    let (status, response) =
        post_json(&app.router, "/auth/nonce", json!({ "address": "too-short" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_new_nonce_supersedes_previous_one() {
    let app = test_app();
    let (key, public_key) = test_keypair();

    let first = request_nonce(&app, &public_key).await;
    let second = request_nonce(&app, &public_key).await;
    assert_ne!(first, second);

    let stale = signed_login_body(&key, &public_key, &first);
    let (status, _) = post_json(&app.router, "/auth/login", stale).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let fresh = signed_login_body(&key, &public_key, &second);
    let (status, _) = post_json(&app.router, "/auth/login", fresh).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "not configured");
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = test_app();

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
}
