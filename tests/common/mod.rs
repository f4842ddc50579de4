// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::Value;
use squad_tracker::config::Config;
use squad_tracker::db::FirestoreDb;
use squad_tracker::middleware::auth::create_jwt;
use squad_tracker::routes::create_router;
use squad_tracker::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::new(Config::default(), FirestoreDb::new_in_memory())
            .expect("Failed to build test state"),
    );
    (create_router(state.clone()), state)
}

/// Session token for `user_id` signed with the test key.
#[allow(dead_code)]
pub fn token_for(state: &AppState, user_id: &str) -> String {
    create_jwt(user_id, &state.config.jwt_signing_key).expect("Failed to sign test JWT")
}

/// Send a request and decode the JSON response body (Null when empty).
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
