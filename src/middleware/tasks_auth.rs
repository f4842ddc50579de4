// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cron task authentication middleware.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer <CRON_SECRET>` for `/tasks/*` routes.
pub async fn require_tasks_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(presented) = presented else {
        tracing::warn!(path = %request.uri().path(), "Blocked tasks request without bearer token");
        return Err(StatusCode::FORBIDDEN);
    };

    if !secret_matches(presented, &state.config.cron_secret) {
        tracing::warn!(path = %request.uri().path(), "Blocked tasks request: invalid cron secret");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}

/// Constant-time comparison. An empty configured secret never matches.
fn secret_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}
