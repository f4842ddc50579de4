// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session verification for the user API.
//!
//! Tokens are HS256 JWTs whose `sub` is the user ID. This service only
//! verifies them; sign-in lives in the frontend.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie set by the frontend.
pub const SESSION_COOKIE: &str = "squad_token";

const SESSION_TTL_DAYS: i64 = 30;

/// Session token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Caller identity, inserted as a request extension by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Reject requests without a valid session token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, request.headers()).ok_or(AppError::Unauthorized)?;
    let user = verify_jwt(&token, &state.config.jwt_signing_key)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// The cookie wins over the `Authorization` header when both are sent.
fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Check signature and expiry, and require a non-blank subject.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> Result<AuthUser, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(signing_key),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AppError::InvalidToken
    })?;

    let user_id = data.claims.sub.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidToken);
    }
    Ok(AuthUser {
        user_id: user_id.to_string(),
    })
}

/// Sign a session token for `user_id`. Used by tests and local tooling.
pub fn create_jwt(user_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: usize::try_from(now.timestamp())?,
        exp: usize::try_from((now + Duration::days(SESSION_TTL_DAYS)).timestamp())?,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const KEY: &[u8] = b"unit_test_key_with_enough_bytes!";

    #[test]
    fn test_round_trip() {
        let token = create_jwt("student-7", KEY).unwrap();
        assert_eq!(verify_jwt(&token, KEY).unwrap().user_id, "student-7");
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = create_jwt("student-7", KEY).unwrap();
        assert!(matches!(
            verify_jwt(&token, b"another_key_with_enough_bytes!!!"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_cookie_preferred_over_header() {
        let jar = CookieJar::new().add((SESSION_COOKIE, "from-cookie"));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );

        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-cookie"));
        assert_eq!(
            session_token(&CookieJar::new(), &headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_non_bearer_header_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&CookieJar::new(), &headers), None);
    }
}
