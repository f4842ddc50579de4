// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP routing.
//!
//! Three surfaces share one router:
//! - `/health`, open to anyone
//! - `/tasks/*`, for the cron scheduler (shared secret)
//! - `/api/*`, for signed-in users (session JWT)

pub mod recommendations;
pub mod squads;
pub mod tasks;

use crate::middleware::{require_auth, require_tasks_auth, security::add_security_headers};
use crate::AppState;
use axum::http::{header, request::Parts, HeaderValue, Method, Uri};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_id: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_id: option_env!("BUILD_ID").unwrap_or("unknown").to_string(),
    })
}

/// Hosts allowed over plain http, on any port, for local development.
const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Whether a browser origin may call the API with credentials.
fn origin_allowed(origin: &str, frontend_url: &str) -> bool {
    if origin == frontend_url.trim_end_matches('/') {
        return true;
    }
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    uri.scheme_str() == Some("http")
        && uri.host().is_some_and(|host| LOCAL_HOSTS.contains(&host))
        && uri.path_and_query().is_none_or(|p| p.as_str() == "/")
        && !uri.authority().is_some_and(|a| a.as_str().contains('@'))
}

fn cors_layer(frontend_url: String) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|o| origin_allowed(o, &frontend_url))
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Build the complete router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let tasks = tasks::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_tasks_auth,
    ));

    let api = squads::routes()
        .merge(recommendations::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .merge(tasks)
        .merge(api)
        .layer(middleware::from_fn(add_security_headers))
        .layer(cors_layer(state.config.frontend_url.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
