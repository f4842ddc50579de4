// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Squad Tracker API Server
//!
//! Serves squad goal tracking and recommendation request reminders.

use squad_tracker::{
    config::{Config, StorageBackend},
    db::FirestoreDb,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, storage = ?config.storage, "Starting Squad Tracker API");

    let db = match config.storage {
        StorageBackend::Firestore => FirestoreDb::new(&config.gcp_project_id).await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            FirestoreDb::new_in_memory()
        }
    };

    let state = Arc::new(AppState::new(config.clone(), db)?);
    let app = squad_tracker::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("squad_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
