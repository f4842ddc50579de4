// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cron-triggered task routes.
//!
//! Called by the scheduler, not by users. `require_tasks_auth` guards them
//! with the shared cron secret.

use crate::error::AppError;
use crate::services::{DispatchSummary, SweepSummary};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use std::sync::Arc;

/// Task routes (called by the cron scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/send-reminders", post(send_reminders))
        .route("/tasks/sweep-overdue", post(sweep_overdue))
}

/// Run one reminder pass over active recommendation requests.
async fn send_reminders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DispatchSummary>, AppError> {
    tracing::info!("Starting reminder run");
    let summary = state.reminder_service.run(Utc::now()).await?;
    Ok(Json(summary))
}

/// Flip active requests whose deadline has passed to overdue.
async fn sweep_overdue(State(state): State<Arc<AppState>>) -> Result<Json<SweepSummary>, AppError> {
    let summary = state.reminder_service.sweep(Utc::now()).await?;
    Ok(Json(summary))
}
