// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Squad, goal and progress routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Goal, GoalType, NewGoal, Squad, SquadSummary, Timeframe};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Squad routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/squads", post(create_squad))
        .route("/api/squads/{squad_id}", get(get_squad))
        .route("/api/squads/{squad_id}/join", post(join_squad))
        .route("/api/squads/{squad_id}/summary", get(get_summary))
        .route("/api/squads/{squad_id}/goals", post(create_goal))
        .route(
            "/api/squads/{squad_id}/goals/{goal_id}",
            delete(delete_goal),
        )
        .route(
            "/api/squads/{squad_id}/goals/{goal_id}/progress",
            post(record_progress),
        )
}

/// Load a squad the caller belongs to, with time-dependent fields current.
async fn load_member_squad(state: &AppState, squad_id: &str, user: &AuthUser) -> Result<Squad> {
    let mut squad = state
        .db
        .get_squad(squad_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Squad {} not found", squad_id)))?;

    if !squad.is_member(&user.user_id) {
        return Err(AppError::Forbidden("Not a member of this squad".to_string()));
    }

    squad.refresh(Utc::now());
    Ok(squad)
}

// ─── Squads ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSquadRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 2, max = 50))]
    pub max_members: Option<u32>,
}

async fn create_squad(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateSquadRequest>,
) -> Result<(StatusCode, Json<Squad>)> {
    body.validate()?;
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Squad name must not be blank".to_string()));
    }

    let squad = Squad::new(
        &body.name,
        body.description,
        &user.user_id,
        body.max_members,
        Utc::now(),
    );
    state.db.upsert_squad(&squad).await?;

    tracing::info!(squad_id = %squad.id, creator = %user.user_id, "Squad created");
    Ok((StatusCode::CREATED, Json(squad)))
}

async fn get_squad(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(squad_id): Path<String>,
) -> Result<Json<Squad>> {
    Ok(Json(load_member_squad(&state, &squad_id, &user).await?))
}

async fn join_squad(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(squad_id): Path<String>,
) -> Result<Json<Squad>> {
    let now = Utc::now();
    let squad = state
        .db
        .update_squad_atomic(&squad_id, |squad| {
            squad.join(&user.user_id, now)?;
            Ok(squad.clone())
        })
        .await?;

    tracing::info!(squad_id = %squad_id, user_id = %user.user_id, "Member joined squad");
    Ok(Json(squad))
}

/// Squad summary response.
#[derive(Serialize)]
pub struct SummaryResponse {
    pub squad_id: String,
    #[serde(flatten)]
    pub summary: SquadSummary,
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(squad_id): Path<String>,
) -> Result<Json<SummaryResponse>> {
    let squad = load_member_squad(&state, &squad_id, &user).await?;
    Ok(Json(SummaryResponse {
        squad_id: squad.id.clone(),
        summary: squad.summarize(),
    }))
}

// ─── Goals ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    #[validate(range(min = 1, max = 10000))]
    pub target: u32,
    #[validate(range(min = 1, max = 10000))]
    pub individual_target: Option<u32>,
    pub timeframe: Timeframe,
    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,
    /// Defaults to the end of the timeframe
    pub end_date: Option<DateTime<Utc>>,
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(squad_id): Path<String>,
    Json(body): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Goal>)> {
    body.validate()?;

    let now = Utc::now();
    let new_goal = NewGoal {
        title: body.title,
        description: body.description,
        goal_type: body.goal_type,
        target: body.target,
        individual_target: body.individual_target,
        timeframe: body.timeframe,
        start_date: body.start_date.unwrap_or(now),
        end_date: body.end_date,
        created_by: user.user_id.clone(),
    };

    let goal = state
        .db
        .update_squad_atomic(&squad_id, |squad| {
            Ok(squad.add_goal(new_goal.clone(), now)?.clone())
        })
        .await?;

    tracing::info!(
        squad_id = %squad_id,
        goal_id = %goal.id,
        goal_type = ?goal.goal_type,
        target = goal.target,
        "Goal created"
    );
    Ok((StatusCode::CREATED, Json(goal)))
}

async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((squad_id, goal_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let now = Utc::now();
    state
        .db
        .update_squad_atomic(&squad_id, |squad| {
            squad.remove_goal(&goal_id, &user.user_id, now)?;
            Ok(())
        })
        .await?;

    tracing::info!(squad_id = %squad_id, goal_id = %goal_id, "Goal removed");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Progress ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RecordProgressRequest {
    /// Caller's cumulative progress on the goal
    #[validate(range(max = 100000))]
    pub progress: u32,
}

async fn record_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((squad_id, goal_id)): Path<(String, String)>,
    Json(body): Json<RecordProgressRequest>,
) -> Result<Json<Goal>> {
    body.validate()?;

    let now = Utc::now();
    let goal = state
        .db
        .update_squad_atomic(&squad_id, |squad| {
            Ok(squad
                .record_progress(&goal_id, &user.user_id, body.progress, now)?
                .clone())
        })
        .await?;

    tracing::info!(
        squad_id = %squad_id,
        goal_id = %goal_id,
        user_id = %user.user_id,
        progress = body.progress,
        percentage = goal.progress_percentage(),
        on_track = goal.is_on_track(),
        "Progress recorded"
    );
    Ok(Json(goal))
}
