// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation request routes for students.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{NewRecommendationRequest, RecommendationRequest, Recommender, RequestStatus};
use crate::services::scheduler::{urgency_level, UrgencyLevel};
use crate::time_utils::days_until;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/recommendations",
            post(create_request).get(list_requests),
        )
        .route("/api/recommendations/{id}", get(get_request))
        .route("/api/recommendations/{id}/cancel", post(cancel_request))
        .route("/api/recommendations/{id}/received", post(mark_received))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecommenderInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecommendationRequest {
    #[validate(length(min = 1, max = 100))]
    pub student_name: String,
    #[validate(nested)]
    pub recommender: RecommenderInput,
    #[validate(length(min = 1, max = 200))]
    pub purpose: String,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    pub deadline: DateTime<Utc>,
    /// Days before the deadline to remind; defaults to 7, 3, 1
    #[validate(length(max = 10))]
    pub reminder_intervals: Option<Vec<u32>>,
}

/// A request plus its urgency as of the response time.
#[derive(Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: RecommendationRequest,
    pub days_until_deadline: i64,
    pub urgency: UrgencyLevel,
}

impl RequestView {
    fn new(request: RecommendationRequest, now: DateTime<Utc>) -> Self {
        let days_until_deadline = days_until(request.deadline, now);
        Self {
            request,
            days_until_deadline,
            urgency: urgency_level(days_until_deadline),
        }
    }
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateRecommendationRequest>,
) -> Result<(StatusCode, Json<RequestView>)> {
    body.validate()?;

    let now = Utc::now();
    let mut request = RecommendationRequest::new(
        NewRecommendationRequest {
            student_id: user.user_id.clone(),
            student_name: body.student_name,
            recommender: Recommender {
                name: body.recommender.name,
                email: body.recommender.email,
                title: body.recommender.title,
            },
            purpose: body.purpose,
            message: body.message,
            deadline: body.deadline,
            reminder_intervals: body.reminder_intervals,
        },
        now,
    )?;

    state
        .reminder_service
        .notify_created(&mut request, now)
        .await;
    state.db.upsert_request(&request).await?;

    tracing::info!(
        request_id = %request.id,
        student_id = %user.user_id,
        status = %request.status,
        deadline = %request.deadline,
        "Recommendation request created"
    );

    Ok((StatusCode::CREATED, Json(RequestView::new(request, now))))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<RequestView>>> {
    let now = Utc::now();
    let requests = state.db.list_requests_for_student(&user.user_id).await?;
    Ok(Json(
        requests
            .into_iter()
            .map(|r| RequestView::new(r, now))
            .collect(),
    ))
}

/// Load a request owned by the caller. Other students' requests read as
/// missing.
async fn load_owned(state: &AppState, id: &str, user: &AuthUser) -> Result<RecommendationRequest> {
    match state.db.get_request(id).await? {
        Some(request) if request.student_id == user.user_id => Ok(request),
        _ => Err(AppError::NotFound(format!("Recommendation request {} not found", id))),
    }
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<RequestView>> {
    let request = load_owned(&state, &id, &user).await?;
    Ok(Json(RequestView::new(request, Utc::now())))
}

async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<RequestView>> {
    update_status(&state, &id, &user, RequestStatus::Cancelled).await
}

async fn mark_received(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<RequestView>> {
    update_status(&state, &id, &user, RequestStatus::Received).await
}

async fn update_status(
    state: &AppState,
    id: &str,
    user: &AuthUser,
    to: RequestStatus,
) -> Result<Json<RequestView>> {
    let now = Utc::now();
    let mut request = load_owned(state, id, user).await?;
    let from = request.status;

    request.set_status(to, now)?;
    state.db.upsert_request(&request).await?;

    tracing::info!(request_id = %id, from = %from, to = %to, "Recommendation status changed");
    Ok(Json(RequestView::new(request, now)))
}
