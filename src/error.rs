// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::{RecommendationError, SquadError, TransitionError};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Body of every error response: a stable machine-readable `error` code,
/// plus `details` for client errors. Server-side causes stay in the logs.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Conflict(_) => "conflict",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn client_details(&self) -> Option<String> {
        match self {
            AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        }

        let body = ErrorBody {
            error: self.code(),
            details: self.client_details(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<SquadError> for AppError {
    fn from(err: SquadError) -> Self {
        match err {
            SquadError::NotMember | SquadError::NotCreator => AppError::Forbidden(err.to_string()),
            SquadError::GoalNotFound(_) => AppError::NotFound(err.to_string()),
            SquadError::AlreadyMember | SquadError::Full(_) => AppError::Conflict(err.to_string()),
            SquadError::InvalidGoal(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<RecommendationError> for AppError {
    fn from(err: RecommendationError) -> Self {
        match err {
            RecommendationError::Transition(e) => e.into(),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
