// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation letter requests and their status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::days_before;

/// Reminder schedule used when a request does not specify one.
pub const DEFAULT_REMINDER_INTERVALS: [u32; 3] = [7, 3, 1];

/// Longest reminder lead time, in days.
pub const MAX_REMINDER_INTERVAL_DAYS: u32 = 365;

/// Lifecycle of a recommendation request.
///
/// ```text
/// pending ──► sent ──► sent
///    │          │
///    └────┬─────┘
///         ▼
///  overdue | cancelled | received
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Sent,
    Overdue,
    Received,
    Cancelled,
}

impl RequestStatus {
    /// Statuses that still receive reminders and can be swept to overdue.
    pub const ACTIVE: [RequestStatus; 2] = [RequestStatus::Pending, RequestStatus::Sent];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Sent => "sent",
            RequestStatus::Overdue => "overdue",
            RequestStatus::Received => "received",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Validate a status change, returning the new status.
    pub fn transition(self, to: RequestStatus) -> Result<RequestStatus, TransitionError> {
        use RequestStatus::*;

        match (self, to) {
            (Pending, Sent) | (Sent, Sent) => Ok(to),
            (Pending | Sent, Overdue | Cancelled | Received) => Ok(to),
            _ => Err(TransitionError { from: self, to }),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cannot move request from {from} to {to}")]
pub struct TransitionError {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

/// Person asked to write the letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommender {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Parameters for creating a request.
#[derive(Debug, Clone)]
pub struct NewRecommendationRequest {
    pub student_id: String,
    pub student_name: String,
    pub recommender: Recommender,
    pub purpose: String,
    pub message: Option<String>,
    pub deadline: DateTime<Utc>,
    /// Days before the deadline; defaults to [`DEFAULT_REMINDER_INTERVALS`].
    pub reminder_intervals: Option<Vec<u32>>,
}

/// A student's request for a recommendation letter.
///
/// Stored at: `recommendation_requests/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub recommender: Recommender,
    /// Scholarship or program the letter supports
    pub purpose: String,
    #[serde(default)]
    pub message: Option<String>,
    pub deadline: DateTime<Utc>,
    /// Days before the deadline, strictly descending
    pub reminder_intervals: Vec<u32>,
    #[serde(default)]
    pub next_reminder_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_reminder_sent: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminders_sent: u32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl RecommendationRequest {
    /// Create a pending request with its first reminder scheduled.
    pub fn new(
        new: NewRecommendationRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, RecommendationError> {
        if new.deadline <= now {
            return Err(RecommendationError::DeadlineNotInFuture);
        }

        let reminder_intervals = normalize_intervals(
            new.reminder_intervals
                .unwrap_or_else(|| DEFAULT_REMINDER_INTERVALS.to_vec()),
        )?;
        let next_reminder_date = match reminder_intervals.first() {
            Some(&days) => Some(
                days_before(new.deadline, days).ok_or(RecommendationError::InvalidInterval)?,
            ),
            None => None,
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: new.student_id,
            student_name: new.student_name,
            recommender: new.recommender,
            purpose: new.purpose,
            message: new.message,
            deadline: new.deadline,
            reminder_intervals,
            next_reminder_date,
            last_reminder_sent: None,
            reminders_sent: 0,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            received_at: None,
        })
    }

    /// Move to `to` if the state machine allows it.
    pub fn set_status(
        &mut self,
        to: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.status = self.status.transition(to)?;
        if to == RequestStatus::Received {
            self.received_at = Some(now);
        }
        if !to.is_active() {
            self.next_reminder_date = None;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Record a notification that went out at `now` outside the reminder
    /// schedule (the initial request email).
    pub fn mark_notified(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.status = self.status.transition(RequestStatus::Sent)?;
        self.last_reminder_sent = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// Sort descending and drop duplicates. Intervals outside
/// `1..=MAX_REMINDER_INTERVAL_DAYS` are rejected.
fn normalize_intervals(mut intervals: Vec<u32>) -> Result<Vec<u32>, RecommendationError> {
    if intervals
        .iter()
        .any(|&days| days == 0 || days > MAX_REMINDER_INTERVAL_DAYS)
    {
        return Err(RecommendationError::InvalidInterval);
    }
    intervals.sort_unstable_by(|a, b| b.cmp(a));
    intervals.dedup();
    Ok(intervals)
}

/// Errors from recommendation request operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecommendationError {
    #[error("Deadline must be in the future")]
    DeadlineNotInFuture,

    #[error("Reminder intervals must be between 1 and 365 days")]
    InvalidInterval,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}
