// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Squad goal model and member progress aggregation.
//!
//! A goal's aggregate fields (`current_progress`, `progress_percentage`,
//! `days_remaining`, `is_on_track`) are never set directly. Every mutation
//! goes through [`Goal::record_progress`] or [`Goal::refresh`], which
//! recompute them from `member_progress`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::time_utils::days_until;

/// Percentage at or above which a goal or member counts as on track.
pub const ON_TRACK_PERCENTAGE: u32 = 75;
/// Percentage below which a member is flagged as needing help.
pub const NEEDS_HELP_PERCENTAGE: u32 = 25;
/// Percentage at which a goal counts as completed.
pub const COMPLETED_PERCENTAGE: u32 = 100;

/// Trackable activity a goal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    ApplicationsStarted,
    ApplicationsCompleted,
    DocumentsCreated,
    PeerReviewsProvided,
    DaysActive,
    StreakDays,
    SquadActivity,
}

/// Period a goal runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Weekly,
    Monthly,
    Quarterly,
    Ongoing,
}

impl Timeframe {
    /// Default length of the timeframe, `None` for open-ended goals.
    pub fn default_duration(self) -> Option<Duration> {
        match self {
            Timeframe::Weekly => Some(Duration::days(7)),
            Timeframe::Monthly => Some(Duration::days(30)),
            Timeframe::Quarterly => Some(Duration::days(90)),
            Timeframe::Ongoing => None,
        }
    }
}

/// One member's contribution toward a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProgress {
    pub member_id: String,
    progress: u32,
    target: u32,
    percentage: u32,
    last_activity: DateTime<Utc>,
    needs_help: bool,
    is_on_track: bool,
}

impl MemberProgress {
    fn new(member_id: &str, target: u32, progress: u32, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            member_id: member_id.to_string(),
            progress: 0,
            target,
            percentage: 0,
            last_activity: now,
            needs_help: true,
            is_on_track: false,
        };
        record.set_progress(progress, now);
        record
    }

    fn set_progress(&mut self, progress: u32, now: DateTime<Utc>) {
        self.progress = progress;
        self.percentage = percentage_of(progress, self.target);
        self.last_activity = now;
        self.is_on_track = self.percentage >= ON_TRACK_PERCENTAGE;
        self.needs_help = self.percentage < NEEDS_HELP_PERCENTAGE;
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn needs_help(&self) -> bool {
        self.needs_help
    }

    pub fn is_on_track(&self) -> bool {
        self.is_on_track
    }
}

/// Parameters for creating a goal.
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub goal_type: GoalType,
    pub target: u32,
    pub individual_target: Option<u32>,
    pub timeframe: Timeframe,
    pub start_date: DateTime<Utc>,
    /// Defaults to `start_date` plus the timeframe length when absent.
    pub end_date: Option<DateTime<Utc>>,
    pub created_by: String,
}

/// A measurable, time-boxed squad goal.
///
/// Stored embedded in its squad document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub target: u32,
    #[serde(default)]
    pub individual_target: Option<u32>,
    pub timeframe: Timeframe,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,

    // ─── Derived ─────────────────────────────────────────────────
    #[serde(default)]
    current_progress: u32,
    #[serde(default)]
    progress_percentage: u32,
    #[serde(default)]
    days_remaining: i64,
    #[serde(default)]
    is_on_track: bool,
    #[serde(default)]
    member_progress: HashMap<String, MemberProgress>,
}

impl Goal {
    /// Create a goal with no recorded progress.
    pub fn new(new: NewGoal, now: DateTime<Utc>) -> Result<Self, GoalError> {
        if new.title.trim().is_empty() {
            return Err(GoalError::EmptyTitle);
        }
        if new.target == 0 {
            return Err(GoalError::InvalidTarget);
        }
        if new.individual_target == Some(0) {
            return Err(GoalError::InvalidTarget);
        }

        let end_date = match new.end_date {
            Some(end) => end,
            None => {
                let length = new
                    .timeframe
                    .default_duration()
                    .ok_or(GoalError::MissingEndDate)?;
                new.start_date
                    .checked_add_signed(length)
                    .ok_or(GoalError::InvalidDateRange)?
            }
        };
        if end_date <= new.start_date {
            return Err(GoalError::InvalidDateRange);
        }

        let mut goal = Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            description: new.description,
            goal_type: new.goal_type,
            target: new.target,
            individual_target: new.individual_target,
            timeframe: new.timeframe,
            start_date: new.start_date,
            end_date,
            created_by: new.created_by,
            created_at: now,
            current_progress: 0,
            progress_percentage: 0,
            days_remaining: 0,
            is_on_track: false,
            member_progress: HashMap::new(),
        };
        goal.refresh(now);
        Ok(goal)
    }

    /// Set a member's cumulative progress and recompute the aggregates.
    ///
    /// Creates the member record on first report, targeted at the goal's
    /// individual target (or the group target when unset).
    pub fn record_progress(&mut self, member_id: &str, progress: u32, now: DateTime<Utc>) {
        match self.member_progress.get_mut(member_id) {
            Some(record) => record.set_progress(progress, now),
            None => {
                let target = self.member_target();
                self.member_progress.insert(
                    member_id.to_string(),
                    MemberProgress::new(member_id, target, progress, now),
                );
            }
        }
        self.refresh(now);
    }

    /// Recompute every derived field from the member records and `now`.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.current_progress = self
            .member_progress
            .values()
            .fold(0u32, |sum, m| sum.saturating_add(m.progress));
        self.progress_percentage = percentage_of(self.current_progress, self.target);
        self.days_remaining = days_until(self.end_date, now);
        self.is_on_track = self.progress_percentage >= ON_TRACK_PERCENTAGE;
    }

    /// Target a newly reporting member is measured against.
    pub fn member_target(&self) -> u32 {
        self.individual_target.unwrap_or(self.target)
    }

    pub fn current_progress(&self) -> u32 {
        self.current_progress
    }

    pub fn progress_percentage(&self) -> u32 {
        self.progress_percentage
    }

    /// Days until `end_date` as of the last refresh. Negative means overdue.
    pub fn days_remaining(&self) -> i64 {
        self.days_remaining
    }

    pub fn is_on_track(&self) -> bool {
        self.is_on_track
    }

    pub fn is_completed(&self) -> bool {
        self.progress_percentage >= COMPLETED_PERCENTAGE
    }

    pub fn member(&self, member_id: &str) -> Option<&MemberProgress> {
        self.member_progress.get(member_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberProgress> {
        self.member_progress.values()
    }
}

/// `round(value / target * 100)`, or 0 for a zero target.
fn percentage_of(value: u32, target: u32) -> u32 {
    if target == 0 {
        return 0;
    }
    (f64::from(value) / f64::from(target) * 100.0).round() as u32
}

/// Errors from goal construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GoalError {
    #[error("Goal title must not be empty")]
    EmptyTitle,

    #[error("Goal targets must be positive")]
    InvalidTarget,

    #[error("Goal end date must be after its start date")]
    InvalidDateRange,

    #[error("Ongoing goals need an explicit end date")]
    MissingEndDate,
}
