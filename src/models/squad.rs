// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Squad model: a small group of students pursuing shared goals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::goal::{Goal, GoalError, NewGoal};

pub const DEFAULT_MAX_MEMBERS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SquadRole {
    Creator,
    Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadMember {
    pub user_id: String,
    pub role: SquadRole,
    pub joined_at: DateTime<Utc>,
}

/// Squad document, with its goals embedded.
///
/// Stored at: `squads/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub creator_id: String,
    pub members: Vec<SquadMember>,
    pub max_members: u32,
    #[serde(default)]
    pub goals: Vec<Goal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Roll-up of a squad's goals for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SquadSummary {
    pub total_goals: u32,
    pub completed_goals: u32,
    pub on_track_goals: u32,
    /// Distinct members flagged as needing help on any goal
    pub members_needing_help: u32,
    /// Mean goal percentage, 0 with no goals
    pub average_progress: f64,
}

impl Squad {
    /// Create a squad whose only member is its creator.
    pub fn new(
        name: &str,
        description: Option<String>,
        creator_id: &str,
        max_members: Option<u32>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description,
            creator_id: creator_id.to_string(),
            members: vec![SquadMember {
                user_id: creator_id.to_string(),
                role: SquadRole::Creator,
                joined_at: now,
            }],
            max_members: max_members.unwrap_or(DEFAULT_MAX_MEMBERS),
            goals: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }

    pub fn join(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<(), SquadError> {
        if self.is_member(user_id) {
            return Err(SquadError::AlreadyMember);
        }
        if self.members.len() as u32 >= self.max_members {
            return Err(SquadError::Full(self.max_members));
        }
        self.members.push(SquadMember {
            user_id: user_id.to_string(),
            role: SquadRole::Member,
            joined_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Add a goal. Only the squad creator may do this.
    pub fn add_goal(&mut self, new: NewGoal, now: DateTime<Utc>) -> Result<&Goal, SquadError> {
        if !self.is_creator(&new.created_by) {
            return Err(SquadError::NotCreator);
        }
        let goal = Goal::new(new, now)?;
        self.goals.push(goal);
        self.updated_at = now;
        Ok(&self.goals[self.goals.len() - 1])
    }

    /// Remove a goal. Only the squad creator may do this.
    pub fn remove_goal(
        &mut self,
        goal_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Goal, SquadError> {
        if !self.is_creator(user_id) {
            return Err(SquadError::NotCreator);
        }
        let index = self
            .goals
            .iter()
            .position(|g| g.id == goal_id)
            .ok_or_else(|| SquadError::GoalNotFound(goal_id.to_string()))?;
        self.updated_at = now;
        Ok(self.goals.remove(index))
    }

    pub fn goal(&self, goal_id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == goal_id)
    }

    /// Record a member's own progress on one of the squad's goals.
    pub fn record_progress(
        &mut self,
        goal_id: &str,
        member_id: &str,
        progress: u32,
        now: DateTime<Utc>,
    ) -> Result<&Goal, SquadError> {
        if !self.is_member(member_id) {
            return Err(SquadError::NotMember);
        }
        let goal = self
            .goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or_else(|| SquadError::GoalNotFound(goal_id.to_string()))?;
        goal.record_progress(member_id, progress, now);
        self.updated_at = now;
        Ok(goal)
    }

    /// Recompute time-dependent goal fields for a read at `now`.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        for goal in &mut self.goals {
            goal.refresh(now);
        }
    }

    pub fn summarize(&self) -> SquadSummary {
        if self.goals.is_empty() {
            return SquadSummary::default();
        }

        let mut needing_help = HashSet::new();
        let mut summary = SquadSummary {
            total_goals: self.goals.len() as u32,
            ..SquadSummary::default()
        };
        let mut percentage_sum = 0u64;

        for goal in &self.goals {
            if goal.is_completed() {
                summary.completed_goals += 1;
            }
            if goal.is_on_track() {
                summary.on_track_goals += 1;
            }
            percentage_sum += u64::from(goal.progress_percentage());
            needing_help.extend(
                goal.members()
                    .filter(|m| m.needs_help())
                    .map(|m| m.member_id.as_str()),
            );
        }

        summary.members_needing_help = needing_help.len() as u32;
        summary.average_progress = percentage_sum as f64 / self.goals.len() as f64;
        summary
    }
}

/// Errors from squad operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SquadError {
    #[error("Not a member of this squad")]
    NotMember,

    #[error("Only the squad creator can do this")]
    NotCreator,

    #[error("Already a member of this squad")]
    AlreadyMember,

    #[error("Squad is full ({0} members)")]
    Full(u32),

    #[error("Goal not found: {0}")]
    GoalNotFound(String),

    #[error(transparent)]
    InvalidGoal(#[from] GoalError),
}
