// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod goal;
pub mod recommendation;
pub mod squad;

pub use goal::{Goal, GoalError, GoalType, MemberProgress, NewGoal, Timeframe};
pub use recommendation::{
    NewRecommendationRequest, RecommendationError, RecommendationRequest, Recommender,
    RequestStatus, TransitionError,
};
pub use squad::{Squad, SquadError, SquadMember, SquadRole, SquadSummary};
