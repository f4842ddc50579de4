// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store used when Firestore is not configured.

use dashmap::DashMap;

use crate::models::{RecommendationRequest, Squad};

/// Documents keyed by id, one map per collection.
#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) squads: DashMap<String, Squad>,
    pub(super) requests: DashMap<String, RecommendationRequest>,
}
