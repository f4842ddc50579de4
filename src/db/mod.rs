//! Database layer (Firestore, with an in-memory backend for local runs).

pub mod firestore;
mod memory;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    /// Squads, with goals and member progress embedded
    pub const SQUADS: &str = "squads";
    pub const RECOMMENDATION_REQUESTS: &str = "recommendation_requests";
}
