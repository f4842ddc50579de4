// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Squads (with embedded goals and member progress)
//! - Recommendation requests (reminder scheduling state)
//!
//! The same handle can instead be backed by an in-memory store, which is
//! what local development and the test suite use.

use std::sync::Arc;

use crate::db::collections;
use crate::db::memory::MemoryStore;
use crate::error::AppError;
use crate::models::{RecommendationRequest, RequestStatus, Squad};

/// Database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator needs an unauthenticated connection.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory database. Contents are lost on drop.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    // ─── Squad Operations ────────────────────────────────────────

    /// Get a squad by ID.
    pub async fn get_squad(&self, squad_id: &str) -> Result<Option<Squad>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::SQUADS)
                .obj()
                .one(squad_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.squads.get(squad_id).map(|s| s.value().clone())),
        }
    }

    /// Create or replace a squad.
    pub async fn upsert_squad(&self, squad: &Squad) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::SQUADS)
                    .document_id(&squad.id)
                    .object(squad)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => {
                store.squads.insert(squad.id.clone(), squad.clone());
            }
        }
        Ok(())
    }

    /// Read-modify-write a squad atomically.
    ///
    /// On Firestore the read and write share a transaction. A commit that
    /// loses to a concurrent writer is retried with fresh data, up to
    /// [`TRANSACTION_ATTEMPTS`] times, so `mutate` may run more than once.
    /// If `mutate` fails nothing is written.
    pub async fn update_squad_atomic<T, F>(
        &self,
        squad_id: &str,
        mut mutate: F,
    ) -> Result<T, AppError>
    where
        F: FnMut(&mut Squad) -> Result<T, AppError> + Send,
        T: Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let mut attempt = 1;
                loop {
                    match update_squad_in_transaction(client, squad_id, &mut mutate).await? {
                        Commit::Done(value) => return Ok(value),
                        Commit::Conflict(e) if attempt < TRANSACTION_ATTEMPTS => {
                            tracing::warn!(
                                squad_id,
                                attempt,
                                error = %e,
                                "Squad transaction conflict, retrying"
                            );
                            attempt += 1;
                        }
                        Commit::Conflict(e) => {
                            return Err(AppError::Database(format!(
                                "Transaction commit failed after {} attempts: {}",
                                attempt, e
                            )));
                        }
                    }
                }
            }
            Backend::Memory(store) => {
                let mut entry = store
                    .squads
                    .get_mut(squad_id)
                    .ok_or_else(|| AppError::NotFound(format!("Squad {} not found", squad_id)))?;
                let mut squad = entry.value().clone();
                let value = mutate(&mut squad)?;
                *entry = squad;
                Ok(value)
            }
        }
    }

    // ─── Recommendation Request Operations ───────────────────────

    /// Get a recommendation request by ID.
    pub async fn get_request(
        &self,
        request_id: &str,
    ) -> Result<Option<RecommendationRequest>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::RECOMMENDATION_REQUESTS)
                .obj()
                .one(request_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store
                .requests
                .get(request_id)
                .map(|r| r.value().clone())),
        }
    }

    /// Create or replace a recommendation request.
    pub async fn upsert_request(&self, request: &RecommendationRequest) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::RECOMMENDATION_REQUESTS)
                    .document_id(&request.id)
                    .object(request)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => {
                store.requests.insert(request.id.clone(), request.clone());
            }
        }
        Ok(())
    }

    /// All requests created by a student, soonest deadline first.
    pub async fn list_requests_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<RecommendationRequest>, AppError> {
        let mut requests: Vec<RecommendationRequest> = match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collections::RECOMMENDATION_REQUESTS)
                .filter(|q| q.for_all([q.field("student_id").eq(student_id)]))
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?,
            Backend::Memory(store) => store
                .requests
                .iter()
                .filter(|r| r.student_id == student_id)
                .map(|r| r.value().clone())
                .collect(),
        };

        requests.sort_by_key(|r| r.deadline);
        Ok(requests)
    }

    /// Requests still receiving reminders (pending or sent), soonest deadline
    /// first, at most `limit`.
    pub async fn list_active_requests(
        &self,
        limit: u32,
    ) -> Result<Vec<RecommendationRequest>, AppError> {
        let mut requests: Vec<RecommendationRequest> = match &self.backend {
            Backend::Firestore(client) => {
                let mut all = Vec::new();
                for status in RequestStatus::ACTIVE {
                    let batch: Vec<RecommendationRequest> = client
                        .fluent()
                        .select()
                        .from(collections::RECOMMENDATION_REQUESTS)
                        .filter(move |q| q.for_all([q.field("status").eq(status.as_str())]))
                        .order_by([(
                            "deadline",
                            firestore::FirestoreQueryDirection::Ascending,
                        )])
                        .limit(limit)
                        .obj()
                        .query()
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;
                    all.extend(batch);
                }
                all
            }
            Backend::Memory(store) => store
                .requests
                .iter()
                .filter(|r| r.status.is_active())
                .map(|r| r.value().clone())
                .collect(),
        };

        requests.sort_by_key(|r| r.deadline);
        requests.truncate(limit as usize);
        Ok(requests)
    }
}

/// Commits attempted by [`FirestoreDb::update_squad_atomic`] before giving up.
pub const TRANSACTION_ATTEMPTS: u32 = 3;

enum Commit<T> {
    Done(T),
    /// Lost to a concurrent writer; safe to run again.
    Conflict(firestore::errors::FirestoreError),
}

fn is_retryable(err: &firestore::errors::FirestoreError) -> bool {
    matches!(
        err,
        firestore::errors::FirestoreError::DatabaseError(e) if e.retry_possible
    )
}

/// One transactional read-modify-write of a squad.
async fn update_squad_in_transaction<T, F>(
    client: &firestore::FirestoreDb,
    squad_id: &str,
    mutate: &mut F,
) -> Result<Commit<T>, AppError>
where
    F: FnMut(&mut Squad) -> Result<T, AppError> + Send,
    T: Send,
{
    let mut transaction = client
        .begin_transaction()
        .await
        .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

    // Reading through the transaction registers the document for conflict
    // detection at commit.
    let current: Option<Squad> = client
        .clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ))
        .fluent()
        .select()
        .by_id_in(collections::SQUADS)
        .obj()
        .one(squad_id)
        .await
        .map_err(|e| AppError::Database(format!("Failed to read squad in transaction: {}", e)))?;

    let Some(mut squad) = current else {
        let _ = transaction.rollback().await;
        return Err(AppError::NotFound(format!("Squad {} not found", squad_id)));
    };

    let value = match mutate(&mut squad) {
        Ok(value) => value,
        Err(e) => {
            let _ = transaction.rollback().await;
            return Err(e);
        }
    };

    client
        .fluent()
        .update()
        .in_col(collections::SQUADS)
        .document_id(squad_id)
        .object(&squad)
        .add_to_transaction(&mut transaction)
        .map_err(|e| AppError::Database(format!("Failed to add squad to transaction: {}", e)))?;

    match transaction.commit().await {
        Ok(_) => Ok(Commit::Done(value)),
        Err(e) if is_retryable(&e) => Ok(Commit::Conflict(e)),
        Err(e) => Err(AppError::Database(format!("Transaction commit failed: {}", e))),
    }
}
