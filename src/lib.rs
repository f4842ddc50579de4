// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Squad Tracker: shared goals for student squads
//!
//! This crate provides the backend API for squads that track progress toward
//! shared goals, and for recommendation letter requests whose recommenders
//! get reminder emails as the deadline approaches.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{HttpEmailNotifier, LogNotifier, Notifier, NotifyError, ReminderService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub reminder_service: ReminderService,
}

impl AppState {
    /// Wire up services around an already-connected database.
    pub fn new(config: Config, db: FirestoreDb) -> Result<Self, NotifyError> {
        let notifier = build_notifier(&config)?;
        let reminder_service = ReminderService::new(
            db.clone(),
            notifier,
            &config.app_url,
            config.reminder_batch_limit,
        );

        Ok(Self {
            config,
            db,
            reminder_service,
        })
    }
}

/// Real email delivery when an API key is configured, log-only otherwise.
fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.email_api_key {
        Some(key) => Ok(Arc::new(HttpEmailNotifier::new(
            &config.email_api_url,
            key,
            &config.email_from,
        )?)),
        None => {
            tracing::warn!("EMAIL_API_KEY not set; reminder emails will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
