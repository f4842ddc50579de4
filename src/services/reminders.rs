// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation reminder loop, run once per cron tick.
//!
//! Each request is handled on its own: a failed send or write is recorded
//! in the summary and the loop moves on. A request whose send failed keeps
//! its schedule untouched, so it is due again on the next tick.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::RecommendationRequest;
use crate::services::notifier::{Notifier, ReminderNotification};
use crate::services::scheduler::{self, ReminderAction, UrgencyLevel};
use crate::time_utils::days_until;

/// Outcome for one request in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent {
        interval: u32,
        urgency: UrgencyLevel,
    },
    /// Sent, but the advanced schedule was not saved. The same reminder
    /// goes out again on the next run.
    SentUnsaved {
        interval: u32,
        urgency: UrgencyLevel,
        error: String,
    },
    Failed {
        error: String,
    },
    Skipped {
        reason: String,
    },
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DispatchDetail {
    pub request_id: String,
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

/// Result of one reminder run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DispatchSummary {
    /// Requests examined
    pub checked: u32,
    /// Reminders sent, including ones whose schedule was not saved
    pub sent: u32,
    /// Sends or writes that failed
    pub errors: u32,
    /// Requests moved to overdue
    pub overdue: u32,
    pub details: Vec<DispatchDetail>,
}

impl DispatchSummary {
    fn record(&mut self, request_id: &str, outcome: DispatchOutcome) {
        match &outcome {
            DispatchOutcome::Sent { .. } => self.sent += 1,
            DispatchOutcome::SentUnsaved { .. } => {
                self.sent += 1;
                self.errors += 1;
            }
            DispatchOutcome::Failed { .. } => self.errors += 1,
            DispatchOutcome::Overdue => self.overdue += 1,
            DispatchOutcome::Skipped { .. } => {}
        }
        self.details.push(DispatchDetail {
            request_id: request_id.to_string(),
            outcome,
        });
    }
}

/// Result of an overdue sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SweepSummary {
    pub checked: u32,
    pub overdue: u32,
    pub errors: u32,
}

/// Drives reminders for recommendation requests.
#[derive(Clone)]
pub struct ReminderService {
    db: FirestoreDb,
    notifier: Arc<dyn Notifier>,
    app_url: String,
    batch_limit: u32,
}

impl ReminderService {
    pub fn new(
        db: FirestoreDb,
        notifier: Arc<dyn Notifier>,
        app_url: &str,
        batch_limit: u32,
    ) -> Self {
        Self {
            db,
            notifier,
            app_url: app_url.to_string(),
            batch_limit,
        }
    }

    /// Load active requests, sweep overdue ones, then send what is due.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<DispatchSummary> {
        let requests = self.db.list_active_requests(self.batch_limit).await?;
        let summary = self.dispatch_batch(requests, now).await;

        tracing::info!(
            checked = summary.checked,
            sent = summary.sent,
            errors = summary.errors,
            overdue = summary.overdue,
            "Reminder run complete"
        );

        Ok(summary)
    }

    /// Mark active requests with passed deadlines as overdue.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary> {
        let mut requests = self.db.list_active_requests(self.batch_limit).await?;
        let flipped = scheduler::sweep_overdue(&mut requests, now);

        let mut summary = SweepSummary {
            checked: requests.len() as u32,
            ..SweepSummary::default()
        };
        for request in requests.iter().filter(|r| flipped.contains(&r.id)) {
            match self.db.upsert_request(request).await {
                Ok(()) => summary.overdue += 1,
                Err(e) => {
                    tracing::error!(request_id = %request.id, error = %e, "Failed to save overdue status");
                    summary.errors += 1;
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            overdue = summary.overdue,
            errors = summary.errors,
            "Overdue sweep complete"
        );
        Ok(summary)
    }

    /// Process an already-loaded batch, one request at a time.
    pub async fn dispatch_batch(
        &self,
        mut requests: Vec<RecommendationRequest>,
        now: DateTime<Utc>,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary {
            checked: requests.len() as u32,
            ..DispatchSummary::default()
        };

        let flipped = scheduler::sweep_overdue(&mut requests, now);

        for mut request in requests {
            if flipped.contains(&request.id) {
                let outcome = match self.db.upsert_request(&request).await {
                    Ok(()) => DispatchOutcome::Overdue,
                    Err(e) => {
                        tracing::error!(request_id = %request.id, error = %e, "Failed to save overdue status");
                        DispatchOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                summary.record(&request.id, outcome);
                continue;
            }

            if !scheduler::is_due(&request, now) {
                continue;
            }

            let outcome = self.process_due(&mut request, now).await;
            summary.record(&request.id, outcome);
        }

        summary
    }

    async fn process_due(
        &self,
        request: &mut RecommendationRequest,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let (interval, urgency, days) = match scheduler::next_action(request, now) {
            ReminderAction::Send {
                interval,
                urgency,
                days_until_deadline,
                ..
            } => (interval, urgency, days_until_deadline),
            action => {
                // Nothing to send; just record the new schedule.
                scheduler::advance(request, now);
                let reason = match action {
                    ReminderAction::Reschedule { .. } => "not_yet_in_window",
                    _ => "reminders_exhausted",
                };
                if let Err(e) = self.db.upsert_request(request).await {
                    tracing::error!(request_id = %request.id, error = %e, "Failed to save reminder schedule");
                    return DispatchOutcome::Failed {
                        error: e.to_string(),
                    };
                }
                return DispatchOutcome::Skipped {
                    reason: reason.to_string(),
                };
            }
        };

        let notification = ReminderNotification::reminder(request, days, urgency, &self.app_url);

        if let Err(e) = self.notifier.send(&notification).await {
            tracing::warn!(
                request_id = %request.id,
                interval,
                error = %e,
                "Failed to send reminder"
            );
            return DispatchOutcome::Failed {
                error: e.to_string(),
            };
        }

        scheduler::advance(request, now);

        if let Err(e) = self.db.upsert_request(request).await {
            tracing::error!(
                request_id = %request.id,
                interval,
                error = %e,
                "Reminder sent but schedule update failed; it may be sent again next run"
            );
            return DispatchOutcome::SentUnsaved {
                interval,
                urgency,
                error: e.to_string(),
            };
        }

        tracing::info!(
            request_id = %request.id,
            interval,
            urgency = urgency.as_str(),
            reminders_sent = request.reminders_sent,
            "Reminder sent"
        );

        DispatchOutcome::Sent { interval, urgency }
    }

    /// Send the first email for a newly created request.
    ///
    /// On success the request moves to `sent`. Failure is logged and the
    /// request stays pending; the reminder schedule is unaffected either way.
    pub async fn notify_created(&self, request: &mut RecommendationRequest, now: DateTime<Utc>) {
        let days = days_until(request.deadline, now);
        let notification = ReminderNotification::initial(
            request,
            days,
            scheduler::urgency_level(days),
            &self.app_url,
        );

        match self.notifier.send(&notification).await {
            Ok(()) => {
                if let Err(e) = request.mark_notified(now) {
                    tracing::warn!(request_id = %request.id, error = %e, "Unexpected status after initial email");
                }
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    error = %e,
                    "Failed to send initial recommendation request email"
                );
            }
        }
    }
}
