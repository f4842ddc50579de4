// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound email notifications to recommenders.
//!
//! The reminder loop only sees the [`Notifier`] trait. Production uses
//! [`HttpEmailNotifier`] against a Resend-compatible API; local development
//! without an API key falls back to [`LogNotifier`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::models::RecommendationRequest;
use crate::services::scheduler::UrgencyLevel;
use crate::time_utils::format_utc_rfc3339;

const EMAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// A rendered notification, ready to hand to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderNotification {
    pub request_id: String,
    pub to: String,
    pub recipient_name: String,
    pub student_name: String,
    pub purpose: String,
    pub deadline: DateTime<Utc>,
    pub days_until_deadline: i64,
    pub urgency: UrgencyLevel,
    pub subject: String,
    pub body: String,
}

impl ReminderNotification {
    /// Reminder email for a scheduled interval.
    pub fn reminder(
        request: &RecommendationRequest,
        days_until_deadline: i64,
        urgency: UrgencyLevel,
        app_url: &str,
    ) -> Self {
        let due = describe_days(days_until_deadline);
        let subject = match urgency {
            UrgencyLevel::Critical => format!(
                "URGENT: Recommendation for {} is due {}",
                request.student_name, due
            ),
            UrgencyLevel::High => format!(
                "Reminder: Recommendation for {} is due {}",
                request.student_name, due
            ),
            UrgencyLevel::Medium | UrgencyLevel::Low => format!(
                "Friendly reminder: Recommendation for {}",
                request.student_name
            ),
        };

        let opening = match urgency {
            UrgencyLevel::Critical => {
                "The deadline for this recommendation letter is almost here."
            }
            UrgencyLevel::High => "The deadline for this recommendation letter is coming up soon.",
            UrgencyLevel::Medium | UrgencyLevel::Low => {
                "This is a friendly reminder about an upcoming recommendation letter."
            }
        };

        let body = format!(
            "Dear {name},\n\n\
             {opening}\n\n\
             Student: {student}\n\
             For: {purpose}\n\
             Deadline: {deadline} ({due})\n\n\
             You can view the request and submit your letter at {url}/recommendations/{id}\n\n\
             Thank you for supporting {student}.\n",
            name = request.recommender.name,
            opening = opening,
            student = request.student_name,
            purpose = request.purpose,
            deadline = request.deadline.format("%B %-d, %Y"),
            due = due,
            url = app_url.trim_end_matches('/'),
            id = request.id,
        );

        Self::build(request, days_until_deadline, urgency, subject, body)
    }

    /// First email sent when the student creates the request.
    pub fn initial(
        request: &RecommendationRequest,
        days_until_deadline: i64,
        urgency: UrgencyLevel,
        app_url: &str,
    ) -> Self {
        let subject = format!(
            "Recommendation request from {} for {}",
            request.student_name, request.purpose
        );

        let mut body = format!(
            "Dear {},\n\n{} has asked you to write a recommendation letter for {}.\n\
             The deadline is {} ({}).\n",
            request.recommender.name,
            request.student_name,
            request.purpose,
            request.deadline.format("%B %-d, %Y"),
            describe_days(days_until_deadline),
        );
        if let Some(message) = request.message.as_deref().filter(|m| !m.trim().is_empty()) {
            body.push_str(&format!("\nMessage from {}:\n{}\n", request.student_name, message));
        }
        body.push_str(&format!(
            "\nView the request at {}/recommendations/{}\n",
            app_url.trim_end_matches('/'),
            request.id
        ));

        Self::build(request, days_until_deadline, urgency, subject, body)
    }

    fn build(
        request: &RecommendationRequest,
        days_until_deadline: i64,
        urgency: UrgencyLevel,
        subject: String,
        body: String,
    ) -> Self {
        Self {
            request_id: request.id.clone(),
            to: request.recommender.email.clone(),
            recipient_name: request.recommender.name.clone(),
            student_name: request.student_name.clone(),
            purpose: request.purpose.clone(),
            deadline: request.deadline,
            days_until_deadline,
            urgency,
            subject,
            body,
        }
    }
}

fn describe_days(days: i64) -> String {
    match days {
        d if d <= 0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d => format!("in {} days", d),
    }
}

/// Errors from sending a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Email request failed: {0}")]
    Transport(String),

    #[error("Email API rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Sends one notification. Implementations must not retry internally; the
/// reminder loop retries by leaving the request due.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &ReminderNotification) -> Result<(), NotifyError>;
}

/// JSON body accepted by the email API.
#[derive(Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Email over a Resend-compatible HTTP API.
pub struct HttpEmailNotifier {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailNotifier {
    pub fn new(api_url: &str, api_key: &str, from: &str) -> Result<Self, NotifyError> {
        let http_client = reqwest::Client::builder()
            .timeout(EMAIL_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for HttpEmailNotifier {
    async fn send(&self, notification: &ReminderNotification) -> Result<(), NotifyError> {
        let message = EmailMessage {
            from: &self.from,
            to: [notification.to.as_str()],
            subject: &notification.subject,
            text: &notification.body,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            request_id = %notification.request_id,
            urgency = notification.urgency.as_str(),
            "Email accepted by provider"
        );
        Ok(())
    }
}

/// Logs notifications instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &ReminderNotification) -> Result<(), NotifyError> {
        tracing::info!(
            request_id = %notification.request_id,
            to = %notification.to,
            urgency = notification.urgency.as_str(),
            deadline = %format_utc_rfc3339(notification.deadline),
            subject = %notification.subject,
            "Email delivery disabled; logging notification"
        );
        Ok(())
    }
}
