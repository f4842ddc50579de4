// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reminder scheduling for recommendation requests.
//!
//! Pure functions over a request and an injected `now`. Nothing here does
//! I/O; the dispatch loop in [`crate::services::reminders`] decides when to
//! call out to the notifier and persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{RecommendationRequest, RequestStatus};
use crate::time_utils::{days_before, days_until};

/// How close a deadline is, used to pick reminder tone.
///
/// Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Critical => "critical",
        }
    }
}

/// Classify days until a deadline. Each bound is inclusive.
pub fn urgency_level(days_until_deadline: i64) -> UrgencyLevel {
    match days_until_deadline {
        d if d <= 1 => UrgencyLevel::Critical,
        d if d <= 3 => UrgencyLevel::High,
        d if d <= 7 => UrgencyLevel::Medium,
        _ => UrgencyLevel::Low,
    }
}

/// Whether a reminder should go out for `request` at `now`.
///
/// An unscheduled request (no `next_reminder_date`) is due only if it has
/// never been reminded; once reminders have gone out, an empty schedule
/// means they are exhausted.
pub fn is_due(request: &RecommendationRequest, now: DateTime<Utc>) -> bool {
    if !request.status.is_active() || request.deadline <= now {
        return false;
    }
    match request.next_reminder_date {
        Some(next) => next <= now,
        None => request.last_reminder_sent.is_none() && !request.reminder_intervals.is_empty(),
    }
}

/// Index of the tightest interval covering `days_until_deadline`: the
/// smallest interval with `days_until_deadline <= interval`.
///
/// `intervals` is expected in descending order.
pub fn reminder_index(intervals: &[u32], days_until_deadline: i64) -> Option<usize> {
    intervals
        .iter()
        .enumerate()
        .filter(|&(_, &interval)| days_until_deadline <= i64::from(interval))
        .min_by_key(|&(_, &interval)| interval)
        .map(|(index, _)| index)
}

/// What the scheduler wants done for a request at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReminderAction {
    /// Send the reminder for `reminder_intervals[index]`.
    Send {
        index: usize,
        interval: u32,
        days_until_deadline: i64,
        urgency: UrgencyLevel,
    },
    /// The deadline is further out than every interval; wait until `next`.
    Reschedule { next: DateTime<Utc> },
    /// No reminders remain.
    Exhausted,
}

/// Decide the next step for `request` without changing it.
pub fn next_action(request: &RecommendationRequest, now: DateTime<Utc>) -> ReminderAction {
    let days = days_until(request.deadline, now);
    let intervals = &request.reminder_intervals;

    if let Some(index) = reminder_index(intervals, days) {
        return ReminderAction::Send {
            index,
            interval: intervals[index],
            days_until_deadline: days,
            urgency: urgency_level(days),
        };
    }

    let next = intervals
        .iter()
        .max()
        .filter(|&&largest| days > i64::from(largest))
        .and_then(|&largest| days_before(request.deadline, largest));
    match next {
        Some(next) => ReminderAction::Reschedule { next },
        None => ReminderAction::Exhausted,
    }
}

/// Apply the scheduler's decision for `now` to `request`.
///
/// For [`ReminderAction::Send`] this assumes the reminder went out: it stamps
/// `last_reminder_sent`, moves the request to `sent` and schedules the next
/// interval, or clears the schedule after the last one.
pub fn advance(request: &mut RecommendationRequest, now: DateTime<Utc>) -> ReminderAction {
    let action = next_action(request, now);

    match action {
        ReminderAction::Send { index, .. } => {
            // Pending and sent both accept a move to sent; anything else was
            // never due, so leave its status alone.
            if let Ok(status) = request.status.transition(RequestStatus::Sent) {
                request.status = status;
            }
            request.last_reminder_sent = Some(now);
            request.reminders_sent += 1;
            request.next_reminder_date = request
                .reminder_intervals
                .get(index + 1)
                .and_then(|&days| days_before(request.deadline, days));
        }
        ReminderAction::Reschedule { next } => {
            request.next_reminder_date = Some(next);
        }
        ReminderAction::Exhausted => {
            request.next_reminder_date = None;
        }
    }

    request.updated_at = now;
    action
}

/// Mark every active request whose deadline has passed as overdue.
///
/// Returns the ids that changed. Running it again is a no-op.
pub fn sweep_overdue(requests: &mut [RecommendationRequest], now: DateTime<Utc>) -> Vec<String> {
    let mut flipped = Vec::new();

    for request in requests.iter_mut() {
        if request.deadline >= now {
            continue;
        }
        if request.set_status(RequestStatus::Overdue, now).is_ok() {
            flipped.push(request.id.clone());
        }
    }

    flipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRecommendationRequest, Recommender};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn make_request(deadline: DateTime<Utc>, intervals: Vec<u32>) -> RecommendationRequest {
        // Created well before `now` so any deadline after creation is valid.
        let created = deadline - Duration::days(60);
        RecommendationRequest::new(
            NewRecommendationRequest {
                student_id: "student-1".to_string(),
                student_name: "Sam Student".to_string(),
                recommender: Recommender {
                    name: "Dr. Rivera".to_string(),
                    email: "rivera@example.edu".to_string(),
                    title: None,
                },
                purpose: "Gates Scholarship".to_string(),
                message: None,
                deadline,
                reminder_intervals: Some(intervals),
            },
            created,
        )
        .unwrap()
    }

    #[test]
    fn test_urgency_boundaries() {
        assert_eq!(urgency_level(0), UrgencyLevel::Critical);
        assert_eq!(urgency_level(1), UrgencyLevel::Critical);
        assert_eq!(urgency_level(2), UrgencyLevel::High);
        assert_eq!(urgency_level(3), UrgencyLevel::High);
        assert_eq!(urgency_level(4), UrgencyLevel::Medium);
        assert_eq!(urgency_level(7), UrgencyLevel::Medium);
        assert_eq!(urgency_level(8), UrgencyLevel::Low);
    }

    #[test]
    fn test_urgency_is_monotonic() {
        for d1 in -2..30 {
            for d2 in (d1 + 1)..31 {
                assert!(urgency_level(d1) >= urgency_level(d2), "{} vs {}", d1, d2);
            }
        }
    }

    #[test]
    fn test_reminder_index_picks_tightest_interval() {
        let intervals = [7, 3, 1];
        assert_eq!(reminder_index(&intervals, 7), Some(0));
        assert_eq!(reminder_index(&intervals, 5), Some(0));
        assert_eq!(reminder_index(&intervals, 3), Some(1));
        assert_eq!(reminder_index(&intervals, 2), Some(1));
        assert_eq!(reminder_index(&intervals, 1), Some(2));
        assert_eq!(reminder_index(&intervals, 8), None);
        assert_eq!(reminder_index(&[], 1), None);
    }

    #[test]
    fn test_two_days_out_is_high_and_uses_three_day_reminder() {
        let request = make_request(now() + Duration::days(2), vec![7, 3, 1]);

        assert!(is_due(&request, now()));
        assert_eq!(
            next_action(&request, now()),
            ReminderAction::Send {
                index: 1,
                interval: 3,
                days_until_deadline: 2,
                urgency: UrgencyLevel::High,
            }
        );
    }

    #[test]
    fn test_advance_schedules_next_interval() {
        let deadline = now() + Duration::days(2);
        let mut request = make_request(deadline, vec![7, 3, 1]);

        advance(&mut request, now());

        assert_eq!(request.status, RequestStatus::Sent);
        assert_eq!(request.last_reminder_sent, Some(now()));
        assert_eq!(request.reminders_sent, 1);
        assert_eq!(request.next_reminder_date, Some(deadline - Duration::days(1)));
        assert!(!is_due(&request, now() + Duration::hours(1)));
        assert!(is_due(&request, deadline - Duration::hours(23)));
    }

    #[test]
    fn test_last_reminder_exhausts_schedule() {
        let deadline = now() + Duration::hours(20);
        let mut request = make_request(deadline, vec![7, 3, 1]);

        let action = advance(&mut request, now());

        assert!(matches!(action, ReminderAction::Send { index: 2, .. }));
        assert_eq!(request.next_reminder_date, None);
        assert!(!is_due(&request, now()));
        assert!(!is_due(&request, deadline - Duration::minutes(1)));
    }

    #[test]
    fn test_full_reminder_sequence() {
        let deadline = now() + Duration::days(10);
        let mut request = make_request(deadline, vec![7, 3, 1]);
        let mut fired = Vec::new();

        let mut t = now();
        while t < deadline {
            if is_due(&request, t) {
                if let ReminderAction::Send { interval, .. } = advance(&mut request, t) {
                    fired.push(interval);
                }
            }
            t += Duration::hours(1);
        }

        assert_eq!(fired, vec![7, 3, 1]);
        assert_eq!(request.reminders_sent, 3);
    }

    #[test]
    fn test_far_deadline_reschedules_instead_of_sending() {
        let deadline = now() + Duration::days(20);
        let mut request = make_request(deadline, vec![7, 3, 1]);
        request.next_reminder_date = None;

        assert!(is_due(&request, now()));
        let action = advance(&mut request, now());

        assert_eq!(
            action,
            ReminderAction::Reschedule {
                next: deadline - Duration::days(7)
            }
        );
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.last_reminder_sent, None);
        assert!(!is_due(&request, now()));
    }

    #[test]
    fn test_inactive_or_past_requests_are_not_due() {
        let mut request = make_request(now() + Duration::days(1), vec![7, 3, 1]);
        request.status = RequestStatus::Cancelled;
        assert!(!is_due(&request, now()));

        let request = make_request(now() - Duration::hours(1), vec![7, 3, 1]);
        assert!(!is_due(&request, now()));
    }

    #[test]
    fn test_sweep_overdue() {
        let mut requests = vec![
            make_request(now() - Duration::days(1), vec![7, 3, 1]),
            make_request(now() + Duration::days(1), vec![7, 3, 1]),
            make_request(now() - Duration::days(2), vec![7, 3, 1]),
        ];
        requests[2].status = RequestStatus::Received;

        assert!(!is_due(&requests[0], now()));
        let flipped = sweep_overdue(&mut requests, now());

        assert_eq!(flipped, vec![requests[0].id.clone()]);
        assert_eq!(requests[0].status, RequestStatus::Overdue);
        assert_eq!(requests[1].status, RequestStatus::Pending);
        assert_eq!(requests[2].status, RequestStatus::Received);
        assert!(!is_due(&requests[0], now()));

        assert!(sweep_overdue(&mut requests, now()).is_empty());
    }
}
