// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod notifier;
pub mod reminders;
pub mod scheduler;

pub use notifier::{HttpEmailNotifier, LogNotifier, Notifier, NotifyError, ReminderNotification};
pub use reminders::{DispatchSummary, ReminderService, SweepSummary};
pub use scheduler::{ReminderAction, UrgencyLevel};
