// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and day arithmetic.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whole days from `now` until `target`, rounded up.
///
/// Negative once `target` has passed: one hour past a deadline is `0`,
/// a day and an hour past is `-1`.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (target - now).num_milliseconds();
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
        whole + 1
    } else {
        whole
    }
}

/// `date` shifted back by `days` whole days, or `None` if that falls
/// outside the representable range.
pub fn days_before(date: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    date.checked_sub_signed(Duration::days(i64::from(days)))
}
