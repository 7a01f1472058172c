//! crates/countdown_core/src/countdown.rs
//!
//! Time left until the exam.

use chrono::{DateTime, Utc};

use crate::domain::TimeLeft;

/// Whole days, hours, minutes and seconds from `now` until `target`.
/// Zero in every unit once the target has passed.
pub fn time_left(target: DateTime<Utc>, now: DateTime<Utc>) -> TimeLeft {
    let remaining = (target - now).num_seconds();
    if remaining <= 0 {
        return TimeLeft::default();
    }
    TimeLeft {
        days: remaining / 86_400,
        hours: (remaining / 3_600) % 24,
        minutes: (remaining / 60) % 60,
        seconds: remaining % 60,
    }
}
