//! crates/countdown_core/src/leaderboard.rs
//!
//! Ranks users by minutes studied across the record window.
//!
//! The window is the most recent [`RECORD_WINDOW`] records system-wide, so a
//! user whose older sessions fall outside it is under-counted. Rankings are
//! recomputed from scratch for every snapshot.

use std::collections::HashMap;

use crate::domain::{LeaderboardEntry, StudyLogRecord};

/// Number of most recent records the leaderboard and recent feed look at.
pub const RECORD_WINDOW: usize = 200;

/// Orders a snapshot newest-first by `timestamp` and caps it at the window.
/// Delivery order from the store is not trusted.
pub fn normalize_window(mut records: Vec<StudyLogRecord>) -> Vec<StudyLogRecord> {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(RECORD_WINDOW);
    records
}

/// Groups records by user and ranks them by total minutes, descending.
///
/// Each entry takes its display name and avatar from the user's newest
/// record. Equal totals are ordered by `user_id` ascending so the output
/// does not depend on input order.
pub fn aggregate(records: &[StudyLogRecord]) -> Vec<LeaderboardEntry> {
    let mut stats: HashMap<&str, LeaderboardEntry> = HashMap::new();

    for record in records {
        let entry = stats
            .entry(record.user_id.as_str())
            .or_insert_with(|| LeaderboardEntry {
                user_id: record.user_id.clone(),
                user_name: record.user_name.clone(),
                user_avatar: record.user_avatar.clone(),
                total_minutes: 0,
                sessions_count: 0,
                last_active: record.timestamp,
            });

        entry.total_minutes += u64::from(record.duration_minutes);
        entry.sessions_count += 1;
        if record.timestamp > entry.last_active {
            entry.last_active = record.timestamp;
            entry.user_name = record.user_name.clone();
            entry.user_avatar = record.user_avatar.clone();
        }
    }

    let mut ranked: Vec<LeaderboardEntry> = stats.into_values().collect();
    ranked.sort_by(|a, b| {
        b.total_minutes
            .cmp(&a.total_minutes)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    ranked
}
