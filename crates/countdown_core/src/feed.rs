//! crates/countdown_core/src/feed.rs
//!
//! The realtime study feed: every snapshot of the `study_logs` collection is
//! turned into the recent-record window and a fresh leaderboard.

use futures::StreamExt;
use serde::Serialize;
use tracing::{error, warn};

use crate::domain::{LeaderboardEntry, StudyLogRecord};
use crate::leaderboard::{aggregate, normalize_window, RECORD_WINDOW};
use crate::ports::{Document, DocumentStore, PortResult, Query, Subscription};

/// Collection holding one document per finished study session.
pub const STUDY_LOGS: &str = "study_logs";

/// The query behind the recent feed: newest records system-wide.
pub fn recent_logs_query() -> Query {
    Query::collection(STUDY_LOGS)
        .order_by_desc("timestamp")
        .limit(RECORD_WINDOW)
}

/// Decodes study logs, skipping (and logging) documents that do not match
/// the record schema.
pub fn decode_records(documents: &[Document]) -> Vec<StudyLogRecord> {
    documents
        .iter()
        .filter_map(|doc| match doc.decode::<StudyLogRecord>() {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed study log {}: {}", doc.id, e);
                None
            }
        })
        .collect()
}

/// Everything derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedState {
    pub recent: Vec<StudyLogRecord>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl FeedState {
    pub fn from_records(records: Vec<StudyLogRecord>) -> Self {
        let recent = normalize_window(records);
        let leaderboard = aggregate(&recent);
        Self {
            recent,
            leaderboard,
        }
    }

    pub fn from_snapshot(documents: &[Document]) -> Self {
        Self::from_records(decode_records(documents))
    }

    /// The `limit` newest records.
    pub fn latest(&self, limit: usize) -> &[StudyLogRecord] {
        &self.recent[..limit.min(self.recent.len())]
    }
}

/// Subscribes to the recent study logs and maps each snapshot to a
/// [`FeedState`]. Snapshot errors are logged and skipped; the feed stays open.
pub async fn subscribe_study_feed(store: &dyn DocumentStore) -> PortResult<Subscription<FeedState>> {
    let snapshots = store.subscribe(recent_logs_query()).await?;
    let states = snapshots.filter_map(|snapshot| async move {
        match snapshot {
            Ok(documents) => Some(FeedState::from_snapshot(&documents)),
            Err(e) => {
                error!("Study log snapshot failed: {}", e);
                None
            }
        }
    });
    Ok(Subscription::new(states))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_documents_are_skipped() {
        let documents = vec![
            Document {
                id: "ok".into(),
                data: json!({
                    "userId": "a", "userName": "A", "userAvatar": "", "subject": "math",
                    "durationMinutes": 25, "targetMinutes": 25, "notes": "", "isCompleted": true,
                    "timestamp": 10
                }),
            },
            Document {
                id: "bad".into(),
                data: json!({"userId": "b"}),
            },
        ];

        let state = FeedState::from_snapshot(&documents);
        assert_eq!(state.recent.len(), 1);
        assert_eq!(state.recent[0].id, "ok");
        assert_eq!(state.leaderboard[0].total_minutes, 25);
    }

    #[test]
    fn latest_is_bounded_by_what_is_held() {
        let state = FeedState::default();
        assert!(state.latest(10).is_empty());
    }
}
