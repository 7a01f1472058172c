//! crates/countdown_core/src/history.rs
//!
//! A user's own study history, resolved in two tiers: a scoped query against
//! the store, and on failure a filter over the recent snapshot already held.
//! The fallback can miss older sessions of infrequent users.

use serde::Serialize;
use tracing::warn;

use crate::domain::StudyLogRecord;
use crate::feed::{decode_records, STUDY_LOGS};
use crate::ports::{DocumentStore, PortResult, Query};

/// Maximum number of sessions the scoped query returns.
pub const HISTORY_LIMIT: usize = 50;

/// Which tier produced a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Scoped,
    RecentSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub records: Vec<StudyLogRecord>,
    pub total_minutes: u64,
    pub sessions_count: usize,
    pub completed_count: usize,
    pub source: HistorySource,
}

impl HistorySummary {
    pub fn from_records(mut records: Vec<StudyLogRecord>, source: HistorySource) -> Self {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let total_minutes = records.iter().map(|r| u64::from(r.duration_minutes)).sum();
        let completed_count = records.iter().filter(|r| r.is_completed).count();
        Self {
            sessions_count: records.len(),
            total_minutes,
            completed_count,
            records,
            source,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn history_query(user_id: &str) -> Query {
    Query::collection(STUDY_LOGS)
        .where_eq("userId", user_id)
        .order_by_desc("timestamp")
        .limit(HISTORY_LIMIT)
}

/// Tier one: the scoped query.
pub async fn scoped_history(store: &dyn DocumentStore, user_id: &str) -> PortResult<Vec<StudyLogRecord>> {
    let documents = store.query_once(history_query(user_id)).await?;
    Ok(decode_records(&documents))
}

/// Tier two: the user's records within a snapshot.
pub fn filter_snapshot(snapshot: &[StudyLogRecord], user_id: &str) -> Vec<StudyLogRecord> {
    snapshot
        .iter()
        .filter(|r| r.user_id == user_id)
        .cloned()
        .collect()
}

/// Resolves a history, falling back silently when the scoped query fails.
pub async fn load_history(
    store: &dyn DocumentStore,
    user_id: &str,
    snapshot: &[StudyLogRecord],
) -> HistorySummary {
    match scoped_history(store, user_id).await {
        Ok(records) => HistorySummary::from_records(records, HistorySource::Scoped),
        Err(e) => {
            warn!(
                "Scoped history query failed for user {}, using recent snapshot: {}",
                user_id, e
            );
            HistorySummary::from_records(filter_snapshot(snapshot, user_id), HistorySource::RecentSnapshot)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Subject;
    use crate::ports::{Document, PortError, SnapshotSubscription};
    use async_trait::async_trait;

    fn record(user: &str, minutes: u32, timestamp: i64, completed: bool) -> StudyLogRecord {
        StudyLogRecord {
            id: format!("{user}-{timestamp}"),
            user_id: user.to_string(),
            user_name: user.to_string(),
            user_avatar: String::new(),
            subject: Subject::Chemistry,
            duration_minutes: minutes,
            target_minutes: 30,
            notes: String::new(),
            is_completed: completed,
            timestamp,
        }
    }

    /// A store whose scoped query always fails, as with a missing index.
    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn append(&self, _collection: &str, _data: serde_json::Value) -> PortResult<String> {
            Err(PortError::Unexpected("read only".into()))
        }
        async fn subscribe(&self, _query: Query) -> PortResult<SnapshotSubscription> {
            Err(PortError::Unexpected("unavailable".into()))
        }
        async fn query_once(&self, _query: Query) -> PortResult<Vec<Document>> {
            Err(PortError::Unexpected("index missing".into()))
        }
        async fn get(&self, _collection: &str, _id: &str) -> PortResult<Option<Document>> {
            Err(PortError::Unexpected("unavailable".into()))
        }
        async fn put(&self, _collection: &str, _id: &str, _data: serde_json::Value) -> PortResult<()> {
            Err(PortError::Unexpected("read only".into()))
        }
        async fn delete(&self, _collection: &str, _ids: &[String]) -> PortResult<usize> {
            Err(PortError::Unexpected("read only".into()))
        }
    }

    /// A store that answers every query with fixed documents.
    struct FixedStore(Vec<Document>);

    #[async_trait]
    impl DocumentStore for FixedStore {
        async fn append(&self, _collection: &str, _data: serde_json::Value) -> PortResult<String> {
            Ok("new".into())
        }
        async fn subscribe(&self, _query: Query) -> PortResult<SnapshotSubscription> {
            Err(PortError::Unexpected("unavailable".into()))
        }
        async fn query_once(&self, query: Query) -> PortResult<Vec<Document>> {
            Ok(query.apply(&self.0))
        }
        async fn get(&self, _collection: &str, id: &str) -> PortResult<Option<Document>> {
            Ok(self.0.iter().find(|doc| doc.id == id).cloned())
        }
        async fn put(&self, _collection: &str, _id: &str, _data: serde_json::Value) -> PortResult<()> {
            Ok(())
        }
        async fn delete(&self, _collection: &str, _ids: &[String]) -> PortResult<usize> {
            Ok(0)
        }
    }

    fn to_document(record: &StudyLogRecord) -> Document {
        let mut data = serde_json::to_value(record).unwrap();
        data.as_object_mut().unwrap().remove("id");
        Document {
            id: record.id.clone(),
            data,
        }
    }

    #[test]
    fn empty_history_has_zero_totals() {
        let summary = HistorySummary::from_records(filter_snapshot(&[], "nobody"), HistorySource::RecentSnapshot);
        assert!(summary.is_empty());
        assert_eq!(summary.total_minutes, 0);
        assert_eq!(summary.sessions_count, 0);
        assert_eq!(summary.completed_count, 0);
    }

    #[test]
    fn summary_is_newest_first_with_totals() {
        let summary = HistorySummary::from_records(
            vec![record("a", 10, 1, false), record("a", 30, 3, true), record("a", 20, 2, false)],
            HistorySource::Scoped,
        );
        let stamps: Vec<_> = summary.records.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![3, 2, 1]);
        assert_eq!(summary.total_minutes, 60);
        assert_eq!(summary.sessions_count, 3);
        assert_eq!(summary.completed_count, 1);
    }

    #[tokio::test]
    async fn scoped_query_is_preferred() {
        let stored = vec![record("a", 10, 1, false), record("b", 40, 2, true), record("a", 25, 3, false)];
        let store = FixedStore(stored.iter().map(to_document).collect());

        let summary = load_history(&store, "a", &[]).await;

        assert_eq!(summary.source, HistorySource::Scoped);
        assert_eq!(summary.sessions_count, 2);
        assert_eq!(summary.total_minutes, 35);
    }

    #[tokio::test]
    async fn failed_query_falls_back_to_snapshot() {
        let snapshot = vec![record("a", 10, 1, false), record("b", 40, 2, true), record("a", 25, 3, false)];

        let summary = load_history(&FailingStore, "a", &snapshot).await;

        assert_eq!(summary.source, HistorySource::RecentSnapshot);
        assert_eq!(summary.sessions_count, 2);
        assert_eq!(summary.total_minutes, 35);
        assert_eq!(summary.records[0].timestamp, 3);
    }

    #[tokio::test]
    async fn fallback_for_unknown_user_is_empty_not_an_error() {
        let summary = load_history(&FailingStore, "ghost", &[record("a", 10, 1, false)]).await;
        assert!(summary.is_empty());
        assert_eq!(summary.total_minutes, 0);
    }
}
