//! crates/countdown_core/src/session.rs
//!
//! Couples the timer state machine to the document store. A finished session
//! is appended exactly once and never retried; if the append fails the record
//! is lost and the local session is cleared anyway.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::domain::{SessionConfig, SessionRun, StudyLogRecord, User};
use crate::error::{TrackerError, TrackerResult};
use crate::feed::STUDY_LOGS;
use crate::ports::{DocumentStore, PortError};
use crate::timer::{StudyTimer, TimerState};

pub struct StudySession {
    timer: StudyTimer,
    store: Arc<dyn DocumentStore>,
}

impl StudySession {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            timer: StudyTimer::new(),
            store,
        }
    }

    pub fn timer(&self) -> &StudyTimer {
        &self.timer
    }

    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn configure(&mut self, config: SessionConfig) -> TrackerResult<()> {
        self.timer.configure(config)
    }

    pub fn start(&mut self, user: Option<&User>, config: SessionConfig) -> TrackerResult<&SessionRun> {
        let run = self
            .timer
            .start(user, config, Utc::now(), &mut rand::thread_rng())?;
        info!(
            "Study session started: {} for {} minutes",
            run.config.subject.as_str(),
            run.config.target_minutes
        );
        Ok(run)
    }

    pub fn tick(&mut self) -> bool {
        self.timer.tick()
    }

    pub fn pause(&mut self) -> TrackerResult<()> {
        self.timer.pause()
    }

    pub fn resume(&mut self) -> TrackerResult<()> {
        self.timer.resume()
    }

    /// Finishes the session and appends its record. The timer is back in
    /// `Idle` when this returns, whatever the outcome of the write.
    pub async fn finish(&mut self, user: Option<&User>) -> TrackerResult<StudyLogRecord> {
        let log = self.timer.finish(user, Utc::now())?;

        let result = match serde_json::to_value(&log) {
            Ok(data) => self.store.append(STUDY_LOGS, data).await,
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        };
        self.timer.reset();

        match result {
            Ok(id) => {
                info!(
                    "Saved study log {} for user {} ({} min, completed: {})",
                    id, log.user_id, log.duration_minutes, log.is_completed
                );
                Ok(log.with_id(id))
            }
            Err(e) => {
                error!("Failed to save study log for user {}: {}", log.user_id, e);
                Err(TrackerError::WriteFailure(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Subject;
    use crate::ports::{Document, PortResult, Query, SnapshotSubscription};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records appends; optionally rejects them.
    #[derive(Default)]
    struct RecordingStore {
        appended: Mutex<Vec<(String, serde_json::Value)>>,
        reject: bool,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn append(&self, collection: &str, data: serde_json::Value) -> PortResult<String> {
            if self.reject {
                return Err(PortError::Unexpected("network down".into()));
            }
            let mut appended = self.appended.lock().unwrap();
            appended.push((collection.to_string(), data));
            Ok(format!("log-{}", appended.len()))
        }
        async fn subscribe(&self, _query: Query) -> PortResult<SnapshotSubscription> {
            Err(PortError::Unexpected("not used".into()))
        }
        async fn query_once(&self, _query: Query) -> PortResult<Vec<Document>> {
            Ok(Vec::new())
        }
        async fn get(&self, _collection: &str, _id: &str) -> PortResult<Option<Document>> {
            Ok(None)
        }
        async fn put(&self, _collection: &str, _id: &str, _data: serde_json::Value) -> PortResult<()> {
            Err(PortError::Unexpected("not used".into()))
        }
        async fn delete(&self, _collection: &str, _ids: &[String]) -> PortResult<usize> {
            Err(PortError::Unexpected("not used".into()))
        }
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            display_name: "Minh".into(),
            avatar_url: None,
            is_guest: true,
        }
    }

    #[tokio::test]
    async fn thirty_minute_session_is_saved_once_and_completed() {
        let store = Arc::new(RecordingStore::default());
        let mut session = StudySession::new(store.clone());

        session
            .start(Some(&user()), SessionConfig::new(Subject::Literature, 30))
            .unwrap();
        for _ in 0..1800 {
            assert!(session.tick());
        }
        let record = session.finish(Some(&user())).await.unwrap();

        assert_eq!(record.id, "log-1");
        assert_eq!(record.duration_minutes, 30);
        assert!(record.is_completed);
        assert_eq!(session.state(), TimerState::Idle);

        let appended = store.appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].0, STUDY_LOGS);
        assert_eq!(appended[0].1["durationMinutes"], 30);
        assert_eq!(appended[0].1["isCompleted"], true);
    }

    #[tokio::test]
    async fn failed_write_still_clears_the_session() {
        let store = Arc::new(RecordingStore {
            reject: true,
            ..Default::default()
        });
        let mut session = StudySession::new(store);

        session
            .start(Some(&user()), SessionConfig::new(Subject::Biology, 15))
            .unwrap();
        session.tick();

        let result = session.finish(Some(&user())).await;

        assert!(matches!(result, Err(TrackerError::WriteFailure(_))));
        assert_eq!(session.state(), TimerState::Idle);
        assert!(session.timer().run().is_none());
    }

    #[tokio::test]
    async fn finish_without_session_writes_nothing() {
        let store = Arc::new(RecordingStore::default());
        let mut session = StudySession::new(store.clone());

        let result = session.finish(Some(&user())).await;

        assert!(matches!(result, Err(TrackerError::InvalidTransition { .. })));
        assert!(store.appended.lock().unwrap().is_empty());
    }
}
