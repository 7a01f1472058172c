//! crates/countdown_core/src/vocabulary.rs
//!
//! The English vocabulary hub: topics, word lists and per-user learning
//! progress (`vocabulary` and `user_learning_progress` collections).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{TrackerError, TrackerResult};
use crate::ports::{Document, DocumentStore, PortResult, Query};

pub const VOCABULARY: &str = "vocabulary";
pub const LEARNING_PROGRESS: &str = "user_learning_progress";

/// Number of built-in topics.
pub const TOPIC_COUNT: u32 = 17;

/// Topic averages at or above this never count as the weakest topic.
const WEAKEST_SCORE_CEILING: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
}

pub fn default_topics() -> Vec<Topic> {
    (1..=TOPIC_COUNT)
        .map(|i| Topic {
            id: format!("topic_{i}"),
            title: format!("Topic {i}"),
            description: format!("Thematic vocabulary {i}"),
            icon: "📚".to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabItem {
    pub id: String,
    pub topic_id: String,
    pub word: String,
    /// Part of speech as written on the card: "n", "adv", "phrase"...
    #[serde(rename = "type")]
    pub word_type: String,
    #[serde(default)]
    pub pronunciation: String,
    pub meaning: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
}

/// Sample cards served for a topic that has no words yet.
pub fn demo_words(topic_id: &str) -> Vec<VocabItem> {
    let card = |n: u32, word: &str, word_type: &str, pronunciation: &str, meaning: &str, level: &str| VocabItem {
        id: format!("demo_{n}"),
        topic_id: topic_id.to_string(),
        word: word.to_string(),
        word_type: word_type.to_string(),
        pronunciation: pronunciation.to_string(),
        meaning: meaning.to_string(),
        level: level.to_string(),
        synonyms: Vec::new(),
        antonyms: Vec::new(),
    };

    vec![
        VocabItem {
            antonyms: vec!["keep a promise".to_string()],
            ..card(1, "break a promise", "phrase", "/breɪk ə ˈprɒmɪs/", "thất hứa", "B1")
        },
        card(2, "geographer", "n", "/dʒiˈɒɡrəfə(r)/", "nhà địa lý học", "B2"),
        VocabItem {
            synonyms: vec!["usually".to_string()],
            antonyms: vec!["abnormally".to_string()],
            ..card(3, "normally", "adv", "/ˈnɔːməli/", "thông thường", "B1")
        },
        VocabItem {
            synonyms: vec!["sunlight".to_string()],
            antonyms: vec!["darkness".to_string()],
            ..card(4, "daylight", "n", "/ˈdeɪlaɪt/", "ánh sáng ban ngày", "B1")
        },
    ]
}

pub fn vocabulary_query(topic_id: &str) -> Query {
    Query::collection(VOCABULARY)
        .where_eq("topicId", topic_id)
        .order_by_asc("word")
}

fn decode_all<T: serde::de::DeserializeOwned>(documents: &[Document], kind: &str) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping malformed {} {}: {}", kind, doc.id, e);
                None
            }
        })
        .collect()
}

/// The words of a topic, alphabetical. Falls back to the demo cards when
/// the topic has none.
pub async fn load_vocabulary(store: &dyn DocumentStore, topic_id: &str) -> PortResult<Vec<VocabItem>> {
    let documents = store.query_once(vocabulary_query(topic_id)).await?;
    let words: Vec<VocabItem> = decode_all(&documents, "vocabulary item");
    if words.is_empty() {
        return Ok(demo_words(topic_id));
    }
    Ok(words)
}

//=========================================================================================
// Learning Progress
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordStatus {
    Memorized,
    Learning,
}

/// One step of study on a topic, as reported by the flashcard and quiz views.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressUpdate {
    Flashcard {
        #[serde(rename = "wordId")]
        word_id: String,
        status: WordStatus,
    },
    Quiz {
        score: u32,
    },
    Time {
        seconds: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub score: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub topic_id: String,
    pub user_id: String,
    #[serde(default)]
    pub memorized: Vec<String>,
    #[serde(default)]
    pub learning: Vec<String>,
    #[serde(default)]
    pub quiz_scores: Vec<QuizScore>,
    #[serde(default)]
    pub study_seconds: u64,
    #[serde(default)]
    pub last_studied: i64,
}

impl TopicProgress {
    pub fn new(user_id: &str, topic_id: &str) -> Self {
        Self {
            topic_id: topic_id.to_string(),
            user_id: user_id.to_string(),
            memorized: Vec::new(),
            learning: Vec::new(),
            quiz_scores: Vec::new(),
            study_seconds: 0,
            last_studied: 0,
        }
    }

    /// Folds one update in. A word sits in at most one of the two lists.
    pub fn apply(&mut self, update: &ProgressUpdate, now: DateTime<Utc>) {
        let timestamp = now.timestamp_millis();
        match update {
            ProgressUpdate::Flashcard { word_id, status } => {
                self.memorized.retain(|id| id != word_id);
                self.learning.retain(|id| id != word_id);
                match status {
                    WordStatus::Memorized => self.memorized.push(word_id.clone()),
                    WordStatus::Learning => self.learning.push(word_id.clone()),
                }
            }
            ProgressUpdate::Quiz { score } => self.quiz_scores.push(QuizScore {
                score: *score,
                timestamp,
            }),
            ProgressUpdate::Time { seconds } => {
                self.study_seconds = self.study_seconds.saturating_add(*seconds);
            }
        }
        self.last_studied = timestamp;
    }

    fn average_score(&self) -> Option<f64> {
        if self.quiz_scores.is_empty() {
            return None;
        }
        let total: u64 = self.quiz_scores.iter().map(|q| u64::from(q.score)).sum();
        Some(total as f64 / self.quiz_scores.len() as f64)
    }
}

/// Document id of a user's progress on a topic.
pub fn progress_id(user_id: &str, topic_id: &str) -> String {
    format!("{user_id}_{topic_id}")
}

pub fn progress_query(user_id: &str) -> Query {
    Query::collection(LEARNING_PROGRESS).where_eq("userId", user_id)
}

pub async fn load_progress(store: &dyn DocumentStore, user_id: &str) -> PortResult<Vec<TopicProgress>> {
    let documents = store.query_once(progress_query(user_id)).await?;
    Ok(decode_all(&documents, "progress"))
}

/// Reads the user's progress on a topic, applies the update and writes it back.
pub async fn save_progress(
    store: &dyn DocumentStore,
    user_id: &str,
    topic_id: &str,
    update: &ProgressUpdate,
    now: DateTime<Utc>,
) -> TrackerResult<TopicProgress> {
    if topic_id.trim().is_empty() {
        return Err(TrackerError::InvalidProgress("topic must not be empty".to_string()));
    }
    if let ProgressUpdate::Flashcard { word_id, .. } = update {
        if word_id.trim().is_empty() {
            return Err(TrackerError::InvalidProgress("word must not be empty".to_string()));
        }
    }

    let id = progress_id(user_id, topic_id);
    let existing = store
        .get(LEARNING_PROGRESS, &id)
        .await
        .map_err(TrackerError::WriteFailure)?;
    let mut progress = match existing.map(|doc| doc.decode::<TopicProgress>()) {
        Some(Ok(progress)) => progress,
        Some(Err(e)) => {
            warn!("Replacing unreadable progress {}: {}", id, e);
            TopicProgress::new(user_id, topic_id)
        }
        None => TopicProgress::new(user_id, topic_id),
    };
    progress.apply(update, now);

    let data = serde_json::to_value(&progress)
        .map_err(|e| TrackerError::InvalidProgress(e.to_string()))?;
    store
        .put(LEARNING_PROGRESS, &id, data)
        .await
        .map_err(TrackerError::WriteFailure)?;
    info!("Saved progress {}", id);
    Ok(progress)
}

//=========================================================================================
// Statistics
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakestTopic {
    pub topic_id: String,
    pub average_score: f64,
}

/// Totals shown on the progress dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub total_memorized: usize,
    pub total_learning: usize,
    pub total_learned: usize,
    pub total_study_seconds: u64,
    /// Any topic studied since midnight UTC.
    pub studied_today: bool,
    pub average_score: u32,
    pub weakest_topic: Option<WeakestTopic>,
}

impl LearningStats {
    pub fn from_progress(progress: &[TopicProgress], now: DateTime<Utc>) -> Self {
        let total_memorized: usize = progress.iter().map(|p| p.memorized.len()).sum();
        let total_learning: usize = progress.iter().map(|p| p.learning.len()).sum();
        let total_study_seconds = progress
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.study_seconds));

        let start_of_today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight).timestamp_millis())
            .unwrap_or_default();
        let studied_today = progress.iter().any(|p| p.last_studied >= start_of_today);

        let quizzes = progress.iter().map(|p| p.quiz_scores.len()).sum::<usize>();
        let total_score: u64 = progress
            .iter()
            .flat_map(|p| &p.quiz_scores)
            .map(|q| u64::from(q.score))
            .sum();
        let average_score = if quizzes > 0 {
            (total_score as f64 / quizzes as f64).round() as u32
        } else {
            0
        };

        let mut weakest_topic: Option<WeakestTopic> = None;
        for p in progress {
            let Some(average) = p.average_score() else { continue };
            let threshold = weakest_topic
                .as_ref()
                .map_or(WEAKEST_SCORE_CEILING, |w| w.average_score);
            if average < threshold {
                weakest_topic = Some(WeakestTopic {
                    topic_id: p.topic_id.clone(),
                    average_score: average,
                });
            }
        }

        Self {
            total_memorized,
            total_learning,
            total_learned: total_memorized + total_learning,
            total_study_seconds,
            studied_today,
            average_score,
            weakest_topic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, SnapshotSubscription};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Keyed documents of one collection at a time, enough for progress writes.
    #[derive(Default)]
    struct KeyedStore {
        docs: Mutex<HashMap<(String, String), Value>>,
        vocabulary: Vec<Document>,
    }

    #[async_trait]
    impl DocumentStore for KeyedStore {
        async fn append(&self, _collection: &str, _data: Value) -> PortResult<String> {
            Err(PortError::Unexpected("not used".into()))
        }
        async fn subscribe(&self, _query: Query) -> PortResult<SnapshotSubscription> {
            Err(PortError::Unexpected("not used".into()))
        }
        async fn query_once(&self, query: Query) -> PortResult<Vec<Document>> {
            if query.collection == VOCABULARY {
                return Ok(query.apply(&self.vocabulary));
            }
            let docs: Vec<Document> = self
                .docs
                .lock()
                .unwrap()
                .iter()
                .filter(|((collection, _), _)| *collection == query.collection)
                .map(|((_, id), data)| Document {
                    id: id.clone(),
                    data: data.clone(),
                })
                .collect();
            Ok(query.apply(&docs))
        }
        async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Document>> {
            let docs = self.docs.lock().unwrap();
            Ok(docs
                .get(&(collection.to_string(), id.to_string()))
                .map(|data| Document {
                    id: id.to_string(),
                    data: data.clone(),
                }))
        }
        async fn put(&self, collection: &str, id: &str, data: Value) -> PortResult<()> {
            self.docs
                .lock()
                .unwrap()
                .insert((collection.to_string(), id.to_string()), data);
            Ok(())
        }
        async fn delete(&self, _collection: &str, _ids: &[String]) -> PortResult<usize> {
            Ok(0)
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
    }

    fn flashcard(word: &str, status: WordStatus) -> ProgressUpdate {
        ProgressUpdate::Flashcard {
            word_id: word.to_string(),
            status,
        }
    }

    #[test]
    fn seventeen_default_topics() {
        let topics = default_topics();
        assert_eq!(topics.len(), 17);
        assert_eq!(topics[0].id, "topic_1");
        assert_eq!(topics[16].id, "topic_17");
    }

    #[test]
    fn update_wire_format_uses_type_tags() {
        let update: ProgressUpdate =
            serde_json::from_value(json!({"type": "flashcard", "wordId": "w1", "status": "memorized"})).unwrap();
        assert_eq!(update, flashcard("w1", WordStatus::Memorized));

        let update: ProgressUpdate = serde_json::from_value(json!({"type": "time", "seconds": 5})).unwrap();
        assert_eq!(update, ProgressUpdate::Time { seconds: 5 });
    }

    #[test]
    fn a_word_moves_between_lists_without_duplicates() {
        let mut progress = TopicProgress::new("u1", "topic_1");
        progress.apply(&flashcard("w1", WordStatus::Learning), noon());
        progress.apply(&flashcard("w1", WordStatus::Learning), noon());
        assert_eq!(progress.learning, vec!["w1"]);

        progress.apply(&flashcard("w1", WordStatus::Memorized), noon());
        assert!(progress.learning.is_empty());
        assert_eq!(progress.memorized, vec!["w1"]);
        assert_eq!(progress.last_studied, noon().timestamp_millis());
    }

    #[test]
    fn quiz_and_time_updates_accumulate() {
        let mut progress = TopicProgress::new("u1", "topic_2");
        progress.apply(&ProgressUpdate::Quiz { score: 30 }, noon());
        progress.apply(&ProgressUpdate::Time { seconds: 1 }, noon());
        progress.apply(&ProgressUpdate::Time { seconds: 1 }, noon());

        assert_eq!(progress.quiz_scores, vec![QuizScore { score: 30, timestamp: noon().timestamp_millis() }]);
        assert_eq!(progress.study_seconds, 2);
    }

    #[test]
    fn stats_sum_topics_and_find_the_weakest() {
        let mut first = TopicProgress::new("u1", "topic_1");
        first.memorized = vec!["a".into(), "b".into()];
        first.learning = vec!["c".into()];
        first.study_seconds = 120;
        first.quiz_scores = vec![QuizScore { score: 40, timestamp: 0 }, QuizScore { score: 50, timestamp: 0 }];
        first.last_studied = (noon() - chrono::Duration::days(2)).timestamp_millis();

        let mut second = TopicProgress::new("u1", "topic_2");
        second.learning = vec!["d".into()];
        second.study_seconds = 60;
        second.quiz_scores = vec![QuizScore { score: 20, timestamp: 0 }];
        second.last_studied = (noon() - chrono::Duration::hours(3)).timestamp_millis();

        let stats = LearningStats::from_progress(&[first, second], noon());

        assert_eq!(stats.total_memorized, 2);
        assert_eq!(stats.total_learning, 2);
        assert_eq!(stats.total_learned, 4);
        assert_eq!(stats.total_study_seconds, 180);
        assert!(stats.studied_today);
        assert_eq!(stats.average_score, 37);
        let weakest = stats.weakest_topic.unwrap();
        assert_eq!(weakest.topic_id, "topic_2");
        assert_eq!(weakest.average_score, 20.0);
    }

    #[test]
    fn stats_without_progress_are_zero() {
        let stats = LearningStats::from_progress(&[], noon());
        assert_eq!(stats.total_learned, 0);
        assert_eq!(stats.average_score, 0);
        assert!(!stats.studied_today);
        assert!(stats.weakest_topic.is_none());
    }

    #[test]
    fn perfect_averages_are_never_the_weakest() {
        let mut progress = TopicProgress::new("u1", "topic_3");
        progress.quiz_scores = vec![QuizScore { score: 100, timestamp: 0 }];
        let stats = LearningStats::from_progress(&[progress], noon());
        assert_eq!(stats.average_score, 100);
        assert!(stats.weakest_topic.is_none());
    }

    #[test]
    fn yesterday_evening_is_not_today() {
        let mut progress = TopicProgress::new("u1", "topic_1");
        progress.last_studied = Utc.with_ymd_and_hms(2026, 5, 19, 23, 59, 0).unwrap().timestamp_millis();
        let stats = LearningStats::from_progress(&[progress], noon());
        assert!(!stats.studied_today);
    }

    #[tokio::test]
    async fn save_progress_merges_into_the_stored_document() {
        let store = KeyedStore::default();

        save_progress(&store, "u1", "topic_1", &flashcard("w1", WordStatus::Learning), noon())
            .await
            .unwrap();
        let progress = save_progress(&store, "u1", "topic_1", &ProgressUpdate::Time { seconds: 45 }, noon())
            .await
            .unwrap();

        assert_eq!(progress.learning, vec!["w1"]);
        assert_eq!(progress.study_seconds, 45);

        let loaded = load_progress(&store, "u1").await.unwrap();
        assert_eq!(loaded, vec![progress]);
        assert!(load_progress(&store, "u2").await.unwrap().is_empty());
        assert!(store.docs.lock().unwrap().contains_key(&(LEARNING_PROGRESS.to_string(), "u1_topic_1".to_string())));
    }

    #[tokio::test]
    async fn blank_word_is_rejected_before_any_write() {
        let store = KeyedStore::default();
        let result = save_progress(&store, "u1", "topic_1", &flashcard(" ", WordStatus::Memorized), noon()).await;
        assert!(matches!(result, Err(TrackerError::InvalidProgress(_))));
        assert!(store.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_topics_serve_the_demo_words() {
        let store = KeyedStore::default();
        let words = load_vocabulary(&store, "topic_5").await.unwrap();
        assert_eq!(words.len(), 4);
        assert!(words.iter().all(|w| w.topic_id == "topic_5"));
        assert_eq!(words[0].word, "break a promise");
    }

    #[tokio::test]
    async fn stored_words_come_back_alphabetically() {
        let word = |id: &str, topic: &str, word: &str| Document {
            id: id.to_string(),
            data: json!({"topicId": topic, "word": word, "type": "n", "meaning": "-"}),
        };
        let store = KeyedStore {
            vocabulary: vec![word("1", "topic_1", "zeal"), word("2", "topic_2", "other"), word("3", "topic_1", "apt")],
            ..Default::default()
        };

        let words = load_vocabulary(&store, "topic_1").await.unwrap();
        let names: Vec<_> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(names, vec!["apt", "zeal"]);
        assert_eq!(words[0].id, "3");
    }
}
