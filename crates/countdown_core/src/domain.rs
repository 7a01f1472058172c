//! crates/countdown_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Wire-facing types carry serde derives with the field names used by the
//! `study_logs` and `wishes` collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name used when a user or poster gives no name.
pub const DEFAULT_LEARNER_NAME: &str = "Mystery learner";

// Represents a signed-in or guest user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_guest: bool,
}

/// The fixed set of exam subjects a session can be logged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    Literature,
    English,
    Physics,
    Chemistry,
    Biology,
    History,
    Geography,
    EconomicsAndLaw,
    InformationTechnology,
}

impl Subject {
    pub const ALL: [Subject; 10] = [
        Subject::Math,
        Subject::Literature,
        Subject::English,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::History,
        Subject::Geography,
        Subject::EconomicsAndLaw,
        Subject::InformationTechnology,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Literature => "literature",
            Subject::English => "english",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Biology => "biology",
            Subject::History => "history",
            Subject::Geography => "geography",
            Subject::EconomicsAndLaw => "economics_and_law",
            Subject::InformationTechnology => "information_technology",
        }
    }
}

/// Input to a study session, collected before the timer starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub subject: Subject,
    pub target_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SessionConfig {
    pub const MIN_TARGET_MINUTES: u32 = 5;
    pub const MAX_TARGET_MINUTES: u32 = 180;
    pub const TARGET_STEP_MINUTES: u32 = 5;

    pub fn new(subject: Subject, target_minutes: u32) -> Self {
        Self {
            subject,
            target_minutes,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks the target against the allowed range and step.
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        let target = self.target_minutes;
        if target == 0 {
            return Err("target minutes must be greater than zero".to_string());
        }
        if !(Self::MIN_TARGET_MINUTES..=Self::MAX_TARGET_MINUTES).contains(&target) {
            return Err(format!(
                "target minutes must be between {} and {}, got {}",
                Self::MIN_TARGET_MINUTES,
                Self::MAX_TARGET_MINUTES,
                target
            ));
        }
        if target % Self::TARGET_STEP_MINUTES != 0 {
            return Err(format!(
                "target minutes must be a multiple of {}, got {}",
                Self::TARGET_STEP_MINUTES,
                target
            ));
        }
        Ok(())
    }
}

/// A running or paused study session. Never persisted until it finishes.
#[derive(Debug, Clone)]
pub struct SessionRun {
    pub config: SessionConfig,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub is_running: bool,
    pub motivational_quote: &'static str,
}

impl SessionRun {
    pub fn target_seconds(&self) -> u64 {
        u64::from(self.config.target_minutes) * 60
    }

    /// Seconds left until the target, floored at zero.
    pub fn remaining_seconds(&self) -> u64 {
        self.target_seconds().saturating_sub(self.elapsed_seconds)
    }

    pub fn planned_end(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::minutes(i64::from(self.config.target_minutes))
    }
}

/// A study log about to be appended to the `study_logs` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudyLog {
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: String,
    pub subject: Subject,
    pub duration_minutes: u32,
    pub target_minutes: u32,
    pub notes: String,
    pub is_completed: bool,
    pub timestamp: i64,
}

impl NewStudyLog {
    pub fn with_id(self, id: impl Into<String>) -> StudyLogRecord {
        StudyLogRecord {
            id: id.into(),
            user_id: self.user_id,
            user_name: self.user_name,
            user_avatar: self.user_avatar,
            subject: self.subject,
            duration_minutes: self.duration_minutes,
            target_minutes: self.target_minutes,
            notes: self.notes,
            is_completed: self.is_completed,
            timestamp: self.timestamp,
        }
    }
}

/// A finished session as stored by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyLogRecord {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: String,
    pub subject: Subject,
    pub duration_minutes: u32,
    pub target_minutes: u32,
    pub notes: String,
    pub is_completed: bool,
    pub timestamp: i64,
}

/// Per-user totals derived from the record window. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: String,
    pub total_minutes: u64,
    pub sessions_count: u32,
    pub last_active: i64,
}

/// A message on the public board (`wishes` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub timestamp: i64,
    pub is_anonymous: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A board message ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub author: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub timestamp: i64,
    pub is_anonymous: bool,
    pub avatar_url: String,
}

/// Whole units left until the exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_step_in_range_is_valid() {
        for target in (5..=180).step_by(5) {
            assert!(SessionConfig::new(Subject::Math, target).validate().is_ok());
        }
    }

    #[test]
    fn out_of_range_or_off_step_targets_are_rejected() {
        for target in [0, 3, 7, 185, 200] {
            assert!(
                SessionConfig::new(Subject::Math, target).validate().is_err(),
                "target {target} should be rejected"
            );
        }
    }

    #[test]
    fn study_log_uses_collection_field_names() {
        let log = NewStudyLog {
            user_id: "u1".into(),
            user_name: "Lan".into(),
            user_avatar: String::new(),
            subject: Subject::EconomicsAndLaw,
            duration_minutes: 30,
            target_minutes: 30,
            notes: "ok".into(),
            is_completed: true,
            timestamp: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["durationMinutes"], 30);
        assert_eq!(value["isCompleted"], true);
        assert_eq!(value["subject"], "economics_and_law");
    }
}
