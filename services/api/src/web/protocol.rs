//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for driving one study session.

use countdown_core::domain::{LeaderboardEntry, SessionConfig, StudyLogRecord, Subject};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Stores a configuration without starting the timer.
    Configure { config: SessionConfig },

    /// Starts the timer with the given configuration, or the one stored by `Configure`.
    Start {
        #[serde(default)]
        config: Option<SessionConfig>,
    },

    Pause,

    Resume,

    /// Ends the session and saves its study log.
    Finish,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a stored configuration.
    Configured { config: SessionConfig },

    SessionStarted {
        subject: Subject,
        target_minutes: u32,
        /// Milliseconds since the epoch.
        started_at: i64,
        planned_end: i64,
        motivational_quote: String,
    },

    /// Sent once per second while the timer runs.
    Tick {
        elapsed_seconds: u64,
        remaining_seconds: u64,
        is_overdue: bool,
    },

    SessionPaused { elapsed_seconds: u64 },

    SessionResumed { elapsed_seconds: u64 },

    /// The study log was written.
    SessionSaved { record: StudyLogRecord },

    /// The write failed. The session is cleared and the record is lost.
    SaveFailed { message: String },

    /// Starting a session needs a signed-in or guest user.
    AuthRequired { message: String },

    InvalidConfig { message: String },

    /// The newest leaderboard, pushed whenever the study feed changes.
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
        recent: Vec<StudyLogRecord>,
    },

    /// Reports a rejected command to the client.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_tagged_by_type() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"start","config":{"subject":"physics","target_minutes":45}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Start { config: Some(config) } => {
                assert_eq!(config.subject, Subject::Physics);
                assert_eq!(config.target_minutes, 45);
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Start { config: None }));
    }

    #[test]
    fn server_messages_use_snake_case_tags() {
        let json = serde_json::to_value(ServerMessage::Tick {
            elapsed_seconds: 61,
            remaining_seconds: 1739,
            is_overdue: false,
        })
        .unwrap();
        assert_eq!(json["type"], "tick");
        assert_eq!(json["remaining_seconds"], 1739);

        let json = serde_json::to_value(ServerMessage::SaveFailed {
            message: "offline".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "save_failed");
    }
}
