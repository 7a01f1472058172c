//! crates/countdown_core/src/error.rs
//!
//! Errors raised by the study tracker and message board operations.

use crate::ports::PortError;
use crate::timer::TimerState;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The action needs a signed-in or guest user.
    #[error("Sign in to start studying")]
    AuthRequired,

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot {action} while the session is {from:?}")]
    InvalidTransition {
        from: TimerState,
        action: &'static str,
    },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid progress update: {0}")]
    InvalidProgress(String),

    /// The durable write was rejected. A finishing session has already been cleared.
    #[error("Failed to save: {0}")]
    WriteFailure(#[source] PortError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
