//! crates/countdown_core/src/timer.rs
//!
//! The study session state machine: `Idle -> Configuring -> Running <-> Paused
//! -> Finished -> Idle`. The machine is synchronous and clock-free; callers pass
//! the current instant and drive `tick` once per second while running.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::domain::{NewStudyLog, SessionConfig, SessionRun, User, DEFAULT_LEARNER_NAME};
use crate::error::{TrackerError, TrackerResult};

/// Note stored when the user finishes without writing one.
pub const DEFAULT_SESSION_NOTE: &str = "Session completed!";

pub const MOTIVATIONAL_QUOTES: [&str; 10] = [
    "No pressure, no diamonds.",
    "Whether the future laughs or cries depends on how lazy the past was.",
    "Every page you turn is a step toward the goal.",
    "Better to sweat over the books than to cry over the exam paper.",
    "Keep your head up, or the crown falls.",
    "Skip the books to play and you trade away your future.",
    "A little more effort, university is waving at you!",
    "It does not matter how slowly you go as long as you do not stop.",
    "Dreams are free, making them real takes everything you have.",
    "The pain of discipline weighs far less than the pain of regret.",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Configuring,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Default)]
pub struct StudyTimer {
    state: TimerState,
    pending: Option<SessionConfig>,
    run: Option<SessionRun>,
}

impl StudyTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn run(&self) -> Option<&SessionRun> {
        self.run.as_ref()
    }

    pub fn pending_config(&self) -> Option<&SessionConfig> {
        self.pending.as_ref()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TimerState::Running | TimerState::Paused)
    }

    /// Holds a draft configuration while the user is still choosing.
    pub fn configure(&mut self, config: SessionConfig) -> TrackerResult<()> {
        match self.state {
            TimerState::Idle | TimerState::Configuring => {
                self.pending = Some(config);
                self.state = TimerState::Configuring;
                Ok(())
            }
            from => Err(TrackerError::InvalidTransition {
                from,
                action: "configure",
            }),
        }
    }

    /// Starts a session. Nothing changes unless every precondition holds.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        user: Option<&User>,
        config: SessionConfig,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> TrackerResult<&SessionRun> {
        if user.is_none() {
            return Err(TrackerError::AuthRequired);
        }
        if !matches!(self.state, TimerState::Idle | TimerState::Configuring) {
            return Err(TrackerError::InvalidTransition {
                from: self.state,
                action: "start",
            });
        }
        config.validate().map_err(TrackerError::InvalidConfig)?;

        let quote = MOTIVATIONAL_QUOTES
            .choose(rng)
            .copied()
            .unwrap_or(MOTIVATIONAL_QUOTES[0]);

        self.pending = None;
        self.state = TimerState::Running;
        Ok(&*self.run.insert(SessionRun {
            config,
            started_at: now,
            elapsed_seconds: 0,
            is_running: true,
            motivational_quote: quote,
        }))
    }

    /// Advances the clock by one second. Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        match self.run.as_mut() {
            Some(run) => {
                run.elapsed_seconds += 1;
                true
            }
            None => false,
        }
    }

    pub fn pause(&mut self) -> TrackerResult<()> {
        match (self.state, self.run.as_mut()) {
            (TimerState::Running, Some(run)) => {
                run.is_running = false;
                self.state = TimerState::Paused;
                Ok(())
            }
            (from, _) => Err(TrackerError::InvalidTransition {
                from,
                action: "pause",
            }),
        }
    }

    /// Resumes a paused session. Once the target is reached the session can
    /// only be finished.
    pub fn resume(&mut self) -> TrackerResult<()> {
        match (self.state, self.run.as_mut()) {
            (TimerState::Paused, Some(run)) if run.remaining_seconds() > 0 => {
                run.is_running = true;
                self.state = TimerState::Running;
                Ok(())
            }
            (from, _) => Err(TrackerError::InvalidTransition {
                from,
                action: "resume",
            }),
        }
    }

    pub fn remaining_seconds(&self) -> Option<u64> {
        self.run.as_ref().map(SessionRun::remaining_seconds)
    }

    /// The target has been reached. Overrun keeps counting until `finish`.
    pub fn is_overdue(&self) -> bool {
        self.remaining_seconds() == Some(0)
    }

    /// Ends the session and builds the record to persist. The machine moves to
    /// `Finished` and drops its session-local state; call [`StudyTimer::reset`]
    /// once the write has resolved.
    pub fn finish(&mut self, user: Option<&User>, now: DateTime<Utc>) -> TrackerResult<NewStudyLog> {
        let user = user.ok_or(TrackerError::AuthRequired)?;
        if !self.is_active() {
            return Err(TrackerError::InvalidTransition {
                from: self.state,
                action: "finish",
            });
        }
        let run = self.run.take().ok_or(TrackerError::InvalidTransition {
            from: self.state,
            action: "finish",
        })?;

        self.state = TimerState::Finished;
        self.pending = None;
        Ok(build_log(user, run, now))
    }

    /// Returns to `Idle` after a finished session.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.pending = None;
        self.run = None;
    }
}

fn build_log(user: &User, run: SessionRun, now: DateTime<Utc>) -> NewStudyLog {
    let duration_minutes = u32::try_from(run.elapsed_seconds / 60)
        .unwrap_or(u32::MAX)
        .max(1);
    let target_minutes = run.config.target_minutes;

    let user_name = match user.display_name.trim() {
        "" => DEFAULT_LEARNER_NAME.to_string(),
        name => name.to_string(),
    };
    let notes = run
        .config
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_NOTE.to_string());

    NewStudyLog {
        user_id: user.id.clone(),
        user_name,
        user_avatar: user.avatar_url.clone().unwrap_or_default(),
        subject: run.config.subject,
        duration_minutes,
        target_minutes,
        notes,
        is_completed: duration_minutes >= target_minutes,
        timestamp: now.timestamp_millis(),
    }
}
