//! Session — lifecycle status, per-tick reports and broadcast events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::ConditionResult;
use crate::id::SessionId;
use crate::reading::Reading;
use crate::scheduler::{SchedulerEvent, SchedulerState};
use crate::trigger::TriggerState;

/// Lifecycle of one monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Monitoring,
    /// Paused by the caller.
    Paused,
    /// Halted by repeated read failures or a failed action; needs `resume()`.
    Errored,
    /// The action executed; nothing left to do.
    Finished,
}

impl SessionStatus {
    /// `true` when the session still counts against the single-session rule.
    #[must_use]
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Finished)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monitoring => f.write_str("monitoring"),
            Self::Paused => f.write_str("paused"),
            Self::Errored => f.write_str("errored"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Snapshot of everything one tick observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub trigger_state: TriggerState,
    /// `None` when the tick did not read (paused, errored) or the read failed.
    pub reading: Option<Reading>,
    pub condition: ConditionResult,
    pub scheduler_state: SchedulerState,
    /// Seconds left before execution while an action is in flight.
    pub remaining_seconds: Option<u64>,
    pub events: Vec<SchedulerEvent>,
}

/// Notifications broadcast to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    SessionStarted { session_id: SessionId },
    Tick(TickReport),
    SessionPaused { session_id: SessionId },
    SessionResumed { session_id: SessionId },
    /// A stage failed; `message` carries the stage prefix.
    SessionErrored { session_id: SessionId, message: String },
    SessionStopped { session_id: SessionId },
}
