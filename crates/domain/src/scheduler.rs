//! Scheduler states and the events emitted at each transition.
//!
//! ```text
//! Idle → Pending → Countdown → Executed
//!          ↓           ↓     ↘
//!      Cancelled   Cancelled  Failed
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the action scheduler currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    #[default]
    Idle,
    /// Scheduled; waiting out the pre-warning interval.
    Pending,
    /// Final cancellable interval before execution.
    Countdown,
    Executed,
    Cancelled,
    /// The action ran and reported failure.
    Failed,
}

impl SchedulerState {
    /// `true` while an action is scheduled but has not reached an outcome.
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Pending | Self::Countdown)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Pending => f.write_str("pending"),
            Self::Countdown => f.write_str("countdown"),
            Self::Executed => f.write_str("executed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Notification emitted by the scheduler, drained by the session owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// Emitted at `schedule()`; the countdown begins after this many seconds.
    PreWarning { seconds_until_countdown: u64 },
    CountdownStarted { total_seconds: u64 },
    CountdownTick { remaining_seconds: u64 },
    Executed,
    Cancelled,
    Failed { reason: String },
}
