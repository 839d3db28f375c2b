//! Common error types used across the workspace.
//!
//! Each pipeline stage owns a typed error. [`IdleWatchError`] is the
//! umbrella carried across port boundaries and converts from every stage
//! error via `#[from]`.

use std::fmt;

use crate::id::SessionId;
use crate::scheduler::SchedulerState;

/// Boxed error used when an adapter wraps a foreign failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while reading a signal.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// The signal provider could not be read at all.
    #[error("signal provider `{provider}` unavailable")]
    ProviderUnavailable {
        provider: &'static str,
        #[source]
        source: BoxError,
    },

    /// The monitored network interface is missing (or vanished mid-session).
    #[error("network interface `{0}` not found")]
    InterfaceNotFound(String),

    /// No interface could be picked automatically.
    #[error("no network interface available for automatic selection")]
    NoDefaultInterface,

    /// `evaluate()` was called before `start()`.
    #[error("trigger has not been started")]
    NotStarted,
}

/// Failures while judging a reading.
#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
    /// The reading does not carry a field the condition needs.
    #[error("reading has no `{0}` field")]
    MissingField(String),

    /// The field exists but holds a value of the wrong type.
    #[error("reading field `{key}` is not {expected}")]
    WrongType { key: String, expected: &'static str },
}

/// Failures while validating or executing a system action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The host cannot perform this action.
    #[error("`{action}` is not supported on this host: {reason}")]
    Unsupported { action: String, reason: String },

    /// The host refused the action for lack of privilege.
    #[error("insufficient privilege to run `{action}`")]
    InsufficientPrivilege { action: String },

    /// Spawning the underlying system call failed.
    #[error("failed to launch `{action}`")]
    Launch {
        action: String,
        #[source]
        source: std::io::Error,
    },

    /// The system call ran but reported failure.
    #[error("`{action}` exited with status {code}")]
    Failed { action: String, code: i32 },

    /// No action with that identifier is registered.
    #[error("unknown action `{0}`")]
    Unknown(String),
}

/// Invalid operations on the action scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The operation is not valid from the current state.
    #[error("cannot {operation} while scheduler is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SchedulerState,
    },
}

/// Malformed or out-of-range configuration, rejected before a session starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Network mode requires an interface name (or `"auto"`).
    #[error("network interface name must not be empty")]
    EmptyInterface,

    /// Process mode requires at least one watched process.
    #[error("process mode requires at least one watched process")]
    EmptyWatchList,

    /// The rolling average window must hold at least one sample.
    #[error("rolling window must hold at least one sample")]
    EmptyWindow,

    /// The condition threshold must be positive.
    #[error("threshold must be greater than zero")]
    ZeroThreshold,

    /// The configured action identifier is empty.
    #[error("action identifier must not be empty")]
    EmptyAction,

    /// A named setting holds an invalid value.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Session lifecycle violations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session is already running; it must be stopped first.
    #[error("monitoring session {0} is already active")]
    AlreadyActive(SessionId),

    /// The operation needs an active session.
    #[error("no monitoring session is active")]
    NoSession,

    /// The operation needs a paused session.
    #[error("monitoring session is not paused")]
    NotPaused,
}

/// Failures while encoding or decoding exported activity logs.
#[derive(Debug, thiserror::Error)]
pub enum LogFormatError {
    /// The requested export format is not recognised.
    #[error("unknown export format `{0}`")]
    UnknownFormat(String),

    /// A plain-text line could not be parsed.
    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    /// The structured document is not valid JSON for log entries.
    #[error("invalid structured log")]
    Json(#[from] serde_json::Error),
}

/// Base error enum carried across port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum IdleWatchError {
    #[error("trigger error")]
    Trigger(#[from] TriggerError),

    #[error("condition error")]
    Condition(#[from] ConditionError),

    #[error("action error")]
    Action(#[from] ActionError),

    #[error("scheduler error")]
    Scheduler(#[from] SchedulerError),

    #[error("configuration error")]
    Config(#[from] ConfigError),

    #[error("session error")]
    Session(#[from] SessionError),

    #[error("log format error")]
    LogFormat(#[from] LogFormatError),

    #[error("storage error")]
    Storage(#[source] BoxError),
}

impl IdleWatchError {
    /// The pipeline stage this failure belongs to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Trigger(_) => Some(Stage::Reading),
            Self::Condition(_) => Some(Stage::Evaluating),
            Self::Scheduler(_) | Self::Config(_) => Some(Stage::Scheduling),
            Self::Action(_) => Some(Stage::Executing),
            Self::Session(_) | Self::LogFormat(_) | Self::Storage(_) => None,
        }
    }
}

/// Pipeline stage a failure is attributed to in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reading,
    Evaluating,
    Scheduling,
    Executing,
}

impl Stage {
    /// Prefix `error` (and its source chain) with this stage's name.
    #[must_use]
    pub fn describe(self, error: &(dyn std::error::Error + 'static)) -> String {
        let mut text = format!("{self}: {error}");
        let mut source = error.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading => f.write_str("reading"),
            Self::Evaluating => f.write_str("evaluating"),
            Self::Scheduling => f.write_str("scheduling"),
            Self::Executing => f.write_str("executing"),
        }
    }
}
