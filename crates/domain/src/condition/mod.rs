//! Condition — judges whether a sustained pattern holds across readings.
//!
//! Conditions only see [`Reading`]s; they never know which trigger kind
//! produced them. The configuration is a tagged union that maps 1:1 onto
//! the implementations.

mod threshold;

pub use threshold::{MonitorMode, ThresholdCondition};

use serde::{Deserialize, Serialize};

use crate::error::{ConditionError, ConfigError};
use crate::reading::Reading;

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConditionResult {
    /// The pattern is not currently observed.
    #[default]
    Waiting,
    /// The pattern is observed but has not lasted long enough.
    InProgress { elapsed_secs: u64 },
    /// The pattern lasted the full required duration.
    Met,
}

impl ConditionResult {
    #[must_use]
    pub fn is_met(self) -> bool {
        matches!(self, Self::Met)
    }
}

/// A stateful judge over a stream of readings.
pub trait Condition: Send + Sync {
    /// Machine-readable identifier of the implementation.
    fn name(&self) -> &'static str;

    /// Judge the latest reading.
    ///
    /// # Errors
    ///
    /// Returns a [`ConditionError`] when the reading lacks the fields this
    /// condition needs.
    fn evaluate(&mut self, reading: &Reading) -> Result<ConditionResult, ConditionError>;

    /// Forget any in-progress streak.
    fn reset(&mut self);
}

/// Per-kind condition parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionConfig {
    /// "Value stayed below X for Y seconds."
    Threshold {
        threshold_bytes_per_sec: u64,
        required_duration_secs: u64,
        #[serde(default)]
        monitor_mode: MonitorMode,
    },
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self::Threshold {
            threshold_bytes_per_sec: 100 * 1024,
            required_duration_secs: 120,
            monitor_mode: MonitorMode::default(),
        }
    }
}

impl ConditionConfig {
    /// Check the parameters before a session starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroThreshold`] when the ceiling is zero (no
    /// reading could ever be strictly below it).
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Threshold {
                threshold_bytes_per_sec,
                ..
            } => {
                if *threshold_bytes_per_sec == 0 {
                    return Err(ConfigError::ZeroThreshold);
                }
            }
        }
        Ok(())
    }

    /// Construct the condition this configuration describes.
    #[must_use]
    pub fn build(&self) -> Box<dyn Condition> {
        match self {
            Self::Threshold {
                threshold_bytes_per_sec,
                required_duration_secs,
                monitor_mode,
            } => Box::new(ThresholdCondition::new(
                *threshold_bytes_per_sec,
                *required_duration_secs,
                *monitor_mode,
            )),
        }
    }
}
