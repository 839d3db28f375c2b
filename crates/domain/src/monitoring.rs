//! Monitoring configuration — everything needed to start one session.

use serde::{Deserialize, Serialize};

use crate::condition::ConditionConfig;
use crate::error::ConfigError;
use crate::trigger::TriggerConfig;

/// Immutable parameters of one monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub trigger: TriggerConfig,
    pub condition: ConditionConfig,
    /// Identifier of the action to run, as listed by action discovery.
    pub action: String,
    pub pre_warning_seconds: u64,
    pub countdown_seconds: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerConfig::default(),
            condition: ConditionConfig::default(),
            action: "shutdown".to_string(),
            pre_warning_seconds: 60,
            countdown_seconds: 30,
        }
    }
}

impl MonitoringConfig {
    /// Validate every part of the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in the trigger, the condition
    /// or the action identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trigger.validate()?;
        self.condition.validate()?;
        if self.action.trim().is_empty() {
            return Err(ConfigError::EmptyAction);
        }
        Ok(())
    }
}
