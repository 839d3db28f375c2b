//! Trigger — states, kinds and the tagged configuration that selects one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::signal::RollingRate;

/// Interface name that asks for automatic interface selection.
pub const AUTO_INTERFACE: &str = "auto";

/// What a trigger reports after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    /// Not started, or no usable reading yet.
    #[default]
    Idle,
    /// Polling and producing readings.
    Active,
    /// The trigger itself judges its precondition met.
    Triggered,
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Active => f.write_str("active"),
            Self::Triggered => f.write_str("triggered"),
        }
    }
}

/// The trigger kinds this build knows how to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    NetworkIdle,
    ProcessIdle,
}

impl TriggerKind {
    pub const ALL: [Self; 2] = [Self::NetworkIdle, Self::ProcessIdle];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::NetworkIdle => "network_idle",
            Self::ProcessIdle => "process_idle",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::NetworkIdle => "Network Idle",
            Self::ProcessIdle => "Process Idle",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::NetworkIdle => "Fires when interface throughput stays below a threshold",
            Self::ProcessIdle => "Fires when every watched process has gone quiet",
        }
    }

    /// Discovery record for this kind.
    #[must_use]
    pub fn info(self, available: bool) -> TriggerInfo {
        TriggerInfo {
            id: self.id().to_string(),
            name: self.display_name().to_string(),
            description: self.description().to_string(),
            available,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Discovery record rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub available: bool,
}

/// Per-kind trigger parameters; the tag selects the implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    NetworkIdle {
        /// Interface to sample, or `"auto"` for the busiest one.
        #[serde(default = "default_interface")]
        interface: String,
        /// Number of rates averaged by the sampler.
        #[serde(default = "default_window")]
        window: usize,
    },
    ProcessIdle {
        /// Process names to watch (case-insensitive).
        watched: Vec<String>,
        /// Names never considered, even when watched.
        #[serde(default)]
        excluded: Vec<String>,
        /// Per-process activity (bytes/s) at or below which a process counts as quiet.
        #[serde(default)]
        activity_floor_bps: u64,
    },
}

fn default_interface() -> String {
    AUTO_INTERFACE.to_string()
}

fn default_window() -> usize {
    RollingRate::DEFAULT_WINDOW
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::NetworkIdle {
            interface: default_interface(),
            window: default_window(),
        }
    }
}

impl TriggerConfig {
    #[must_use]
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::NetworkIdle { .. } => TriggerKind::NetworkIdle,
            Self::ProcessIdle { .. } => TriggerKind::ProcessIdle,
        }
    }

    /// Check the parameters before a session starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyInterface`], [`ConfigError::EmptyWindow`]
    /// or [`ConfigError::EmptyWatchList`] for the corresponding mistakes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::NetworkIdle { interface, window } => {
                if interface.trim().is_empty() {
                    return Err(ConfigError::EmptyInterface);
                }
                if *window == 0 {
                    return Err(ConfigError::EmptyWindow);
                }
            }
            Self::ProcessIdle { watched, .. } => {
                if watched.iter().all(|name| name.trim().is_empty()) {
                    return Err(ConfigError::EmptyWatchList);
                }
            }
        }
        Ok(())
    }

    /// Short human text used as the `trigger_reason` in the activity log.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::NetworkIdle { interface, .. } => format!("Network idle on {interface}"),
            Self::ProcessIdle { watched, .. } => {
                format!("Processes idle: {}", watched.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_auto_network_trigger() {
        let config = TriggerConfig::default();
        assert_eq!(config.kind(), TriggerKind::NetworkIdle);
        assert!(matches!(
            config,
            TriggerConfig::NetworkIdle { ref interface, window: 3 } if interface == "auto"
        ));
    }

    #[test]
    fn should_reject_empty_watch_list() {
        let config = TriggerConfig::ProcessIdle {
            watched: vec![],
            excluded: vec![],
            activity_floor_bps: 1_000,
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyWatchList)));
    }

    #[test]
    fn should_reject_blank_interface() {
        let config = TriggerConfig::NetworkIdle {
            interface: "  ".to_string(),
            window: 3,
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyInterface)));
    }

    #[test]
    fn should_reject_zero_window() {
        let config = TriggerConfig::NetworkIdle {
            interface: "eth0".to_string(),
            window: 0,
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyWindow)));
    }

    #[test]
    fn should_deserialize_process_trigger_from_tagged_json() {
        let json = serde_json::json!({
            "type": "process_idle",
            "watched": ["steam.exe"],
            "activity_floor_bps": 2048
        });
        let config: TriggerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.kind(), TriggerKind::ProcessIdle);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_fill_network_defaults_when_fields_omitted() {
        let config: TriggerConfig =
            serde_json::from_value(serde_json::json!({"type": "network_idle"})).unwrap();
        assert_eq!(config, TriggerConfig::default());
    }

    #[test]
    fn should_expose_unique_kind_ids() {
        let ids: Vec<_> = TriggerKind::ALL.iter().map(|k| k.id()).collect();
        assert_eq!(ids, ["network_idle", "process_idle"]);
    }
}
