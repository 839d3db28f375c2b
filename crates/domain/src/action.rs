//! Action — metadata for the terminal system operations.
//!
//! The executable side lives behind the `SystemAction` port in the app
//! crate; this module only names the variants and their discovery record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// The terminal operations idlewatch knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Shutdown,
    Restart,
    Suspend,
    Hibernate,
    SignOut,
    Lock,
}

impl ActionKind {
    pub const ALL: [Self; 6] = [
        Self::Shutdown,
        Self::Restart,
        Self::Suspend,
        Self::Hibernate,
        Self::SignOut,
        Self::Lock,
    ];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
            Self::Suspend => "suspend",
            Self::Hibernate => "hibernate",
            Self::SignOut => "sign_out",
            Self::Lock => "lock",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Shutdown => "Shut Down",
            Self::Restart => "Restart",
            Self::Suspend => "Sleep",
            Self::Hibernate => "Hibernate",
            Self::SignOut => "Sign Out",
            Self::Lock => "Lock Screen",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Shutdown => "Power off the computer",
            Self::Restart => "Reboot the computer",
            Self::Suspend => "Suspend to RAM",
            Self::Hibernate => "Suspend to disk and power off",
            Self::SignOut => "End the current user session",
            Self::Lock => "Lock the screen without ending the session",
        }
    }

    /// Discovery record for this kind.
    #[must_use]
    pub fn info(self, available: bool) -> ActionInfo {
        ActionInfo {
            id: self.id().to_string(),
            name: self.display_name().to_string(),
            description: self.description().to_string(),
            available,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| ActionError::Unknown(s.to_string()))
    }
}

/// Discovery record rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub available: bool,
}
