//! Session identifier backed by a UUID.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle for one monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl Default for SessionId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl SessionId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
