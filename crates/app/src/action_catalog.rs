//! Action catalog — the registry of system actions available to sessions.

use std::sync::Arc;

use idlewatch_domain::action::ActionInfo;
use idlewatch_domain::error::ActionError;

use crate::ports::SystemAction;

/// Ordered registry of actions, looked up by identifier.
#[derive(Clone, Default)]
pub struct ActionCatalog {
    actions: Vec<Arc<dyn SystemAction>>,
}

impl ActionCatalog {
    #[must_use]
    pub fn new(actions: Vec<Arc<dyn SystemAction>>) -> Self {
        Self { actions }
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with(mut self, action: impl SystemAction + 'static) -> Self {
        self.actions.push(Arc::new(action));
        self
    }

    /// Discovery records with current availability, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ActionInfo> {
        self.actions.iter().map(|action| action.describe()).collect()
    }

    /// Look up an action by identifier (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unknown`] if no action has that identifier.
    pub fn get(&self, id: &str) -> Result<Arc<dyn SystemAction>, ActionError> {
        self.actions
            .iter()
            .find(|action| action.id().eq_ignore_ascii_case(id.trim()))
            .cloned()
            .ok_or_else(|| ActionError::Unknown(id.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
