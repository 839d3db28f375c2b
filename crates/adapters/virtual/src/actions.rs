//! Dry-run actions — log and record instead of touching the host.

use std::sync::{Arc, Mutex, PoisonError};

use idlewatch_app::action_catalog::ActionCatalog;
use idlewatch_app::ports::SystemAction;
use idlewatch_domain::action::ActionKind;
use idlewatch_domain::error::ActionError;

/// Shared record of every dry-run execution, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<ActionKind>>>);

impl ExecutionLog {
    #[must_use]
    pub fn executed(&self) -> Vec<ActionKind> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, kind: ActionKind) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(kind);
    }
}

/// An action that only pretends to run.
#[derive(Debug, Clone)]
pub struct DryRunAction {
    kind: ActionKind,
    log: ExecutionLog,
    fail_with: Option<i32>,
}

impl DryRunAction {
    #[must_use]
    pub fn new(kind: ActionKind, log: ExecutionLog) -> Self {
        Self {
            kind,
            log,
            fail_with: None,
        }
    }

    /// Make every execution report the given exit code.
    #[must_use]
    pub fn failing(mut self, code: i32) -> Self {
        self.fail_with = Some(code);
        self
    }
}

impl SystemAction for DryRunAction {
    fn id(&self) -> &str {
        self.kind.id()
    }

    fn name(&self) -> &str {
        self.kind.display_name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    fn validate(&self) -> Result<(), ActionError> {
        Ok(())
    }

    fn execute(&self) -> Result<(), ActionError> {
        self.log.record(self.kind);
        if let Some(code) = self.fail_with {
            return Err(ActionError::Failed {
                action: self.kind.id().to_string(),
                code,
            });
        }
        tracing::info!(action = %self.kind, "dry run: action not performed");
        Ok(())
    }
}

/// A catalog of every [`ActionKind`] in dry-run form, sharing `log`.
#[must_use]
pub fn dry_run_catalog(log: &ExecutionLog) -> ActionCatalog {
    ActionKind::ALL
        .into_iter()
        .fold(ActionCatalog::default(), |catalog, kind| {
            catalog.with(DryRunAction::new(kind, log.clone()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_offer_every_action_kind() {
        let catalog = dry_run_catalog(&ExecutionLog::default());
        let ids: Vec<_> = catalog.list().into_iter().map(|info| info.id).collect();
        assert_eq!(
            ids,
            ["shutdown", "restart", "suspend", "hibernate", "sign_out", "lock"]
        );
        assert!(catalog.list().iter().all(|info| info.available));
    }

    #[test]
    fn should_record_executions_without_side_effects() {
        let log = ExecutionLog::default();
        let catalog = dry_run_catalog(&log);
        catalog.get("lock").unwrap().execute().unwrap();
        assert_eq!(log.executed(), [ActionKind::Lock]);
    }

    #[test]
    fn should_report_configured_failure() {
        let log = ExecutionLog::default();
        let action = DryRunAction::new(ActionKind::Restart, log.clone()).failing(5);
        assert!(matches!(
            action.execute(),
            Err(ActionError::Failed { code: 5, .. })
        ));
        assert_eq!(log.executed(), [ActionKind::Restart]);
    }
}
