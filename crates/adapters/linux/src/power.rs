//! Power and session actions through systemd and logind.

use std::path::PathBuf;
use std::process::Command;

use idlewatch_app::action_catalog::ActionCatalog;
use idlewatch_app::ports::SystemAction;
use idlewatch_domain::action::ActionKind;
use idlewatch_domain::error::ActionError;

const POWER_STATE: &str = "/sys/power/state";

/// Stderr fragments polkit/logind print when the caller lacks rights.
const DENIED: [&str; 3] = [
    "Access denied",
    "Interactive authentication required",
    "Permission denied",
];

/// A [`SystemAction`] that shells out to `systemctl` or `loginctl`.
#[derive(Debug, Clone)]
pub struct PowerAction {
    kind: ActionKind,
    program: String,
    args: Vec<String>,
    power_state: PathBuf,
}

impl PowerAction {
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        let session = std::env::var("XDG_SESSION_ID").ok();
        let (program, args): (&str, Vec<String>) = match kind {
            ActionKind::Shutdown => ("systemctl", vec!["poweroff".into()]),
            ActionKind::Restart => ("systemctl", vec!["reboot".into()]),
            ActionKind::Suspend => ("systemctl", vec!["suspend".into()]),
            ActionKind::Hibernate => ("systemctl", vec!["hibernate".into()]),
            ActionKind::SignOut => (
                "loginctl",
                std::iter::once("terminate-session".to_string())
                    .chain(session)
                    .collect(),
            ),
            ActionKind::Lock => (
                "loginctl",
                std::iter::once("lock-session".to_string())
                    .chain(session)
                    .collect(),
            ),
        };
        Self {
            kind,
            program: program.to_string(),
            args,
            power_state: PathBuf::from(POWER_STATE),
        }
    }

    /// Run `program args..` instead of the default command.
    #[must_use]
    pub fn with_command(mut self, program: &str, args: &[&str]) -> Self {
        self.program = program.to_string();
        self.args = args.iter().map(ToString::to_string).collect();
        self
    }

    /// Read sleep-state support from `path` instead of `/sys/power/state`.
    #[must_use]
    pub fn with_power_state(mut self, path: impl Into<PathBuf>) -> Self {
        self.power_state = path.into();
        self
    }

    fn unsupported(&self, reason: impl Into<String>) -> ActionError {
        ActionError::Unsupported {
            action: self.kind.id().to_string(),
            reason: reason.into(),
        }
    }

    /// Kernel sleep state this action needs, if any.
    fn required_sleep_state(&self) -> Option<&'static str> {
        match self.kind {
            ActionKind::Suspend => Some("mem"),
            ActionKind::Hibernate => Some("disk"),
            _ => None,
        }
    }
}

impl SystemAction for PowerAction {
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
        which::which(&self.program)
            .map_err(|_| self.unsupported(format!("`{}` not found in PATH", self.program)))?;

        if self.kind == ActionKind::SignOut && self.args.len() < 2 {
            return Err(self.unsupported("no XDG_SESSION_ID in the environment"));
        }

        if let Some(state) = self.required_sleep_state() {
            let supported = std::fs::read_to_string(&self.power_state).unwrap_or_default();
            if !supported.split_whitespace().any(|s| s == state) {
                return Err(self.unsupported(format!("kernel does not offer `{state}` sleep")));
            }
        }
        Ok(())
    }

    fn execute(&self) -> Result<(), ActionError> {
        tracing::info!(action = %self.kind, program = %self.program, args = ?self.args, "running action");
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| ActionError::Launch {
                action: self.kind.id().to_string(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(action = %self.kind, stderr = %stderr.trim(), "action command failed");
        if DENIED.iter().any(|needle| stderr.contains(needle)) {
            return Err(ActionError::InsufficientPrivilege {
                action: self.kind.id().to_string(),
            });
        }
        Err(ActionError::Failed {
            action: self.kind.id().to_string(),
            code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Every [`ActionKind`] backed by the host's service manager.
#[must_use]
pub fn linux_catalog() -> ActionCatalog {
    ActionKind::ALL
        .into_iter()
        .fold(ActionCatalog::default(), |catalog, kind| {
            catalog.with(PowerAction::new(kind))
        })
}
