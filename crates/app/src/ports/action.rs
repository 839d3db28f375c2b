//! System action port — a terminal operation such as shutdown or lock.
//!
//! Implementations live in adapter crates and do their own capability
//! probing. The scheduler and the catalog only ever talk to this trait.

use idlewatch_domain::action::ActionInfo;
use idlewatch_domain::error::ActionError;

/// A terminal system operation.
///
/// Object-safe so heterogeneous actions can sit behind one
/// `Arc<dyn SystemAction>` registry.
pub trait SystemAction: Send + Sync {
    /// Stable identifier used in configuration (e.g. `"shutdown"`).
    fn id(&self) -> &str;

    /// Human readable name.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Check the host can perform this action. Must have no side effects.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unsupported`] or
    /// [`ActionError::InsufficientPrivilege`] when the action cannot run.
    fn validate(&self) -> Result<(), ActionError>;

    /// Perform the action.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] if the underlying system call could not be
    /// launched or reported failure.
    fn execute(&self) -> Result<(), ActionError>;

    /// Discovery record with current availability.
    fn describe(&self) -> ActionInfo {
        ActionInfo {
            id: self.id().to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            available: self.validate().is_ok(),
        }
    }
}
