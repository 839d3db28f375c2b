//! # idlewatch-adapter-virtual
//!
//! Simulated signal sources and dry-run actions for testing and
//! demonstration.
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`ScriptedCounters`] | `CounterSource` | Replays queued per-second rates on a simulated clock |
//! | [`ScriptedProcesses`] | `ProcessActivitySource` | Replays queued process snapshots |
//! | [`DryRunAction`] | `SystemAction` | Records the execution instead of touching the host |
//!
//! ## Dependency rule
//!
//! Depends on `idlewatch-app` (port traits) and `idlewatch-domain` only.

mod actions;
mod sources;

pub use actions::{DryRunAction, ExecutionLog, dry_run_catalog};
pub use sources::{ScriptedCounters, ScriptedProcesses};
