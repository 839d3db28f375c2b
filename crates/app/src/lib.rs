//! # idlewatch-app
//!
//! Application layer — the monitoring pipeline and **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `CounterSource` — per-interface byte counters
//!   - `ProcessActivitySource` — per-process I/O activity
//!   - `SystemAction` — terminal system operations
//!   - `ActivityLogStore` — load & save the activity log
//!   - `EventPublisher` — fan out session events
//! - Run the pipeline: triggers (`trigger`), the sampler, the action
//!   scheduler state machine and the session that ties them to a condition
//! - Expose the single inbound entry point, `MonitorEngine`
//! - Provide in-process infrastructure (event bus, activity log) that
//!   doesn't need IO
//!
//! ## Dependency rule
//! Depends on `idlewatch-domain` only (plus `tokio::sync` for channels and
//! locks). Never imports adapter crates.

pub mod action_catalog;
pub mod activity_log;
pub mod engine;
pub mod event_bus;
pub mod ports;
pub mod sampler;
pub mod scheduler;
pub mod session;
pub mod trigger;

#[cfg(test)]
mod testing;
