//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod action;
pub mod activity_store;
pub mod event_bus;
pub mod signal;

pub use action::SystemAction;
pub use activity_store::ActivityLogStore;
pub use event_bus::EventPublisher;
pub use signal::{CounterSource, ProcessActivitySource};
