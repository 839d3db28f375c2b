//! # idlewatch-domain
//!
//! Pure domain model for the idlewatch automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Readings** (typed, ordered snapshots emitted by triggers)
//! - Define **Trigger** states, kinds and their tagged configuration
//! - Define **Conditions** (the `Condition` trait and the threshold rule)
//! - Define the **signal math** (counter deltas smoothed by a rolling window)
//! - Define **scheduler** states and events, **actions** metadata
//! - Define **activity log** entries and their export encodings
//! - Define **session** status, tick reports and broadcast events
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod activity;
pub mod condition;
pub mod monitoring;
pub mod reading;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod trigger;
