//! # idlewatch-adapter-linux
//!
//! Host adapter for Linux.
//!
//! | Type | Port | Backed by |
//! |------|------|-----------|
//! | [`ProcNetDev`] | `CounterSource` | `/proc/net/dev` |
//! | [`ProcIoActivity`] | `ProcessActivitySource` | `/proc/<pid>/comm` and `/proc/<pid>/io` |
//! | [`PowerAction`] | `SystemAction` | `systemctl` / `loginctl` |
//!
//! Every path is configurable so tests can point the adapter at a fake
//! procfs tree.

mod error;
mod net;
mod power;
mod process;

pub use error::LinuxError;
pub use net::ProcNetDev;
pub use power::{PowerAction, linux_catalog};
pub use process::ProcIoActivity;
