//! Signal provider ports — where counters and process activity come from.
//!
//! These are the only ports allowed to block on host I/O. Everything
//! downstream of them is a pure state transition.

use std::future::Future;
use std::sync::Arc;

use idlewatch_domain::error::TriggerError;
use idlewatch_domain::signal::{
    CounterSample, InterfaceCounters, ProcessSnapshot, busiest_interface,
};

/// Monotonic per-interface byte counters.
pub trait CounterSource: Send + Sync {
    /// Whether the host exposes counters at all.
    fn is_available(&self) -> bool;

    /// Every interface with its current cumulative counters.
    fn list_interfaces(
        &self,
    ) -> impl Future<Output = Result<Vec<InterfaceCounters>, TriggerError>> + Send;

    /// Current counters of `interface`.
    ///
    /// Implementations return [`TriggerError::InterfaceNotFound`] when the
    /// interface is gone.
    fn read(
        &self,
        interface: &str,
    ) -> impl Future<Output = Result<CounterSample, TriggerError>> + Send;

    /// Name of the busiest non-loopback interface.
    fn default_interface(&self) -> impl Future<Output = Result<String, TriggerError>> + Send {
        async move {
            let interfaces = self.list_interfaces().await?;
            busiest_interface(&interfaces)
                .map(|iface| iface.name.clone())
                .ok_or(TriggerError::NoDefaultInterface)
        }
    }
}

impl<T: CounterSource> CounterSource for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn list_interfaces(
        &self,
    ) -> impl Future<Output = Result<Vec<InterfaceCounters>, TriggerError>> + Send {
        (**self).list_interfaces()
    }

    fn read(
        &self,
        interface: &str,
    ) -> impl Future<Output = Result<CounterSample, TriggerError>> + Send {
        (**self).read(interface)
    }
}

/// Per-process activity estimates.
pub trait ProcessActivitySource: Send + Sync {
    /// Whether the host lets us enumerate processes.
    fn is_available(&self) -> bool;

    /// One entry per running process, stamped with the sampling time.
    fn sample(&self) -> impl Future<Output = Result<ProcessSnapshot, TriggerError>> + Send;
}

impl<T: ProcessActivitySource> ProcessActivitySource for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn sample(&self) -> impl Future<Output = Result<ProcessSnapshot, TriggerError>> + Send {
        (**self).sample()
    }
}
