//! Scripted signal sources.
//!
//! Both sources run on a simulated clock that advances one second per
//! sample, so a script of N entries represents exactly N seconds no matter
//! how fast the caller ticks.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Duration;
use idlewatch_app::ports::{CounterSource, ProcessActivitySource};
use idlewatch_domain::error::TriggerError;
use idlewatch_domain::signal::{
    CounterSample, InterfaceCounters, ProcessActivity, ProcessSnapshot,
};
use idlewatch_domain::time::{Timestamp, now};

struct Interface {
    cursor: CounterSample,
    is_loopback: bool,
    /// `None` is a scripted read failure.
    queue: VecDeque<Option<(u64, u64)>>,
    /// Rate used once the queue is drained.
    steady: (u64, u64),
}

/// Counter source replaying per-second `(download, upload)` rates.
#[derive(Clone)]
pub struct ScriptedCounters {
    interfaces: Arc<Mutex<HashMap<String, Interface>>>,
    started_at: Timestamp,
}

impl Default for ScriptedCounters {
    fn default() -> Self {
        Self {
            interfaces: Arc::default(),
            started_at: now(),
        }
    }
}

impl ScriptedCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interface that idles at `steady` once its script runs out.
    #[must_use]
    pub fn with_interface(self, name: &str, steady: (u64, u64)) -> Self {
        self.lock().insert(
            name.to_string(),
            Interface {
                cursor: CounterSample {
                    bytes_received: 0,
                    bytes_sent: 0,
                    taken_at: self.started_at,
                },
                is_loopback: name == "lo",
                queue: VecDeque::new(),
                steady,
            },
        );
        self
    }

    /// Queue one read per rate.
    pub fn push_rates(&self, name: &str, rates: &[(u64, u64)]) {
        if let Some(interface) = self.lock().get_mut(name) {
            interface.queue.extend(rates.iter().copied().map(Some));
        }
    }

    /// Queue `count` failed reads.
    pub fn push_failures(&self, name: &str, count: usize) {
        if let Some(interface) = self.lock().get_mut(name) {
            interface.queue.extend(std::iter::repeat_n(None, count));
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Interface>> {
        self.interfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_sample(&self, name: &str) -> Result<CounterSample, TriggerError> {
        let mut interfaces = self.lock();
        let interface = interfaces
            .get_mut(name)
            .ok_or_else(|| TriggerError::InterfaceNotFound(name.to_string()))?;

        // The clock moves even when the read fails.
        interface.cursor.taken_at += Duration::seconds(1);
        let (down, up) = match interface.queue.pop_front() {
            Some(Some(rate)) => rate,
            Some(None) => {
                return Err(TriggerError::ProviderUnavailable {
                    provider: "scripted_counters",
                    source: format!("scripted failure on {name}").into(),
                });
            }
            None => interface.steady,
        };
        interface.cursor.bytes_received += down;
        interface.cursor.bytes_sent += up;
        Ok(interface.cursor)
    }
}

impl CounterSource for ScriptedCounters {
    fn is_available(&self) -> bool {
        true
    }

    fn list_interfaces(
        &self,
    ) -> impl Future<Output = Result<Vec<InterfaceCounters>, TriggerError>> + Send {
        let mut listed: Vec<InterfaceCounters> = self
            .lock()
            .iter()
            .map(|(name, interface)| InterfaceCounters {
                name: name.clone(),
                bytes_received: interface.cursor.bytes_received,
                bytes_sent: interface.cursor.bytes_sent,
                is_loopback: interface.is_loopback,
            })
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        async { Ok(listed) }
    }

    fn read(
        &self,
        interface: &str,
    ) -> impl Future<Output = Result<CounterSample, TriggerError>> + Send {
        let sample = self.next_sample(interface);
        async { sample }
    }
}

struct ProcessScript {
    clock: Timestamp,
    queue: VecDeque<Vec<ProcessActivity>>,
    last: Vec<ProcessActivity>,
}

/// Process source replaying queued snapshots; the last one repeats.
#[derive(Clone)]
pub struct ScriptedProcesses {
    script: Arc<Mutex<ProcessScript>>,
}

impl Default for ScriptedProcesses {
    fn default() -> Self {
        Self {
            script: Arc::new(Mutex::new(ProcessScript {
                clock: now(),
                queue: VecDeque::new(),
                last: Vec::new(),
            })),
        }
    }
}

impl ScriptedProcesses {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one snapshot of `(name, activity_bps)` pairs.
    pub fn push(&self, processes: &[(&str, u64)]) {
        let snapshot = processes
            .iter()
            .zip(100_u32..)
            .map(|(&(name, activity_bps), pid)| ProcessActivity {
                pid,
                name: name.to_string(),
                activity_bps,
            })
            .collect();
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .push_back(snapshot);
    }
}

impl ProcessActivitySource for ScriptedProcesses {
    fn is_available(&self) -> bool {
        true
    }

    fn sample(&self) -> impl Future<Output = Result<ProcessSnapshot, TriggerError>> + Send {
        let snapshot = {
            let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
            script.clock += Duration::seconds(1);
            if let Some(next) = script.queue.pop_front() {
                script.last = next;
            }
            ProcessSnapshot {
                taken_at: script.clock,
                processes: script.last.clone(),
                warming_up: false,
            }
        };
        async { Ok(snapshot) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_advance_counters_by_scripted_rates() {
        let counters = ScriptedCounters::new().with_interface("eth0", (0, 0));
        counters.push_rates("eth0", &[(100, 10), (50, 5)]);

        let first = counters.read("eth0").await.unwrap();
        let second = counters.read("eth0").await.unwrap();
        assert_eq!((first.bytes_received, first.bytes_sent), (100, 10));
        assert_eq!((second.bytes_received, second.bytes_sent), (150, 15));
        assert_eq!(second.taken_at - first.taken_at, Duration::seconds(1));
    }

    #[tokio::test]
    async fn should_fall_back_to_steady_rate_when_drained() {
        let counters = ScriptedCounters::new().with_interface("eth0", (7, 0));
        let a = counters.read("eth0").await.unwrap();
        let b = counters.read("eth0").await.unwrap();
        assert_eq!(b.bytes_received - a.bytes_received, 7);
    }

    #[tokio::test]
    async fn should_fail_scripted_reads_and_unknown_interfaces() {
        let counters = ScriptedCounters::new().with_interface("eth0", (0, 0));
        counters.push_failures("eth0", 1);
        assert!(matches!(
            counters.read("eth0").await,
            Err(TriggerError::ProviderUnavailable { .. })
        ));
        assert!(counters.read("eth0").await.is_ok());
        assert!(matches!(
            counters.read("wlan0").await,
            Err(TriggerError::InterfaceNotFound(name)) if name == "wlan0"
        ));
    }

    #[tokio::test]
    async fn should_pick_busiest_non_loopback_interface_as_default() {
        let counters = ScriptedCounters::new()
            .with_interface("lo", (0, 0))
            .with_interface("eth0", (0, 0))
            .with_interface("wlan0", (0, 0));
        counters.push_rates("lo", &[(1_000_000, 1_000_000)]);
        counters.push_rates("wlan0", &[(500, 0)]);
        counters.read("lo").await.unwrap();
        counters.read("wlan0").await.unwrap();

        assert_eq!(counters.default_interface().await.unwrap(), "wlan0");
    }

    #[tokio::test]
    async fn should_repeat_last_process_snapshot() {
        let processes = ScriptedProcesses::new();
        processes.push(&[("rsync", 4_096)]);

        let first = processes.sample().await.unwrap();
        let second = processes.sample().await.unwrap();
        assert_eq!(first.processes, second.processes);
        assert!(second.taken_at > first.taken_at);
    }
}
