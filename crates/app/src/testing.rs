//! In-memory fakes shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use idlewatch_domain::activity::LogEntry;
use idlewatch_domain::error::{ActionError, IdleWatchError, TriggerError};
use idlewatch_domain::signal::{
    CounterSample, InterfaceCounters, ProcessActivity, ProcessSnapshot,
};
use idlewatch_domain::time::{Timestamp, now};

use crate::ports::{ActivityLogStore, CounterSource, ProcessActivitySource, SystemAction};

struct Script {
    cursor: CounterSample,
    queue: VecDeque<Option<CounterSample>>,
}

#[derive(Default)]
struct CountersState {
    interfaces: Vec<InterfaceCounters>,
    scripts: HashMap<String, Script>,
}

/// Counter source replaying per-second rates, one sample per `read`.
#[derive(Clone, Default)]
pub struct FakeCounters {
    t0: Option<Timestamp>,
    state: Arc<Mutex<CountersState>>,
}

impl FakeCounters {
    pub fn new() -> Self {
        Self {
            t0: Some(now()),
            state: Arc::default(),
        }
    }

    pub fn with_interface(self, name: &str, total_bytes: u64) -> Self {
        self.state.lock().unwrap().interfaces.push(InterfaceCounters {
            name: name.to_string(),
            bytes_received: total_bytes,
            bytes_sent: 0,
            is_loopback: name == "lo",
        });
        self
    }

    fn script<'a>(&self, state: &'a mut CountersState, name: &str) -> &'a mut Script {
        let t0 = self.t0.unwrap_or_else(now);
        state.scripts.entry(name.to_string()).or_insert_with(|| {
            let cursor = CounterSample {
                bytes_received: 0,
                bytes_sent: 0,
                taken_at: t0,
            };
            Script {
                cursor,
                queue: VecDeque::from([Some(cursor)]),
            }
        })
    }

    /// Queue one sample per `(download, upload)` rate, one second apart.
    pub fn push_rates(&self, name: &str, rates: &[(u64, u64)]) {
        let mut state = self.state.lock().unwrap();
        let script = self.script(&mut state, name);
        for &(down, up) in rates {
            script.cursor = CounterSample {
                bytes_received: script.cursor.bytes_received + down,
                bytes_sent: script.cursor.bytes_sent + up,
                taken_at: script.cursor.taken_at + Duration::seconds(1),
            };
            script.queue.push_back(Some(script.cursor));
        }
    }

    /// Queue one failed read.
    pub fn push_failure(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        self.script(&mut state, name).queue.push_back(None);
    }
}

impl CounterSource for FakeCounters {
    fn is_available(&self) -> bool {
        true
    }

    fn list_interfaces(
        &self,
    ) -> impl Future<Output = Result<Vec<InterfaceCounters>, TriggerError>> + Send {
        let interfaces = self.state.lock().unwrap().interfaces.clone();
        async { Ok(interfaces) }
    }

    fn read(
        &self,
        interface: &str,
    ) -> impl Future<Output = Result<CounterSample, TriggerError>> + Send {
        let next = self
            .state
            .lock()
            .unwrap()
            .scripts
            .get_mut(interface)
            .and_then(|script| script.queue.pop_front())
            .flatten();
        let result = next.ok_or_else(|| TriggerError::InterfaceNotFound(interface.to_string()));
        async { result }
    }
}

/// Process source replaying queued snapshots; repeats the last one when drained.
#[derive(Clone, Default)]
pub struct FakeProcesses {
    queue: Arc<Mutex<VecDeque<Vec<ProcessActivity>>>>,
    last: Arc<Mutex<Vec<ProcessActivity>>>,
}

impl FakeProcesses {
    pub fn push(&self, processes: &[(&str, u64)]) {
        let snapshot = processes
            .iter()
            .zip(1_u32..)
            .map(|(&(name, activity_bps), pid)| ProcessActivity {
                pid,
                name: name.to_string(),
                activity_bps,
            })
            .collect();
        self.queue.lock().unwrap().push_back(snapshot);
    }
}

impl ProcessActivitySource for FakeProcesses {
    fn is_available(&self) -> bool {
        true
    }

    fn sample(&self) -> impl Future<Output = Result<ProcessSnapshot, TriggerError>> + Send {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            *last = next;
        }
        let snapshot = ProcessSnapshot {
            taken_at: now(),
            processes: last.clone(),
            warming_up: false,
        };
        async { Ok(snapshot) }
    }
}

/// Action counting its executions.
#[derive(Clone)]
pub struct FakeAction {
    id: &'static str,
    executions: Arc<AtomicUsize>,
    unsupported: bool,
    fails: bool,
}

impl FakeAction {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            executions: Arc::default(),
            unsupported: false,
            fails: false,
        }
    }

    pub fn unsupported(mut self) -> Self {
        self.unsupported = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl SystemAction for FakeAction {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.id
    }

    fn description(&self) -> &str {
        "test action"
    }

    fn validate(&self) -> Result<(), ActionError> {
        if self.unsupported {
            return Err(ActionError::Unsupported {
                action: self.id.to_string(),
                reason: "not on this host".to_string(),
            });
        }
        Ok(())
    }

    fn execute(&self) -> Result<(), ActionError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(ActionError::Failed {
                action: self.id.to_string(),
                code: 1,
            });
        }
        Ok(())
    }
}

/// Log store keeping the last saved snapshot in memory.
#[derive(Clone, Default)]
pub struct MemoryLogStore {
    pub saved: Arc<Mutex<Vec<LogEntry>>>,
}

impl ActivityLogStore for MemoryLogStore {
    fn load(&self) -> impl Future<Output = Result<Vec<LogEntry>, IdleWatchError>> + Send {
        let entries = self.saved.lock().unwrap().clone();
        async { Ok(entries) }
    }

    fn save(&self, entries: &[LogEntry]) -> impl Future<Output = Result<(), IdleWatchError>> + Send {
        *self.saved.lock().unwrap() = entries.to_vec();
        async { Ok(()) }
    }
}
