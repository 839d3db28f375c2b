//! Per-process I/O activity from procfs.
//!
//! Activity is the rate of change of `rchar + wchar` in `/proc/<pid>/io`,
//! which counts every byte moved through read/write syscalls, sockets
//! included. A process seen for the first time reports zero, and the very
//! first scan is flagged as warming up.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use idlewatch_app::ports::ProcessActivitySource;
use idlewatch_domain::error::TriggerError;
use idlewatch_domain::signal::{ProcessActivity, ProcessSnapshot};
use idlewatch_domain::time::{Timestamp, now};

use crate::error::LinuxError;

#[derive(Debug, Clone, Copy)]
struct IoSample {
    total_bytes: u64,
    taken_at: Timestamp,
}

/// [`ProcessActivitySource`] scanning `/proc` on a blocking thread.
#[derive(Debug, Clone)]
pub struct ProcIoActivity {
    root: PathBuf,
    previous: Arc<Mutex<HashMap<u32, IoSample>>>,
}

impl Default for ProcIoActivity {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcIoActivity {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            previous: Arc::default(),
        }
    }
}

impl ProcessActivitySource for ProcIoActivity {
    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn sample(&self) -> impl Future<Output = Result<ProcessSnapshot, TriggerError>> + Send {
        let root = self.root.clone();
        let previous = Arc::clone(&self.previous);
        async move {
            let snapshot = tokio::task::spawn_blocking(move || scan(&root, &previous))
                .await
                .map_err(LinuxError::from)??;
            Ok(snapshot)
        }
    }
}

fn scan(
    root: &Path,
    previous: &Mutex<HashMap<u32, IoSample>>,
) -> Result<ProcessSnapshot, LinuxError> {
    let entries = fs::read_dir(root).map_err(|source| LinuxError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let taken_at = now();

    let mut current = HashMap::new();
    let mut processes = Vec::new();
    let mut previous = previous.lock().unwrap_or_else(PoisonError::into_inner);
    let warming_up = previous.is_empty();

    for entry in entries.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        // Processes may exit mid-scan and other users' io files are
        // unreadable without privileges; both are skipped.
        let Some((name, total_bytes)) = read_process(&entry.path()) else {
            continue;
        };

        let activity_bps = previous
            .get(&pid)
            .map_or(0, |before| rate(*before, total_bytes, taken_at));
        current.insert(
            pid,
            IoSample {
                total_bytes,
                taken_at,
            },
        );
        processes.push(ProcessActivity {
            pid,
            name,
            activity_bps,
        });
    }

    *previous = current;
    processes.sort_by_key(|p| p.pid);
    Ok(ProcessSnapshot {
        taken_at,
        processes,
        warming_up,
    })
}

fn read_process(dir: &Path) -> Option<(String, u64)> {
    let name = fs::read_to_string(dir.join("comm")).ok()?.trim().to_string();
    let io = fs::read_to_string(dir.join("io")).ok()?;
    Some((name, parse_io(&io)?))
}

/// `rchar + wchar` from the contents of `/proc/<pid>/io`.
fn parse_io(text: &str) -> Option<u64> {
    let mut rchar = None;
    let mut wchar = None;
    for line in text.lines() {
        match line.split_once(':') {
            Some(("rchar", value)) => rchar = value.trim().parse::<u64>().ok(),
            Some(("wchar", value)) => wchar = value.trim().parse::<u64>().ok(),
            _ => {}
        }
    }
    Some(rchar?.saturating_add(wchar?))
}

fn rate(before: IoSample, total_bytes: u64, taken_at: Timestamp) -> u64 {
    let elapsed_ms = (taken_at - before.taken_at).num_milliseconds().max(1);
    let delta = total_bytes.saturating_sub(before.total_bytes);
    delta.saturating_mul(1000) / elapsed_ms.unsigned_abs()
}
