//! Signal math — counter deltas turned into rates, smoothed by a rolling window.
//!
//! [`RollingRate`] is purely reactive: it never reads a clock. Callers feed
//! it [`CounterSample`]s at whatever cadence they like and the elapsed time
//! comes from the samples themselves.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Monotonic byte counters captured at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSample {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub taken_at: Timestamp,
}

/// Download / upload rate in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Throughput {
    pub download_bps: u64,
    pub upload_bps: u64,
}

/// Cumulative counters of one network interface, as listed by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    pub name: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub is_loopback: bool,
}

impl InterfaceCounters {
    /// Total bytes moved in both directions.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.bytes_received.saturating_add(self.bytes_sent)
    }
}

/// Pick the busiest non-loopback interface.
#[must_use]
pub fn busiest_interface(interfaces: &[InterfaceCounters]) -> Option<&InterfaceCounters> {
    interfaces
        .iter()
        .filter(|iface| !iface.is_loopback)
        .max_by_key(|iface| iface.total_bytes())
}

/// Estimated I/O activity of one running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessActivity {
    pub pid: u32,
    pub name: String,
    pub activity_bps: u64,
}

/// Every running process at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub taken_at: Timestamp,
    pub processes: Vec<ProcessActivity>,
    /// The source had no earlier scan to diff against, so every rate is
    /// a placeholder.
    #[serde(default)]
    pub warming_up: bool,
}

/// A process name ranked by activity, for the watch-list picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSuggestion {
    pub name: String,
    /// Number of running instances sharing this name.
    pub instances: usize,
    pub activity_bps: u64,
    /// Among the most active names.
    pub suggested: bool,
}

/// Converts counter deltas into rates and averages the last `capacity` rates.
#[derive(Debug, Clone)]
pub struct RollingRate {
    previous: Option<CounterSample>,
    window: VecDeque<Throughput>,
    capacity: usize,
}

impl Default for RollingRate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}

impl RollingRate {
    pub const DEFAULT_WINDOW: usize = 3;

    /// Create a window holding `capacity` rates (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            previous: None,
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Feed a new sample.
    ///
    /// The first sample only sets the baseline and yields `None`. Later
    /// samples push one rate into the window and yield the window mean.
    /// A sample that does not move forward in time is ignored. A counter
    /// that went backwards (interface re-created) becomes the new baseline
    /// without contributing a rate.
    pub fn observe(&mut self, sample: CounterSample) -> Option<Throughput> {
        let Some(prev) = self.previous else {
            self.previous = Some(sample);
            return None;
        };

        let elapsed_ms = (sample.taken_at - prev.taken_at).num_milliseconds();
        if elapsed_ms <= 0 {
            return self.average();
        }

        if sample.bytes_received < prev.bytes_received || sample.bytes_sent < prev.bytes_sent {
            self.previous = Some(sample);
            return self.average();
        }

        let rate = Throughput {
            download_bps: per_second(sample.bytes_received - prev.bytes_received, elapsed_ms),
            upload_bps: per_second(sample.bytes_sent - prev.bytes_sent, elapsed_ms),
        };

        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(rate);
        self.previous = Some(sample);
        self.average()
    }

    /// Arithmetic mean of the window, `None` while empty.
    #[must_use]
    pub fn average(&self) -> Option<Throughput> {
        if self.window.is_empty() {
            return None;
        }
        let len = self.window.len() as u128;
        let (down, up) = self.window.iter().fold((0_u128, 0_u128), |(d, u), r| {
            (d + u128::from(r.download_bps), u + u128::from(r.upload_bps))
        });
        Some(Throughput {
            download_bps: u64::try_from(down / len).unwrap_or(u64::MAX),
            upload_bps: u64::try_from(up / len).unwrap_or(u64::MAX),
        })
    }

    /// Most recent raw (unsmoothed) rate.
    #[must_use]
    pub fn latest(&self) -> Option<Throughput> {
        self.window.back().copied()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget the baseline and every buffered rate.
    pub fn reset(&mut self) {
        self.previous = None;
        self.window.clear();
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn per_second(delta: u64, elapsed_ms: i64) -> u64 {
    (delta as f64 * 1000.0 / elapsed_ms as f64) as u64
}
