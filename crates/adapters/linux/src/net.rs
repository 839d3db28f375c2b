//! Interface byte counters from `/proc/net/dev`.

use std::future::Future;
use std::path::PathBuf;

use idlewatch_app::ports::CounterSource;
use idlewatch_domain::error::TriggerError;
use idlewatch_domain::signal::{CounterSample, InterfaceCounters};
use idlewatch_domain::time::now;

use crate::error::LinuxError;

/// [`CounterSource`] reading the kernel's per-interface totals.
#[derive(Debug, Clone)]
pub struct ProcNetDev {
    path: PathBuf,
}

impl Default for ProcNetDev {
    fn default() -> Self {
        Self::new("/proc/net/dev")
    }
}

impl ProcNetDev {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn snapshot(&self) -> Result<Vec<InterfaceCounters>, LinuxError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| LinuxError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_net_dev(&text).map_err(|line| LinuxError::Parse {
            path: self.path.clone(),
            line,
        })
    }
}

impl CounterSource for ProcNetDev {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn list_interfaces(
        &self,
    ) -> impl Future<Output = Result<Vec<InterfaceCounters>, TriggerError>> + Send {
        let result = self.snapshot().map_err(TriggerError::from);
        async { result }
    }

    fn read(
        &self,
        interface: &str,
    ) -> impl Future<Output = Result<CounterSample, TriggerError>> + Send {
        let taken_at = now();
        let result = self.snapshot().map_err(TriggerError::from).and_then(|all| {
            all.into_iter()
                .find(|counters| counters.name == interface)
                .map(|counters| CounterSample {
                    bytes_received: counters.bytes_received,
                    bytes_sent: counters.bytes_sent,
                    taken_at,
                })
                .ok_or_else(|| TriggerError::InterfaceNotFound(interface.to_string()))
        });
        async { result }
    }
}

/// Parse the body of `/proc/net/dev`; the error is the 1-based bad line.
///
/// ```text
/// Inter-|   Receive                            |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes ...
///     lo: 1296      16    0    0    0     0          0         0     1296 ...
/// ```
fn parse_net_dev(text: &str) -> Result<Vec<InterfaceCounters>, usize> {
    let mut interfaces = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let Some((name, stats)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let fields: Vec<u64> = stats
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| index + 1)?;
        // 8 receive columns, then transmit bytes.
        let (Some(&bytes_received), Some(&bytes_sent)) = (fields.first(), fields.get(8)) else {
            return Err(index + 1);
        };
        interfaces.push(InterfaceCounters {
            name: name.to_string(),
            bytes_received,
            bytes_sent,
            is_loopback: name == "lo",
        });
    }
    Ok(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 9000000   100    0    0    0     0          0         0  9000000   100    0    0    0     0       0          0
  eth0: 52000     40    0    0    0     0          0         0     7000      30    0    0    0     0       0          0
 wlan0: 1200      10    0    0    0     0          0         0      300       5    0    0    0     0       0          0
";

    fn write_sample(contents: &str) -> (tempfile::TempDir, ProcNetDev) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev");
        std::fs::write(&path, contents).unwrap();
        (dir, ProcNetDev::new(path))
    }

    #[test]
    fn should_parse_receive_and_transmit_bytes() {
        let parsed = parse_net_dev(SAMPLE).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].is_loopback);
        assert_eq!(parsed[1].name, "eth0");
        assert_eq!((parsed[1].bytes_received, parsed[1].bytes_sent), (52_000, 7_000));
    }

    #[test]
    fn should_report_line_of_malformed_row() {
        assert_eq!(parse_net_dev("x\n  eth0: 1 2 nope\n"), Err(2));
        assert_eq!(parse_net_dev("  eth0: 1 2 3\n"), Err(1));
    }

    #[tokio::test]
    async fn should_read_named_interface() {
        let (_dir, source) = write_sample(SAMPLE);
        let sample = source.read("wlan0").await.unwrap();
        assert_eq!(sample.bytes_received, 1_200);
        assert_eq!(sample.bytes_sent, 300);
    }

    #[tokio::test]
    async fn should_fail_for_unknown_interface() {
        let (_dir, source) = write_sample(SAMPLE);
        assert!(matches!(
            source.read("eth9").await,
            Err(TriggerError::InterfaceNotFound(name)) if name == "eth9"
        ));
    }

    #[tokio::test]
    async fn should_choose_busiest_non_loopback_as_default() {
        let (_dir, source) = write_sample(SAMPLE);
        assert_eq!(source.default_interface().await.unwrap(), "eth0");
    }

    #[tokio::test]
    async fn should_be_unavailable_without_counter_file() {
        let source = ProcNetDev::new("/nonexistent/net/dev");
        assert!(!source.is_available());
        assert!(matches!(
            source.list_interfaces().await,
            Err(TriggerError::ProviderUnavailable { provider: "procfs", .. })
        ));
    }
}
