//! Process-idle trigger — judges a watch list of named processes.
//!
//! Names match case-insensitively and the exclusion list always wins over
//! the watch list. Only the remaining ("considered") processes count.

use std::collections::HashSet;
use std::future::Future;

use idlewatch_domain::error::TriggerError;
use idlewatch_domain::reading::{Reading, fields};
use idlewatch_domain::signal::{ProcessActivity, ProcessSnapshot};
use idlewatch_domain::trigger::{TriggerKind, TriggerState};

use super::Trigger;
use crate::ports::ProcessActivitySource;

/// Reports `Triggered` once every considered process is under the floor.
pub struct ProcessIdleTrigger<P> {
    source: P,
    watched: HashSet<String>,
    excluded: HashSet<String>,
    activity_floor_bps: u64,
    state: TriggerState,
    started: bool,
}

impl<P: ProcessActivitySource> ProcessIdleTrigger<P> {
    pub fn new<W, E>(source: P, watched: W, excluded: E, activity_floor_bps: u64) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            source,
            watched: normalize(watched),
            excluded: normalize(excluded),
            activity_floor_bps,
            state: TriggerState::Idle,
            started: false,
        }
    }

    fn considers(&self, process: &ProcessActivity) -> bool {
        let name = process.name.to_lowercase();
        self.watched.contains(&name) && !self.excluded.contains(&name)
    }

    /// Judge one snapshot.
    ///
    /// A warming-up snapshot is `Idle` and carries no rates. Otherwise the
    /// reading carries `download_bps` (total considered activity) and
    /// `upload_bps` (always zero) so throughput conditions apply unchanged.
    #[must_use]
    pub fn judge(&self, snapshot: &ProcessSnapshot) -> (TriggerState, Reading) {
        let considered: Vec<&ProcessActivity> = snapshot
            .processes
            .iter()
            .filter(|p| self.considers(p))
            .collect();
        let active = considered
            .iter()
            .filter(|p| p.activity_bps > self.activity_floor_bps)
            .count();
        let total = considered
            .iter()
            .fold(0_u64, |acc, p| acc.saturating_add(p.activity_bps));

        let reading = Reading::new(snapshot.taken_at)
            .with(fields::WATCHED_COUNT, considered.len() as u64);
        if snapshot.warming_up {
            return (TriggerState::Idle, reading);
        }
        let reading = reading
            .with(fields::ACTIVE_COUNT, active as u64)
            .with(fields::ACTIVITY_BPS, total)
            .with(fields::DOWNLOAD_BPS, total)
            .with(fields::UPLOAD_BPS, 0_u64);

        // No considered process running counts as quiet.
        let state = if active == 0 {
            TriggerState::Triggered
        } else {
            TriggerState::Active
        };
        (state, reading)
    }
}

fn normalize<I>(names: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

impl<P: ProcessActivitySource> Trigger for ProcessIdleTrigger<P> {
    fn kind(&self) -> TriggerKind {
        TriggerKind::ProcessIdle
    }

    fn state(&self) -> TriggerState {
        self.state
    }

    fn gates_condition(&self) -> bool {
        true
    }

    fn start(&mut self) -> impl Future<Output = Result<(), TriggerError>> + Send {
        async move {
            if !self.source.is_available() {
                return Err(TriggerError::ProviderUnavailable {
                    provider: "process_activity",
                    source: "process enumeration is not supported on this host".into(),
                });
            }
            tracing::info!(
                watched = self.watched.len(),
                excluded = self.excluded.len(),
                floor_bps = self.activity_floor_bps,
                "process trigger started"
            );
            self.started = true;
            self.state = TriggerState::Active;
            Ok(())
        }
    }

    fn stop(&mut self) {
        self.started = false;
        self.state = TriggerState::Idle;
    }

    fn evaluate(
        &mut self,
    ) -> impl Future<Output = Result<(TriggerState, Reading), TriggerError>> + Send {
        async move {
            if !self.started {
                return Err(TriggerError::NotStarted);
            }
            let snapshot = self.source.sample().await?;
            let (state, reading) = self.judge(&snapshot);
            self.state = state;
            Ok((state, reading))
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProcesses;
    use idlewatch_domain::time::now;

    fn snapshot(processes: &[(&str, u64)]) -> ProcessSnapshot {
        ProcessSnapshot {
            taken_at: now(),
            processes: processes
                .iter()
                .zip(1_u32..)
                .map(|(&(name, activity_bps), pid)| ProcessActivity {
                    pid,
                    name: name.to_string(),
                    activity_bps,
                })
                .collect(),
            warming_up: false,
        }
    }

    fn trigger(watched: &[&str], excluded: &[&str]) -> ProcessIdleTrigger<FakeProcesses> {
        ProcessIdleTrigger::new(FakeProcesses::default(), watched, excluded, 1_000)
    }

    #[test]
    fn should_consider_only_non_excluded_watched_processes() {
        let trigger = trigger(&["A.exe", "B.exe"], &["A.exe"]);

        let (state, reading) = trigger.judge(&snapshot(&[("A.exe", 900_000), ("B.exe", 10)]));
        assert_eq!(state, TriggerState::Triggered);
        assert_eq!(reading.require_u64(fields::WATCHED_COUNT).unwrap(), 1);
        assert_eq!(reading.require_u64(fields::ACTIVITY_BPS).unwrap(), 10);

        let (state, _) = trigger.judge(&snapshot(&[("A.exe", 0), ("B.exe", 5_000)]));
        assert_eq!(state, TriggerState::Active);
    }

    #[test]
    fn should_match_names_case_insensitively() {
        let trigger = trigger(&["Steam.EXE"], &[]);
        let (state, reading) = trigger.judge(&snapshot(&[("steam.exe", 50_000)]));
        assert_eq!(state, TriggerState::Active);
        assert_eq!(reading.require_u64(fields::ACTIVE_COUNT).unwrap(), 1);
    }

    #[test]
    fn should_trigger_when_no_watched_process_is_running() {
        let trigger = trigger(&["rsync"], &[]);
        let (state, reading) = trigger.judge(&snapshot(&[("bash", 99_999)]));
        assert_eq!(state, TriggerState::Triggered);
        assert_eq!(reading.require_u64(fields::WATCHED_COUNT).unwrap(), 0);
    }

    #[test]
    fn should_count_every_instance_of_a_watched_name() {
        let trigger = trigger(&["chrome"], &[]);
        let (state, reading) = trigger.judge(&snapshot(&[("chrome", 10), ("chrome", 4_000)]));
        assert_eq!(state, TriggerState::Active);
        assert_eq!(reading.require_u64(fields::WATCHED_COUNT).unwrap(), 2);
        assert_eq!(reading.require_u64(fields::DOWNLOAD_BPS).unwrap(), 4_010);
        assert_eq!(reading.require_u64(fields::UPLOAD_BPS).unwrap(), 0);
    }

    #[test]
    fn should_stay_idle_while_source_warms_up() {
        let trigger = trigger(&["rsync"], &[]);
        let mut first = snapshot(&[("rsync", 0)]);
        first.warming_up = true;

        let (state, reading) = trigger.judge(&first);
        assert_eq!(state, TriggerState::Idle);
        assert_eq!(reading.require_u64(fields::WATCHED_COUNT).unwrap(), 1);
        assert!(reading.require_u64(fields::DOWNLOAD_BPS).is_err());
    }

    #[tokio::test]
    async fn should_read_from_source_once_started() {
        let source = FakeProcesses::default();
        source.push(&[("B.exe", 3)]);
        let mut trigger = ProcessIdleTrigger::new(source, ["b.exe"], Vec::<String>::new(), 1_000);

        assert!(matches!(
            trigger.evaluate().await,
            Err(TriggerError::NotStarted)
        ));
        trigger.start().await.unwrap();
        let (state, _) = trigger.evaluate().await.unwrap();
        assert_eq!(state, TriggerState::Triggered);
        assert_eq!(trigger.state(), TriggerState::Triggered);
    }
}
