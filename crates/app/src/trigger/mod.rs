//! Triggers — produce one [`Reading`] per evaluation cycle.
//!
//! New trigger kinds implement [`Trigger`], get a variant in
//! [`ConfiguredTrigger`] and an arm in [`TriggerFactory::build`]. Nothing
//! in the condition or action layers changes.

mod network;
mod process;

pub use network::NetworkIdleTrigger;
pub use process::ProcessIdleTrigger;

use std::collections::HashMap;
use std::future::Future;

use idlewatch_domain::error::TriggerError;
use idlewatch_domain::reading::Reading;
use idlewatch_domain::signal::ProcessSuggestion;
use idlewatch_domain::trigger::{TriggerConfig, TriggerInfo, TriggerKind, TriggerState};

use crate::ports::{CounterSource, ProcessActivitySource};

/// Capability set shared by every trigger kind.
pub trait Trigger: Send {
    fn kind(&self) -> TriggerKind;

    /// State reported by the latest evaluation.
    fn state(&self) -> TriggerState;

    /// Whether the trigger judges idleness itself. For such triggers an
    /// `Active` evaluation means "busy" and breaks the condition's streak;
    /// only `Triggered` readings reach the condition.
    fn gates_condition(&self) -> bool {
        false
    }

    /// Acquire the signal source.
    ///
    /// # Errors
    ///
    /// Returns a [`TriggerError`] when the source is unavailable or the
    /// configured target (e.g. an interface) does not exist.
    fn start(&mut self) -> impl Future<Output = Result<(), TriggerError>> + Send;

    /// Release the source. Safe to call from any state, any number of times.
    fn stop(&mut self);

    /// Produce the current reading.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::NotStarted`] before [`Trigger::start`], or
    /// the source's error when it cannot be read.
    fn evaluate(
        &mut self,
    ) -> impl Future<Output = Result<(TriggerState, Reading), TriggerError>> + Send;

    /// Forget any smoothing history, keeping the source.
    fn reset(&mut self);
}

/// A trigger built from a [`TriggerConfig`].
pub enum ConfiguredTrigger<C, P> {
    NetworkIdle(NetworkIdleTrigger<C>),
    ProcessIdle(ProcessIdleTrigger<P>),
}

impl<C, P> Trigger for ConfiguredTrigger<C, P>
where
    C: CounterSource + Clone,
    P: ProcessActivitySource,
{
    fn kind(&self) -> TriggerKind {
        match self {
            Self::NetworkIdle(t) => t.kind(),
            Self::ProcessIdle(t) => t.kind(),
        }
    }

    fn state(&self) -> TriggerState {
        match self {
            Self::NetworkIdle(t) => t.state(),
            Self::ProcessIdle(t) => t.state(),
        }
    }

    fn gates_condition(&self) -> bool {
        match self {
            Self::NetworkIdle(t) => t.gates_condition(),
            Self::ProcessIdle(t) => t.gates_condition(),
        }
    }

    async fn start(&mut self) -> Result<(), TriggerError> {
        match self {
            Self::NetworkIdle(t) => t.start().await,
            Self::ProcessIdle(t) => t.start().await,
        }
    }

    fn stop(&mut self) {
        match self {
            Self::NetworkIdle(t) => t.stop(),
            Self::ProcessIdle(t) => t.stop(),
        }
    }

    async fn evaluate(&mut self) -> Result<(TriggerState, Reading), TriggerError> {
        match self {
            Self::NetworkIdle(t) => t.evaluate().await,
            Self::ProcessIdle(t) => t.evaluate().await,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::NetworkIdle(t) => t.reset(),
            Self::ProcessIdle(t) => t.reset(),
        }
    }
}

/// Builds triggers and answers discovery queries over the host's sources.
#[derive(Clone)]
pub struct TriggerFactory<C, P> {
    counters: C,
    processes: P,
}

impl<C, P> TriggerFactory<C, P>
where
    C: CounterSource + Clone,
    P: ProcessActivitySource + Clone,
{
    pub fn new(counters: C, processes: P) -> Self {
        Self {
            counters,
            processes,
        }
    }

    #[must_use]
    pub fn counters(&self) -> &C {
        &self.counters
    }

    /// Construct an unstarted trigger for `config`.
    #[must_use]
    pub fn build(&self, config: &TriggerConfig) -> ConfiguredTrigger<C, P> {
        match config {
            TriggerConfig::NetworkIdle { interface, window } => ConfiguredTrigger::NetworkIdle(
                NetworkIdleTrigger::new(self.counters.clone(), interface.clone(), *window),
            ),
            TriggerConfig::ProcessIdle {
                watched,
                excluded,
                activity_floor_bps,
            } => ConfiguredTrigger::ProcessIdle(ProcessIdleTrigger::new(
                self.processes.clone(),
                watched,
                excluded,
                *activity_floor_bps,
            )),
        }
    }

    #[must_use]
    pub fn is_available(&self, kind: TriggerKind) -> bool {
        match kind {
            TriggerKind::NetworkIdle => self.counters.is_available(),
            TriggerKind::ProcessIdle => self.processes.is_available(),
        }
    }

    /// Every trigger kind with its availability on this host.
    #[must_use]
    pub fn list_kinds(&self) -> Vec<TriggerInfo> {
        TriggerKind::ALL
            .into_iter()
            .map(|kind| kind.info(self.is_available(kind)))
            .collect()
    }

    /// Rank running process names by activity, flagging the top `top_n`.
    ///
    /// # Errors
    ///
    /// Propagates the [`TriggerError`] from the process source.
    pub async fn suggest_processes(
        &self,
        top_n: usize,
    ) -> Result<Vec<ProcessSuggestion>, TriggerError> {
        let snapshot = self.processes.sample().await?;
        let activity = snapshot
            .processes
            .iter()
            .map(|p| (p.name.as_str(), p.activity_bps));
        Ok(rank_processes(activity, top_n))
    }
}

fn rank_processes<'a>(
    processes: impl Iterator<Item = (&'a str, u64)>,
    top_n: usize,
) -> Vec<ProcessSuggestion> {
    let mut by_name: HashMap<String, ProcessSuggestion> = HashMap::new();
    for (name, activity_bps) in processes {
        let entry = by_name
            .entry(name.to_lowercase())
            .or_insert_with(|| ProcessSuggestion {
                name: name.to_string(),
                instances: 0,
                activity_bps: 0,
                suggested: false,
            });
        entry.instances += 1;
        entry.activity_bps = entry.activity_bps.saturating_add(activity_bps);
    }

    let mut ranked: Vec<ProcessSuggestion> = by_name.into_values().collect();
    ranked.sort_by(|a, b| {
        b.activity_bps
            .cmp(&a.activity_bps)
            .then_with(|| a.name.cmp(&b.name))
    });
    for suggestion in ranked.iter_mut().take(top_n) {
        suggestion.suggested = suggestion.activity_bps > 0;
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCounters, FakeProcesses};

    fn factory() -> TriggerFactory<FakeCounters, FakeProcesses> {
        TriggerFactory::new(FakeCounters::new(), FakeProcesses::default())
    }

    #[test]
    fn should_build_trigger_matching_config_tag() {
        let trigger = factory().build(&TriggerConfig::ProcessIdle {
            watched: vec!["rsync".to_string()],
            excluded: vec![],
            activity_floor_bps: 10,
        });
        assert_eq!(trigger.kind(), TriggerKind::ProcessIdle);
        assert_eq!(trigger.state(), TriggerState::Idle);

        let trigger = factory().build(&TriggerConfig::default());
        assert_eq!(trigger.kind(), TriggerKind::NetworkIdle);
    }

    #[test]
    fn should_list_every_kind_with_availability() {
        let kinds = factory().list_kinds();
        let ids: Vec<_> = kinds.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, ["network_idle", "process_idle"]);
        assert!(kinds.iter().all(|k| k.available));
    }

    #[tokio::test]
    async fn should_rank_processes_by_total_activity_per_name() {
        let factory = factory();
        factory.processes.push(&[
            ("chrome", 300),
            ("Chrome", 300),
            ("steam", 500),
            ("idle", 0),
        ]);

        let ranked = factory.suggest_processes(5).await.unwrap();
        let names: Vec<_> = ranked.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["chrome", "steam", "idle"]);
        assert_eq!(ranked[0].instances, 2);
        assert!(ranked[0].suggested);
        assert!(!ranked[2].suggested);
    }

    #[tokio::test]
    async fn should_flag_only_top_n_suggestions() {
        let factory = factory();
        factory.processes.push(&[("a", 3), ("b", 2), ("c", 1)]);
        let ranked = factory.suggest_processes(1).await.unwrap();
        let flagged: Vec<_> = ranked.iter().filter(|s| s.suggested).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].name, "a");
    }
}
