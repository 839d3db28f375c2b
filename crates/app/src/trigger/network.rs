//! Network-idle trigger — wraps a [`SignalSampler`] over one interface.

use std::future::Future;

use idlewatch_domain::error::TriggerError;
use idlewatch_domain::reading::{Reading, fields};
use idlewatch_domain::trigger::{AUTO_INTERFACE, TriggerKind, TriggerState};

use super::Trigger;
use crate::ports::CounterSource;
use crate::sampler::SignalSampler;

/// Emits smoothed download/upload rates of one interface.
pub struct NetworkIdleTrigger<S> {
    source: S,
    requested: String,
    window: usize,
    sampler: Option<SignalSampler<S>>,
    state: TriggerState,
}

impl<S: CounterSource + Clone> NetworkIdleTrigger<S> {
    /// `interface` may be [`AUTO_INTERFACE`] to pick the busiest one on start.
    pub fn new(source: S, interface: impl Into<String>, window: usize) -> Self {
        Self {
            source,
            requested: interface.into(),
            window,
            sampler: None,
            state: TriggerState::Idle,
        }
    }

    /// Interface actually sampled, once started.
    #[must_use]
    pub fn interface(&self) -> Option<&str> {
        self.sampler.as_ref().map(SignalSampler::interface)
    }

    async fn resolve_interface(&self) -> Result<String, TriggerError> {
        if self.requested.eq_ignore_ascii_case(AUTO_INTERFACE) {
            return self.source.default_interface().await;
        }
        let known = self.source.list_interfaces().await?;
        if known.iter().any(|iface| iface.name == self.requested) {
            Ok(self.requested.clone())
        } else {
            Err(TriggerError::InterfaceNotFound(self.requested.clone()))
        }
    }
}

impl<S: CounterSource + Clone> Trigger for NetworkIdleTrigger<S> {
    fn kind(&self) -> TriggerKind {
        TriggerKind::NetworkIdle
    }

    fn state(&self) -> TriggerState {
        self.state
    }

    fn start(&mut self) -> impl Future<Output = Result<(), TriggerError>> + Send {
        async move {
            let interface = self.resolve_interface().await?;
            tracing::info!(%interface, window = self.window, "network trigger started");
            self.sampler = Some(SignalSampler::new(
                self.source.clone(),
                interface,
                self.window,
            ));
            self.state = TriggerState::Active;
            Ok(())
        }
    }

    fn stop(&mut self) {
        self.sampler = None;
        self.state = TriggerState::Idle;
    }

    fn evaluate(&mut self) -> impl Future<Output = Result<(TriggerState, Reading), TriggerError>> + Send {
        async move {
            let sampler = self.sampler.as_mut().ok_or(TriggerError::NotStarted)?;
            let (taken_at, throughput) = sampler.poll().await?;
            let mut reading = Reading::new(taken_at).with(fields::INTERFACE, sampler.interface());

            let state = match throughput {
                Some(rate) => {
                    reading.insert(fields::DOWNLOAD_BPS, rate.download_bps);
                    reading.insert(fields::UPLOAD_BPS, rate.upload_bps);
                    TriggerState::Active
                }
                None => TriggerState::Idle,
            };
            self.state = state;
            Ok((state, reading))
        }
    }

    fn reset(&mut self) {
        if let Some(sampler) = self.sampler.as_mut() {
            sampler.reset();
        }
    }
}
