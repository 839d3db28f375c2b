//! Signal sampler — polls a counter source and smooths the resulting rate.

use idlewatch_domain::error::TriggerError;
use idlewatch_domain::signal::{RollingRate, Throughput};
use idlewatch_domain::time::Timestamp;

use crate::ports::CounterSource;

/// Polls one interface and feeds its counters through a [`RollingRate`].
pub struct SignalSampler<S> {
    source: S,
    interface: String,
    rate: RollingRate,
}

impl<S: CounterSource> SignalSampler<S> {
    /// Sample `interface` with a rolling window of `window` rates.
    pub fn new(source: S, interface: impl Into<String>, window: usize) -> Self {
        Self {
            source,
            interface: interface.into(),
            rate: RollingRate::new(window),
        }
    }

    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Read the counters once.
    ///
    /// Returns the sample time and the smoothed rate, which stays `None`
    /// until two samples have been taken.
    ///
    /// # Errors
    ///
    /// Propagates the [`TriggerError`] from the counter source.
    #[tracing::instrument(skip(self), fields(interface = %self.interface))]
    pub async fn poll(&mut self) -> Result<(Timestamp, Option<Throughput>), TriggerError> {
        let sample = self.source.read(&self.interface).await?;
        let throughput = self.rate.observe(sample);
        tracing::trace!(?throughput, "sampled counters");
        Ok((sample.taken_at, throughput))
    }

    /// Drop the baseline and the window, e.g. after a pause.
    pub fn reset(&mut self) {
        self.rate.reset();
    }
}
