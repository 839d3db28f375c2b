//! Event bus port — publish/subscribe for monitor events.

use std::future::Future;

use idlewatch_domain::error::IdleWatchError;
use idlewatch_domain::session::MonitorEvent;

/// Publishes monitor events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: MonitorEvent)
    -> impl Future<Output = Result<(), IdleWatchError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: MonitorEvent,
    ) -> impl Future<Output = Result<(), IdleWatchError>> + Send {
        (**self).publish(event)
    }
}
