//! Activity log persistence port.

use std::future::Future;

use idlewatch_domain::activity::LogEntry;
use idlewatch_domain::error::IdleWatchError;

/// Durable backing for the in-memory activity log.
pub trait ActivityLogStore: Send + Sync {
    /// Load every persisted entry, oldest first.
    fn load(&self) -> impl Future<Output = Result<Vec<LogEntry>, IdleWatchError>> + Send;

    /// Replace the persisted entries with `entries`.
    fn save(&self, entries: &[LogEntry]) -> impl Future<Output = Result<(), IdleWatchError>> + Send;
}

/// `None` disables persistence: loads nothing, saves nowhere.
impl<T: ActivityLogStore> ActivityLogStore for Option<T> {
    fn load(&self) -> impl Future<Output = Result<Vec<LogEntry>, IdleWatchError>> + Send {
        async move {
            match self {
                Some(store) => store.load().await,
                None => Ok(Vec::new()),
            }
        }
    }

    fn save(&self, entries: &[LogEntry]) -> impl Future<Output = Result<(), IdleWatchError>> + Send {
        async move {
            match self {
                Some(store) => store.save(entries).await,
                None => Ok(()),
            }
        }
    }
}
