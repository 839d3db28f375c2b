//! Storage-specific error type.

use std::path::PathBuf;

use idlewatch_domain::error::IdleWatchError;

/// Errors originating from the JSON file store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("activity log is not valid JSON")]
    Json(#[from] serde_json::Error),
}

impl From<StorageError> for IdleWatchError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
