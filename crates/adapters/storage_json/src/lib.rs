//! # idlewatch-adapter-storage-json
//!
//! Persists the activity log as a single JSON array on disk.
//!
//! Saves go through a sibling temporary file that is renamed over the
//! target, so a crash mid-write leaves the previous log intact.

mod error;

pub use error::StorageError;

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use idlewatch_app::ports::ActivityLogStore;
use idlewatch_domain::activity::LogEntry;
use idlewatch_domain::error::IdleWatchError;

/// [`ActivityLogStore`] backed by one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileLogStore {
    path: PathBuf,
}

impl JsonFileLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn read_entries(&self) -> Result<Vec<LogEntry>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tracing::instrument(skip(self, entries), fields(path = %self.path.display(), count = entries.len()))]
    async fn write_entries(&self, entries: &[LogEntry]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(entries)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        tracing::debug!("activity log saved");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ActivityLogStore for JsonFileLogStore {
    fn load(&self) -> impl Future<Output = Result<Vec<LogEntry>, IdleWatchError>> + Send {
        async move { Ok(self.read_entries().await?) }
    }

    fn save(&self, entries: &[LogEntry]) -> impl Future<Output = Result<(), IdleWatchError>> + Send {
        async move { Ok(self.write_entries(entries).await?) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use idlewatch_domain::activity::LogStatus;

    fn entries() -> Vec<LogEntry> {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 22, 15, 0).unwrap();
        vec![
            LogEntry::at(at, "Network idle on eth0", "Shut Down", LogStatus::Executed),
            LogEntry::at(at, "Processes idle: rsync", "Lock Screen", LogStatus::Error)
                .with_details("executing: loginctl exited with status 1"),
        ]
    }

    #[tokio::test]
    async fn should_load_nothing_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLogStore::new(dir.path().join("activity.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_round_trip_entries_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLogStore::new(dir.path().join("nested/dir/activity.json"));

        store.save(&entries()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), entries());
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn should_replace_previous_contents_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLogStore::new(dir.path().join("activity.json"));

        store.save(&entries()).await.unwrap();
        store.save(&entries()[..1]).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_report_corrupt_file_as_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileLogStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, IdleWatchError::Storage(_)));
        assert_eq!(err.stage(), None);
    }
}
