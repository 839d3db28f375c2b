//! Linux adapter errors.

use std::path::PathBuf;

use idlewatch_domain::error::TriggerError;

#[derive(Debug, thiserror::Error)]
pub enum LinuxError {
    #[error("cannot read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected format in {} at line {line}", path.display())]
    Parse { path: PathBuf, line: usize },

    #[error("procfs scan did not complete")]
    Join(#[from] tokio::task::JoinError),
}

impl From<LinuxError> for TriggerError {
    fn from(err: LinuxError) -> Self {
        Self::ProviderUnavailable {
            provider: "procfs",
            source: Box::new(err),
        }
    }
}
