//! Remote backup of the JSON interchange document.

mod drive;
mod sync;

use async_trait::async_trait;
use thiserror::Error;

pub use drive::DriveClient;
pub use sync::{BackupEvent, BackupJob, CloudBackup};

/// Result alias for remote calls.
pub type BackupResult<T> = Result<T, BackupError>;

/// Failures talking to the remote backup store.
#[derive(Debug, Error)]
pub enum BackupError {
    /// No access token is configured.
    #[error("sign in first: no Drive access token configured")]
    MissingToken,
    /// The request never completed.
    #[error("Drive request failed")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("Drive responded {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// The service answered with something we could not interpret.
    #[error("unexpected Drive response: {0}")]
    Unexpected(String),
}

/// The three remote operations a backup needs.
#[async_trait]
pub trait BackupRemote: Send + Sync {
    /// Locate the backup file, creating an empty one when absent. Returns its id.
    async fn ensure_file(&self) -> BackupResult<String>;
    /// Replace the file content.
    async fn upload(&self, file_id: &str, content: &str) -> BackupResult<()>;
    /// Fetch the file content.
    async fn download(&self, file_id: &str) -> BackupResult<String>;
}
