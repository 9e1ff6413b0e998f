use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    manifest::{self, BackupManifest},
    store::{GameStore, ImportOutcome, SlotStorage},
};

use super::{BackupError, BackupRemote, DriveClient};

/// Work handed to a background backup task.
#[derive(Debug, Clone)]
pub enum BackupJob {
    /// Upload this interchange document.
    Upload(String),
    /// Fetch the remote document.
    Download,
}

/// Events emitted by [`CloudBackup::run`].
#[derive(Debug)]
pub enum BackupEvent {
    /// The remote file is ready.
    FileReady {
        /// Remote file id.
        file_id: String,
    },
    /// Upload finished.
    Uploaded {
        /// Remote file id.
        file_id: String,
    },
    /// Download finished; the caller imports `content` into its store.
    Downloaded {
        /// Remote file id.
        file_id: String,
        /// Raw interchange document.
        content: String,
    },
    /// The job failed; nothing was changed locally.
    Error(anyhow::Error),
}

/// Moves the collection to and from a [`BackupRemote`], remembering the
/// remote file id in a [`BackupManifest`].
pub struct CloudBackup<R: BackupRemote> {
    remote: R,
    file_name: String,
    manifest_path: PathBuf,
    manifest: BackupManifest,
}

impl CloudBackup<DriveClient> {
    /// Drive-backed instance using the configured token and data directory.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let remote = DriveClient::new(config.drive.clone())?;
        Ok(Self::new(
            remote,
            config.drive.file_name.clone(),
            manifest::manifest_path(&config.data_dir),
        ))
    }
}

impl<R: BackupRemote> CloudBackup<R> {
    /// Wrap `remote`; an unreadable manifest is treated as empty.
    pub fn new(
        remote: R,
        file_name: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
    ) -> Self {
        let manifest_path = manifest_path.into();
        let manifest = match BackupManifest::load(&manifest_path) {
            Ok(manifest) => manifest.unwrap_or_default(),
            Err(err) => {
                warn!("ignoring backup manifest: {err:#}");
                BackupManifest::default()
            }
        };
        Self {
            remote,
            file_name: file_name.into(),
            manifest_path,
            manifest,
        }
    }

    /// Current manifest state.
    pub fn manifest(&self) -> &BackupManifest {
        &self.manifest
    }

    /// Resolve the remote file id, asking the remote only when none is cached.
    pub async fn resolve_file(&mut self) -> Result<String> {
        if let Some(id) = self.manifest.file_id_for(&self.file_name) {
            return Ok(id.to_string());
        }
        let id = self
            .remote
            .ensure_file()
            .await
            .context("failed to prepare the backup file")?;
        self.manifest.file_id = Some(id.clone());
        self.manifest.file_name = Some(self.file_name.clone());
        self.save_manifest();
        info!(file_id = %id, "backup file ready");
        Ok(id)
    }

    /// Upload `content`, returning the remote file id.
    pub async fn upload(&mut self, content: &str) -> Result<String> {
        let file_id = self.resolve_file().await?;
        if let Err(err) = self.remote.upload(&file_id, content).await {
            self.forget_missing_file(&err);
            return Err(anyhow::Error::new(err).context("failed to upload backup"));
        }
        self.manifest.last_upload_at = Some(Utc::now());
        self.save_manifest();
        info!(file_id = %file_id, bytes = content.len(), "backup uploaded");
        Ok(file_id)
    }

    /// Fetch the remote document.
    pub async fn download(&mut self) -> Result<String> {
        let file_id = self.resolve_file().await?;
        let content = match self.remote.download(&file_id).await {
            Ok(content) => content,
            Err(err) => {
                self.forget_missing_file(&err);
                return Err(anyhow::Error::new(err).context("failed to download backup"));
            }
        };
        self.manifest.last_download_at = Some(Utc::now());
        self.save_manifest();
        info!(file_id = %file_id, bytes = content.len(), "backup downloaded");
        Ok(content)
    }

    /// Upload the store's interchange document.
    pub async fn push<S: SlotStorage>(&mut self, store: &GameStore<S>) -> Result<String> {
        let payload = store.export_json()?;
        self.upload(&payload).await
    }

    /// Replace the store with the remote document. The store is only touched
    /// once the download has completed.
    pub async fn pull<S: SlotStorage>(
        &mut self,
        store: &mut GameStore<S>,
    ) -> Result<ImportOutcome> {
        let content = self.download().await?;
        Ok(store.import_json(&content))
    }

    /// Run one job, reporting progress on `sender`.
    pub async fn run(mut self, job: BackupJob, sender: mpsc::Sender<BackupEvent>) -> Result<()> {
        let file_id = match self.resolve_file().await {
            Ok(id) => id,
            Err(err) => {
                let _ = sender.send(BackupEvent::Error(err)).await;
                return Ok(());
            }
        };
        let _ = sender
            .send(BackupEvent::FileReady {
                file_id: file_id.clone(),
            })
            .await;

        let event = match job {
            BackupJob::Upload(payload) => match self.upload(&payload).await {
                Ok(file_id) => BackupEvent::Uploaded { file_id },
                Err(err) => BackupEvent::Error(err),
            },
            BackupJob::Download => match self.download().await {
                Ok(content) => BackupEvent::Downloaded { file_id, content },
                Err(err) => BackupEvent::Error(err),
            },
        };
        sender
            .send(event)
            .await
            .context("failed to send backup event")?;
        Ok(())
    }

    fn forget_missing_file(&mut self, err: &BackupError) {
        if matches!(err, BackupError::Status { status: 404, .. }) {
            warn!("cached backup file no longer exists; it will be looked up again");
            self.manifest.file_id = None;
            self.save_manifest();
        }
    }

    fn save_manifest(&self) {
        if let Err(err) = self.manifest.persist(&self.manifest_path) {
            warn!("failed to save backup manifest: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backup::BackupResult, models::GameInput, store::MemorySlot};
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeRemote {
        content: Mutex<Option<String>>,
        ensure_calls: AtomicUsize,
        missing: Mutex<bool>,
        fail_downloads: bool,
    }

    #[async_trait]
    impl BackupRemote for Arc<FakeRemote> {
        async fn ensure_file(&self) -> BackupResult<String> {
            self.ensure_calls.fetch_add(1, Ordering::SeqCst);
            *self.missing.lock().expect("lock") = false;
            let mut content = self.content.lock().expect("lock");
            content.get_or_insert_with(|| "[]".to_string());
            Ok("file-1".to_string())
        }

        async fn upload(&self, _file_id: &str, content: &str) -> BackupResult<()> {
            if *self.missing.lock().expect("lock") {
                return Err(BackupError::Status {
                    status: 404,
                    body: "File not found".into(),
                });
            }
            *self.content.lock().expect("lock") = Some(content.to_string());
            Ok(())
        }

        async fn download(&self, _file_id: &str) -> BackupResult<String> {
            if self.fail_downloads {
                return Err(BackupError::Unexpected("connection reset".into()));
            }
            Ok(self.content.lock().expect("lock").clone().unwrap_or_default())
        }
    }

    fn store_with(titles: &[&str]) -> GameStore<MemorySlot> {
        let mut store = GameStore::open(MemorySlot::default());
        for title in titles {
            store.add(GameInput::titled(*title)).expect("add");
        }
        store
    }

    #[tokio::test]
    async fn push_then_pull_restores_collection() {
        let dir = tempdir().expect("tempdir");
        let remote = Arc::new(FakeRemote::default());
        let mut backup = CloudBackup::new(remote.clone(), "backup.json", dir.path().join("m.json"));

        let source = store_with(&["Outer Wilds", "Tunic"]);
        backup.push(&source).await.expect("push");

        let mut target = store_with(&["Stale"]);
        let outcome = backup.pull(&mut target).await.expect("pull");
        assert!(outcome.ok);
        assert_eq!(outcome.count, Some(2));
        assert_eq!(target.games(), source.games());
        assert_eq!(remote.ensure_calls.load(Ordering::SeqCst), 1);

        let manifest = backup.manifest();
        assert_eq!(manifest.file_id.as_deref(), Some("file-1"));
        assert!(manifest.last_upload_at.is_some());
        assert!(manifest.last_download_at.is_some());
    }

    #[tokio::test]
    async fn cached_file_id_survives_restart() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("m.json");
        let remote = Arc::new(FakeRemote::default());

        let mut first = CloudBackup::new(remote.clone(), "backup.json", &path);
        first.resolve_file().await.expect("resolve");

        let mut second = CloudBackup::new(remote.clone(), "backup.json", &path);
        assert_eq!(second.resolve_file().await.expect("resolve"), "file-1");
        assert_eq!(remote.ensure_calls.load(Ordering::SeqCst), 1);

        let mut renamed = CloudBackup::new(remote.clone(), "other.json", &path);
        renamed.resolve_file().await.expect("resolve");
        assert_eq!(remote.ensure_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_download_leaves_store_untouched() {
        let dir = tempdir().expect("tempdir");
        let remote = Arc::new(FakeRemote {
            fail_downloads: true,
            ..FakeRemote::default()
        });
        let mut backup = CloudBackup::new(remote, "backup.json", dir.path().join("m.json"));
        let mut store = store_with(&["Keep me"]);
        let before = store.games().to_vec();

        let err = backup.pull(&mut store).await.expect_err("download fails");
        assert!(format!("{err:#}").contains("connection reset"));
        assert_eq!(store.games(), before.as_slice());
        assert!(backup.manifest().last_download_at.is_none());
    }

    #[tokio::test]
    async fn missing_remote_file_clears_cached_id() {
        let dir = tempdir().expect("tempdir");
        let remote = Arc::new(FakeRemote::default());
        let mut backup = CloudBackup::new(remote.clone(), "backup.json", dir.path().join("m.json"));
        backup.resolve_file().await.expect("resolve");

        *remote.missing.lock().expect("lock") = true;
        assert!(backup.upload("[]").await.is_err());
        assert!(backup.manifest().file_id.is_none());

        backup.upload("[]").await.expect("upload after lookup");
        assert_eq!(remote.ensure_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_reports_through_channel() {
        let dir = tempdir().expect("tempdir");
        let remote = Arc::new(FakeRemote::default());
        *remote.content.lock().expect("lock") = Some("[{\"id\":\"1\"}]".into());
        let backup = CloudBackup::new(remote, "backup.json", dir.path().join("m.json"));

        let (tx, mut rx) = mpsc::channel(4);
        backup.run(BackupJob::Download, tx).await.expect("run");

        assert!(matches!(rx.recv().await, Some(BackupEvent::FileReady { .. })));
        match rx.recv().await {
            Some(BackupEvent::Downloaded { file_id, content }) => {
                assert_eq!(file_id, "file-1");
                assert!(content.contains("\"id\""));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
