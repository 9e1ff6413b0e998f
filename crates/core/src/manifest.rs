//! Backup manifest stored next to the collection slot.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the client remembers about the remote backup between runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BackupManifest {
    /// Remote file id resolved on the first successful lookup.
    pub file_id: Option<String>,
    /// Name the id was resolved for; a different configured name invalidates it.
    pub file_name: Option<String>,
    /// Last successful upload.
    pub last_upload_at: Option<DateTime<Utc>>,
    /// Last successful download.
    pub last_download_at: Option<DateTime<Utc>>,
}

impl BackupManifest {
    /// Load the manifest at `path`, returning `None` if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read backup manifest {}", path.display()))?;
        let manifest = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse backup manifest {}", path.display()))?;
        Ok(Some(manifest))
    }

    /// Persist the manifest, creating parent directories if needed.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create manifest directory {}", parent.display())
            })?;
        }

        let serialized =
            serde_json::to_string_pretty(self).context("failed to serialize backup manifest")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write backup manifest {}", path.display()))
    }

    /// Cached id, if it was resolved for `file_name`.
    pub fn file_id_for(&self, file_name: &str) -> Option<&str> {
        match self.file_name.as_deref() {
            Some(name) if name == file_name => self.file_id.as_deref(),
            _ => None,
        }
    }
}

/// Manifest location inside the data directory.
pub fn manifest_path(data_dir: impl AsRef<Path>) -> PathBuf {
    data_dir.as_ref().join(".backlog-backup.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_manifest_loads_as_none() {
        let dir = tempdir().expect("tempdir");
        assert!(BackupManifest::load(manifest_path(dir.path()))
            .expect("load")
            .is_none());
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempdir().expect("tempdir");
        let path = manifest_path(dir.path().join("data"));
        let manifest = BackupManifest {
            file_id: Some("abc".into()),
            file_name: Some("gametracker-backup.json".into()),
            last_upload_at: Some(Utc::now()),
            last_download_at: None,
        };
        manifest.persist(&path).expect("persist");
        let loaded = BackupManifest::load(&path).expect("load").expect("present");
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.file_id_for("gametracker-backup.json"), Some("abc"));
        assert_eq!(loaded.file_id_for("other.json"), None);
    }

    #[test]
    fn corrupt_manifest_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = manifest_path(dir.path());
        fs::write(&path, "not json").expect("write");
        assert!(BackupManifest::load(&path).is_err());
    }
}
