//! Moving the JSON backup between the store and a user-chosen file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::info;

use crate::store::{GameStore, ImportOutcome, SlotStorage};

/// File name offered for JSON exports.
pub const DEFAULT_BACKUP_NAME: &str = "gametracker-backup.json";

/// Default export location inside `dir`.
pub fn default_backup_path(dir: impl AsRef<Path>) -> PathBuf {
    dir.as_ref().join(DEFAULT_BACKUP_NAME)
}

/// Write the pretty-printed collection to `path`.
pub fn export_to_file<S: SlotStorage>(
    store: &GameStore<S>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let json = store.export_json()?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create export directory {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("failed to write backup {}", path.display()))?;
    info!(path = %path.display(), count = store.len(), "backup exported");
    Ok(())
}

/// Replace the collection with the contents of a backup file.
///
/// Only reading the file can fail; payload problems come back in the outcome.
pub fn import_from_file<S: SlotStorage>(
    store: &mut GameStore<S>,
    path: impl AsRef<Path>,
) -> Result<ImportOutcome> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read backup {}", path.display()))?;
    let outcome = store.import_json(&text);
    info!(path = %path.display(), ok = outcome.ok, "backup import finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::GameInput, store::MemorySlot};
    use tempfile::tempdir;

    #[test]
    fn export_then_import_restores_collection() {
        let dir = tempdir().expect("tempdir");
        let path = default_backup_path(dir.path().join("nested"));

        let mut source = GameStore::open(MemorySlot::default());
        source.add(GameInput::titled("Hollow Knight")).expect("add");
        source.add(GameInput::titled("Celeste")).expect("add");
        export_to_file(&source, &path).expect("export");

        let mut target = GameStore::open(MemorySlot::default());
        target.add(GameInput::titled("Overwritten")).expect("add");
        let outcome = import_from_file(&mut target, &path).expect("import");
        assert!(outcome.ok);
        assert_eq!(outcome.count, Some(2));
        assert_eq!(target.games(), source.games());
    }

    #[test]
    fn invalid_payload_keeps_collection() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"games\": []}").expect("write");

        let mut store = GameStore::open(MemorySlot::default());
        store.add(GameInput::titled("Kept")).expect("add");
        let outcome = import_from_file(&mut store, &path).expect("read");
        assert!(!outcome.ok);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let mut store = GameStore::open(MemorySlot::default());
        let err =
            import_from_file(&mut store, dir.path().join("absent.json")).expect_err("missing");
        assert!(err.to_string().contains("failed to read backup"));
    }
}
