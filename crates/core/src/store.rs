//! Authoritative game collection mirrored to a single persisted slot.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    models::{Game, GameInput},
    sanitize::sanitize_collection,
};

/// File name of the persisted collection inside the data directory.
pub const DEFAULT_SLOT_NAME: &str = "gametracker_games.json";

/// Result alias for store mutations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures while mirroring the collection to its slot.
///
/// The in-memory collection has already been updated when these surface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The collection could not be rendered as JSON.
    #[error("failed to serialize game collection")]
    Serialize(#[source] serde_json::Error),
    /// Writing the slot failed.
    #[error("failed to persist game collection to {location}")]
    Persist {
        /// Human readable slot location.
        location: String,
        #[source]
        source: io::Error,
    },
}

/// A single named slot holding the whole collection as JSON text.
pub trait SlotStorage {
    /// Read the slot; `Ok(None)` when nothing has been written yet.
    fn read(&self) -> io::Result<Option<String>>;
    /// Replace the slot contents.
    fn write(&mut self, contents: &str) -> io::Result<()>;
    /// Where the slot lives, for logs and error messages.
    fn location(&self) -> String;
}

/// Slot backed by a JSON file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    /// Slot at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Slot named [`DEFAULT_SLOT_NAME`] inside `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(DEFAULT_SLOT_NAME))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SlotStorage for FileSlot {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, contents: &str) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let mut staged = tempfile::NamedTempFile::new_in(&parent)?;
        staged.write_all(contents.as_bytes())?;
        staged.flush()?;
        staged.persist(&self.path)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Slot kept in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    contents: Option<String>,
}

impl MemorySlot {
    /// Slot pre-filled with raw text, as if written by an earlier session.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }

    /// Raw text last written.
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl SlotStorage for MemorySlot {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> io::Result<()> {
        self.contents = Some(contents.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Outcome of [`GameStore::import_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    /// Whether the collection was replaced.
    pub ok: bool,
    /// Human readable explanation; always set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of records kept after filtering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl ImportOutcome {
    fn imported(count: usize) -> Self {
        Self {
            ok: true,
            message: None,
            count: Some(count),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            count: None,
        }
    }

    /// One-line status suitable for a console or status bar.
    pub fn summary(&self) -> String {
        match (self.ok, &self.message) {
            (true, None) => format!("Imported {} records", self.count.unwrap_or(0)),
            (true, Some(note)) => {
                format!("Imported {} records ({note})", self.count.unwrap_or(0))
            }
            (false, Some(message)) => message.clone(),
            (false, None) => "Import failed".to_string(),
        }
    }
}

/// Owns the game collection and mirrors it to a [`SlotStorage`] after every change.
pub struct GameStore<S: SlotStorage = FileSlot> {
    slot: S,
    games: Vec<Game>,
}

impl<S: SlotStorage> GameStore<S> {
    /// Open a store over `slot`, loading whatever it already holds.
    pub fn open(slot: S) -> Self {
        let games = Self::load(&slot);
        info!(count = games.len(), slot = %slot.location(), "game store opened");
        Self { slot, games }
    }

    /// Read the persisted collection. Never fails: unreadable or malformed
    /// data yields an empty list, malformed entries are dropped one by one.
    pub fn load(slot: &S) -> Vec<Game> {
        let raw = match slot.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(slot = %slot.location(), "failed to read game slot: {err}");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => {
                let games = sanitize_collection(&entries);
                if games.len() != entries.len() {
                    warn!(
                        kept = games.len(),
                        dropped = entries.len() - games.len(),
                        "discarded malformed persisted records"
                    );
                }
                games
            }
            Ok(_) => {
                warn!(slot = %slot.location(), "persisted games are not a list; starting empty");
                Vec::new()
            }
            Err(err) => {
                warn!(slot = %slot.location(), "failed to parse persisted games: {err}");
                Vec::new()
            }
        }
    }

    /// All records in insertion order.
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Option<&Game> {
        self.games.iter().find(|game| game.id == id)
    }

    /// Borrow the backing slot.
    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Append a new record built from `input` and persist.
    pub fn add(&mut self, input: GameInput) -> StoreResult<Game> {
        let game = self.fresh_game(input);
        self.games.push(game.clone());
        debug!(id = %game.id, title = %game.title, "game added");
        self.persist()?;
        Ok(game)
    }

    /// Append several records in order with a single persistence write.
    pub fn add_many<I>(&mut self, inputs: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = GameInput>,
    {
        let before = self.games.len();
        for input in inputs {
            let game = self.fresh_game(input);
            self.games.push(game);
        }
        let added = self.games.len() - before;
        info!(added, "games added in batch");
        self.persist()?;
        Ok(added)
    }

    /// Replace every editable field of the record `id`. Returns `false`
    /// without touching storage when no record matches.
    pub fn update(&mut self, id: &str, input: GameInput) -> StoreResult<bool> {
        let Some(game) = self.games.iter_mut().find(|game| game.id == id) else {
            debug!(id, "update ignored: unknown id");
            return Ok(false);
        };
        game.apply(input);
        self.persist()?;
        Ok(true)
    }

    /// Remove the record `id`. Returns `false` when no record matches.
    pub fn delete(&mut self, id: &str) -> StoreResult<bool> {
        let before = self.games.len();
        self.games.retain(|game| game.id != id);
        if self.games.len() == before {
            debug!(id, "delete ignored: unknown id");
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Remove every record.
    pub fn clear(&mut self) -> StoreResult<()> {
        let removed = self.games.len();
        self.games.clear();
        info!(removed, "game collection cleared");
        self.persist()
    }

    /// Pretty-printed JSON array of every record, fields in declaration order.
    pub fn export_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(&self.games).map_err(StoreError::Serialize)
    }

    /// Replace the whole collection with the records in `text`.
    ///
    /// A payload that is not a JSON list is rejected and leaves the collection
    /// untouched. Entries without `id`, `title` or `createdAt` are dropped
    /// silently; the outcome reports how many survived.
    pub fn import_json(&mut self, text: &str) -> ImportOutcome {
        let parsed = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(err) => {
                warn!("rejected import: invalid JSON: {err}");
                return ImportOutcome::rejected(format!("Invalid JSON: {err}"));
            }
        };
        let Value::Array(entries) = parsed else {
            warn!("rejected import: payload is not a list");
            return ImportOutcome::rejected("Invalid format: expected a list of games");
        };

        self.games = sanitize_collection(&entries);
        let count = self.games.len();
        info!(count, received = entries.len(), "game collection replaced by import");
        match self.persist() {
            Ok(()) => ImportOutcome::imported(count),
            Err(err) => ImportOutcome {
                ok: true,
                message: Some(format!("not saved locally: {err}")),
                count: Some(count),
            },
        }
    }

    fn fresh_game(&self, input: GameInput) -> Game {
        let mut game = Game::create(input);
        while self.get(&game.id).is_some() {
            game.id = uuid::Uuid::new_v4().to_string();
        }
        game
    }

    fn persist(&mut self) -> StoreResult<()> {
        let serialized = serde_json::to_string(&self.games).map_err(StoreError::Serialize)?;
        self.slot.write(&serialized).map_err(|source| {
            let location = self.slot.location();
            error!(slot = %location, "failed to persist games: {source}");
            StoreError::Persist { location, source }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameRanking, GameStatus};
    use serde_json::json;
    use tempfile::tempdir;

    struct BrokenSlot;

    impl SlotStorage for BrokenSlot {
        fn read(&self) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }

        fn write(&mut self, _contents: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }

        fn location(&self) -> String {
            "broken".to_string()
        }
    }

    fn ranked(title: &str, ranking: GameRanking) -> GameInput {
        GameInput {
            ranking,
            ..GameInput::titled(title)
        }
    }

    #[test]
    fn add_assigns_unique_ids_and_persists() {
        let mut store = GameStore::open(MemorySlot::default());
        let first = store.add(GameInput::titled("Game A")).expect("add");
        let second = store.add(GameInput::titled("Game B")).expect("add");

        assert_ne!(first.id, second.id);
        assert!(!first.id.is_empty());
        assert!(first.created_at_utc().is_some());

        let reloaded = GameStore::load(store.slot());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded[0].id, first.id);
        assert_eq!(reloaded[1].title, "Game B");
    }

    #[test]
    fn add_many_preserves_order_with_one_batch() {
        let mut store = GameStore::open(MemorySlot::default());
        store.add(GameInput::titled("Existing")).expect("add");
        let added = store
            .add_many(vec![GameInput::titled("One"), GameInput::titled("Two")])
            .expect("add many");
        assert_eq!(added, 2);
        let titles: Vec<_> = store.games().iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Existing", "One", "Two"]);
        assert_eq!(GameStore::load(store.slot()).len(), 3);
    }

    #[test]
    fn update_replaces_fields_but_not_identity() {
        let mut store = GameStore::open(MemorySlot::default());
        let game = store.add(GameInput::titled("Draft")).expect("add");

        let mut input = ranked("Final", GameRanking::A);
        input.status = GameStatus::Completed;
        assert!(store.update(&game.id, input).expect("update"));

        let updated = store.get(&game.id).expect("present");
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.ranking, GameRanking::A);
        assert_eq!(updated.status, GameStatus::Completed);
        assert_eq!(updated.created_at, game.created_at);

        assert!(!store.update("missing", GameInput::titled("x")).expect("no-op"));
    }

    #[test]
    fn delete_unknown_id_is_noop() {
        let mut store = GameStore::open(MemorySlot::default());
        store.add(GameInput::titled("Keep")).expect("add");
        let before = store.slot().contents().map(str::to_string);

        assert!(!store.delete("nope").expect("no-op"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.slot().contents().map(str::to_string), before);
    }

    #[test]
    fn delete_and_clear() {
        let mut store = GameStore::open(MemorySlot::default());
        let a = store.add(GameInput::titled("A")).expect("add");
        store.add(GameInput::titled("B")).expect("add");

        assert!(store.delete(&a.id).expect("delete"));
        assert_eq!(store.len(), 1);
        store.clear().expect("clear");
        assert!(store.is_empty());
        assert_eq!(store.slot().contents(), Some("[]"));
    }

    #[test]
    fn load_filters_malformed_entries() {
        let raw = json!([
            {"id": "1", "title": "Well formed", "createdAt": "2024-01-01T00:00:00Z", "ranking": "B"},
            {"id": "2", "createdAt": "2024-01-01T00:00:00Z"}
        ]);
        let slot = MemorySlot::with_contents(raw.to_string());
        let games = GameStore::load(&slot);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].title, "Well formed");
    }

    #[test]
    fn load_defaults_missing_ranking_and_invalid_status() {
        let raw = json!([
            {"id": "1", "title": "A", "createdAt": "2024-01-01T00:00:00Z", "status": "Bogus"}
        ]);
        let games = GameStore::load(&MemorySlot::with_contents(raw.to_string()));
        assert_eq!(games[0].ranking, GameRanking::G);
        assert_eq!(games[0].status, GameStatus::Tried);
    }

    #[test]
    fn load_survives_garbage() {
        assert!(GameStore::load(&MemorySlot::with_contents("{not json")).is_empty());
        assert!(GameStore::load(&MemorySlot::with_contents("{\"a\":1}")).is_empty());
        assert!(GameStore::load(&MemorySlot::with_contents("   ")).is_empty());
        assert!(GameStore::load(&BrokenSlot).is_empty());
    }

    #[test]
    fn export_then_import_round_trips() {
        let mut store = GameStore::open(MemorySlot::default());
        store.add(ranked("Game A", GameRanking::B)).expect("add");
        let mut detailed = ranked("Game B", GameRanking::S);
        detailed.total_hours = Some(12.0);
        detailed.release_date = "01/02/2020".to_string();
        store.add(detailed).expect("add");

        let exported = store.export_json().expect("export");
        assert!(exported.contains("\n  {"), "export should be pretty printed");

        let mut other = GameStore::open(MemorySlot::default());
        let outcome = other.import_json(&exported);
        assert!(outcome.ok);
        assert_eq!(outcome.count, Some(2));
        assert_eq!(other.games(), store.games());
    }

    #[test]
    fn import_rejects_non_list_without_touching_collection() {
        let mut store = GameStore::open(MemorySlot::default());
        store.add(GameInput::titled("Keep me")).expect("add");

        let outcome = store.import_json("{}");
        assert!(!outcome.ok);
        assert!(outcome.message.as_deref().is_some_and(|m| !m.is_empty()));
        assert_eq!(store.len(), 1);

        let outcome = store.import_json("not json at all");
        assert!(!outcome.ok);
        assert_eq!(store.games()[0].title, "Keep me");
    }

    #[test]
    fn import_replaces_and_filters() {
        let mut store = GameStore::open(MemorySlot::default());
        store.add(GameInput::titled("Old")).expect("add");
        let payload = json!([
            {"id": "n1", "title": "New", "createdAt": "2024-03-01T00:00:00Z"},
            {"id": "n2", "title": "Missing date"}
        ]);
        let outcome = store.import_json(&payload.to_string());
        assert_eq!(outcome, ImportOutcome::imported(1));
        assert_eq!(store.games()[0].title, "New");
        assert_eq!(store.games()[0].ranking, GameRanking::G);
        assert_eq!(GameStore::load(store.slot()).len(), 1);
    }

    #[test]
    fn persist_failure_keeps_memory_authoritative() {
        let mut store = GameStore::open(BrokenSlot);
        let result = store.add(GameInput::titled("Unsaved"));
        assert!(matches!(result, Err(StoreError::Persist { .. })));
        assert_eq!(store.len(), 1);

        let outcome = store.import_json("[]");
        assert!(outcome.ok);
        assert!(outcome.message.is_some());
    }

    #[test]
    fn file_slot_round_trip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let slot = FileSlot::in_dir(dir.path().join("nested"));
        let mut store = GameStore::open(slot.clone());
        assert!(store.is_empty());
        store.add(GameInput::titled("On disk"))?;

        assert!(slot.path().exists());
        let reopened = GameStore::open(slot);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.games()[0].title, "On disk");
        Ok(())
    }
}
