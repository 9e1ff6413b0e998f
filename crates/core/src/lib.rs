#![warn(clippy::all, missing_docs)]

//! Core domain logic for the backlog tracker.
//!
//! This crate hosts the game models, the persisted record store, querying,
//! file and spreadsheet transfer, remote backup and configuration used by
//! the terminal UI and any future frontends.

pub mod backup;
pub mod config;
pub mod manifest;
pub mod models;
pub mod query;
pub mod sanitize;
pub mod spreadsheet;
pub mod store;
pub mod transfer;

pub use backup::{BackupEvent, BackupJob, BackupRemote, CloudBackup, DriveClient};
pub use config::AppConfig;
pub use manifest::BackupManifest;
pub use models::{Game, GameInput, GameRanking, GameStatus, Locale};
pub use query::{GameQuery, Page, SortKey, StatusCounts};
pub use store::{FileSlot, GameStore, ImportOutcome, MemorySlot, SlotStorage, StoreError};
