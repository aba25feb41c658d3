//! # Storage Module - Home Persistence Layer
//!
//! This module persists every player's home bookmarks as one JSON document per player.
//!
//! ## Features
//!
//! - **Per-Player Documents**: `<data_dir>/<home_folder>/<player>.json`, player ids percent-encoded
//! - **Per-Player Locking**: every operation holds that player's lock from load to write-back
//! - **Shared Cache**: handles for the same player share one cached book
//! - **Atomic Writes**: temp file + `fs2` exclusive lock + rename
//! - **Self-Healing**: corrupt documents reset to empty, dangling defaults read as unset
//!
//! ## Layout
//!
//! ```text
//! data/
//! └── home/
//!     ├── Steve.json
//!     └── Alex.json
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use playerhomes::location::Location;
//! use playerhomes::storage::HomeDirectory;
//!
//! fn main() -> anyhow::Result<()> {
//!     let homes: HomeDirectory = HomeDirectory::open("./data/home")?;
//!     let steve = homes.store("Steve")?;
//!
//!     steve.set_home("base", Location::overworld(12.5, 64.0, -8.0))?;
//!     let spawn = steve.get_default(None)?;
//!     println!("default home: {:?}", spawn);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Only I/O and encoding failures reach callers as [`HomeStoreError`]. Unreadable
//! documents are logged and reset; refused operations return `false`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::location::Location;
use crate::validation::validate_player_id;

pub mod documents;
pub mod errors;
pub mod home;

pub use documents::PlayerDocuments;
pub use errors::{HomeStoreError, Result};
pub use home::{
    decode_document, encode_document, DocumentLayout, HomeBook, PlayerHomeStore, DEFAULT_HOME_KEY,
};

/// Builder so tests and the CLI can open directories with custom options.
pub struct HomeDirectoryBuilder {
    folder: PathBuf,
    quarantine_corrupt: bool,
}

impl HomeDirectoryBuilder {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            quarantine_corrupt: false,
        }
    }

    /// Keep a timestamped copy of corrupt documents before resetting them.
    pub fn quarantine_corrupt(mut self, enabled: bool) -> Self {
        self.quarantine_corrupt = enabled;
        self
    }

    pub fn open<L>(self) -> Result<HomeDirectory<L>>
    where
        L: Serialize + DeserializeOwned + Clone,
    {
        let documents = PlayerDocuments::new(self.folder, self.quarantine_corrupt);
        documents.ensure_folder()?;
        Ok(HomeDirectory {
            documents: Arc::new(documents),
        })
    }
}

/// Folder of player home documents; hands out [`PlayerHomeStore`] handles.
pub struct HomeDirectory<L = Location> {
    documents: Arc<PlayerDocuments<HomeBook<L>>>,
}

impl<L> Clone for HomeDirectory<L> {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
        }
    }
}

impl<L> HomeDirectory<L>
where
    L: Serialize + DeserializeOwned + Clone,
{
    /// Open (or create) the home folder at `folder` with default options.
    pub fn open(folder: impl Into<PathBuf>) -> Result<Self> {
        HomeDirectoryBuilder::new(folder).open()
    }

    /// Open the folder described by the `[storage]` config section.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        HomeDirectoryBuilder::new(config.home_folder_path())
            .quarantine_corrupt(config.quarantine_corrupt)
            .open()
    }

    pub fn folder(&self) -> &Path {
        self.documents.folder()
    }

    /// Handle for one player's homes. Handles for the same player share lock and cache.
    pub fn store(&self, player: &str) -> Result<PlayerHomeStore<L>> {
        let player = validate_player_id(player)
            .map_err(|e| HomeStoreError::InvalidPlayer(e.to_string()))?;
        Ok(PlayerHomeStore::new(player, Arc::clone(&self.documents)))
    }

    /// Whether the player already has a document on disk.
    pub fn has_document(&self, player: &str) -> bool {
        match validate_player_id(player) {
            Ok(player) => self.documents.exists(&player),
            Err(_) => false,
        }
    }

    /// Players with a document, sorted.
    pub fn players(&self) -> Result<Vec<String>> {
        Ok(self.documents.players()?)
    }
}
