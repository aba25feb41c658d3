//! Home bookmarks for a single player.
//!
//! A player's document holds the named homes plus the name of the default one:
//!
//! ```json
//! {
//!     "homes": {
//!         "base": { "dimension": "minecraft:overworld", "x": 12.5, "y": 64.0, "z": -8.0 }
//!     },
//!     "default": "base"
//! }
//! ```
//!
//! An empty book is written as `{}`. Documents in the older flat layout, where the
//! default pointer lived under the reserved `__default__` key next to the homes, are
//! still read and are rewritten in the layout above on the next save.

use log::{debug, error, info, warn};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, MutexGuard};

use super::documents::{PlayerDocuments, Slot};
use super::errors::Result;
use crate::location::Location;
use crate::logutil::escape_log;
use crate::validation::validate_home_name;

/// Reserved key that held the default pointer in flat documents. Never usable as a home name.
pub const DEFAULT_HOME_KEY: &str = "__default__";

/// All homes of one player plus the default pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HomeBook<L = Location> {
    #[serde(default = "BTreeMap::new", skip_serializing_if = "BTreeMap::is_empty")]
    homes: BTreeMap<String, L>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

impl<L> Default for HomeBook<L> {
    fn default() -> Self {
        Self {
            homes: BTreeMap::new(),
            default: None,
        }
    }
}

impl<L> HomeBook<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from raw parts. Homes under unusable names and a default that
    /// names no home are dropped.
    pub fn from_parts(homes: BTreeMap<String, L>, default: Option<String>) -> Self {
        let mut book = Self { homes, default };
        book.drop_invalid_names();
        book.heal();
        book
    }

    pub fn homes(&self) -> &BTreeMap<String, L> {
        &self.homes
    }

    pub fn get(&self, name: &str) -> Option<&L> {
        self.homes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.homes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.homes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.homes.is_empty()
    }

    /// Name of the default home, if it still exists.
    pub fn default_name(&self) -> Option<&str> {
        self.default
            .as_deref()
            .filter(|name| self.homes.contains_key(*name))
    }

    /// Location of the default home. A pointer to a missing home reads as unset.
    pub fn default_location(&self) -> Option<&L> {
        self.default_name().and_then(|name| self.homes.get(name))
    }

    /// Add a new home. The first home of an empty book becomes the default.
    /// Returns false for the reserved key, the empty name, or a name already in use.
    pub fn insert_home(&mut self, name: &str, location: L) -> bool {
        if validate_home_name(name).is_err() || self.homes.contains_key(name) {
            return false;
        }
        self.homes.insert(name.to_string(), location);
        if self.homes.len() == 1 {
            self.default = Some(name.to_string());
        }
        true
    }

    /// Delete a home; clears the default when it pointed at this home.
    pub fn remove_home(&mut self, name: &str) -> bool {
        if self.homes.remove(name).is_none() {
            return false;
        }
        if self.default.as_deref() == Some(name) {
            self.default = None;
        }
        true
    }

    /// Point the default at an existing home.
    pub fn set_default(&mut self, name: &str) -> bool {
        if !self.homes.contains_key(name) {
            return false;
        }
        self.default = Some(name.to_string());
        true
    }

    /// Remove homes whose names could never have been saved (the reserved key, the
    /// empty name). Returns the removed names.
    pub fn drop_invalid_names(&mut self) -> Vec<String> {
        let invalid: Vec<String> = self
            .homes
            .keys()
            .filter(|name| validate_home_name(name).is_err())
            .cloned()
            .collect();
        for name in &invalid {
            self.homes.remove(name);
        }
        invalid
    }

    /// Drop a default pointer that names no home. Returns the dropped name.
    pub fn heal(&mut self) -> Option<String> {
        let dangling = matches!(&self.default, Some(name) if !self.homes.contains_key(name));
        if dangling {
            self.default.take()
        } else {
            None
        }
    }
}

/// Which layout a document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentLayout {
    Current,
    Flat,
}

/// Decode a raw document in either layout. Bytes that are not UTF-8 are a decode error.
pub fn decode_document<L: DeserializeOwned>(
    raw: &[u8],
) -> std::result::Result<(HomeBook<L>, DocumentLayout), serde_json::Error> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        serde_json::Error::custom(format!("document is not valid UTF-8: {}", e))
    })?;
    // Guard against any accidental leading NULs
    let cleaned = text.trim_start_matches('\0');
    let value: serde_json::Value = serde_json::from_str(cleaned)?;
    match serde_json::from_value::<HomeBook<L>>(value.clone()) {
        Ok(book) => Ok((book, DocumentLayout::Current)),
        Err(current_err) => {
            let serde_json::Value::Object(entries) = value else {
                return Err(current_err);
            };
            let mut homes = BTreeMap::new();
            let mut default = None;
            for (key, entry) in entries {
                if key == DEFAULT_HOME_KEY {
                    match entry {
                        serde_json::Value::String(name) => default = Some(name),
                        other => {
                            return Err(serde_json::Error::custom(format!(
                                "{} must name a home, found {}",
                                DEFAULT_HOME_KEY, other
                            )))
                        }
                    }
                } else {
                    let location = serde_json::from_value::<L>(entry).map_err(|e| {
                        serde_json::Error::custom(format!("home '{}': {}", key, e))
                    })?;
                    homes.insert(key, location);
                }
            }
            Ok((HomeBook { homes, default }, DocumentLayout::Flat))
        }
    }
}

/// Encode a book the way it is stored on disk: four-space indentation, non-ASCII kept as is.
pub fn encode_document<L: Serialize>(book: &HomeBook<L>) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    book.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Durable home storage for one player.
///
/// Every public method runs as one critical section on the player's lock:
/// load on demand, mutate a copy, write it, then commit the copy to the cache.
/// Handles obtained for the same player from one [`super::HomeDirectory`] share
/// both the lock and the cache.
pub struct PlayerHomeStore<L = Location> {
    player: String,
    documents: Arc<PlayerDocuments<HomeBook<L>>>,
    slot: Slot<HomeBook<L>>,
}

impl<L> PlayerHomeStore<L>
where
    L: Serialize + DeserializeOwned + Clone,
{
    pub(crate) fn new(player: String, documents: Arc<PlayerDocuments<HomeBook<L>>>) -> Self {
        let slot = documents.slot(&player);
        Self {
            player,
            documents,
            slot,
        }
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    /// The player's book, read from disk on first use and cached afterwards.
    pub fn load(&self) -> Result<HomeBook<L>> {
        let mut cache = self.lock();
        Ok(self.cached(&mut cache)?.clone())
    }

    /// Persist `book`, or re-persist the cached book when `None`.
    pub fn save(&self, book: Option<&HomeBook<L>>) -> Result<()> {
        let mut cache = self.lock();
        let book = match book {
            Some(book) => book.clone(),
            None => self.cached(&mut cache)?.clone(),
        };
        self.commit(&mut cache, book)
    }

    pub fn get_home(&self, name: &str, fallback: Option<L>) -> Result<Option<L>> {
        let mut cache = self.lock();
        let book = self.cached(&mut cache)?;
        Ok(book.get(name).cloned().or(fallback))
    }

    pub fn set_home(&self, name: &str, location: L) -> Result<bool> {
        self.mutate(|book| book.insert_home(name, location))
    }

    pub fn remove_home(&self, name: &str) -> Result<bool> {
        self.mutate(|book| book.remove_home(name))
    }

    pub fn set_default(&self, name: &str) -> Result<bool> {
        self.mutate(|book| book.set_default(name))
    }

    pub fn get_default(&self, fallback: Option<L>) -> Result<Option<L>> {
        let mut cache = self.lock();
        let book = self.cached(&mut cache)?;
        Ok(book.default_location().cloned().or(fallback))
    }

    /// Homes in name order.
    pub fn list_homes(&self) -> Result<Vec<(String, L)>> {
        let mut cache = self.lock();
        let book = self.cached(&mut cache)?;
        Ok(book
            .homes()
            .iter()
            .map(|(name, loc)| (name.clone(), loc.clone()))
            .collect())
    }

    pub fn default_name(&self) -> Result<Option<String>> {
        let mut cache = self.lock();
        let book = self.cached(&mut cache)?;
        Ok(book.default_name().map(str::to_string))
    }

    /// Forget the cached book and read the document again.
    pub fn reload(&self) -> Result<HomeBook<L>> {
        let mut cache = self.lock();
        *cache = None;
        Ok(self.cached(&mut cache)?.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<HomeBook<L>>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    "home lock for {} was poisoned; dropping cached homes",
                    escape_log(&self.player)
                );
                let mut guard = poisoned.into_inner();
                *guard = None;
                self.slot.clear_poison();
                guard
            }
        }
    }

    fn cached<'a>(&self, cache: &'a mut Option<HomeBook<L>>) -> Result<&'a mut HomeBook<L>> {
        let book = match cache.take() {
            Some(book) => book,
            None => self.read_document()?,
        };
        Ok(cache.insert(book))
    }

    fn mutate<F>(&self, op: F) -> Result<bool>
    where
        F: FnOnce(&mut HomeBook<L>) -> bool,
    {
        let mut cache = self.lock();
        let mut book = self.cached(&mut cache)?.clone();
        if !op(&mut book) {
            return Ok(false);
        }
        self.commit(&mut cache, book)?;
        Ok(true)
    }

    /// Write `book` and make it the cached value. The cache is untouched when the write fails.
    fn commit(&self, cache: &mut Option<HomeBook<L>>, book: HomeBook<L>) -> Result<()> {
        let encoded = encode_document(&book)?;
        self.documents.write(&self.player, &encoded)?;
        *cache = Some(book);
        Ok(())
    }

    fn read_document(&self) -> Result<HomeBook<L>> {
        let Some(raw) = self.documents.read(&self.player)? else {
            let empty = HomeBook::new();
            self.documents.write(&self.player, &encode_document(&empty)?)?;
            debug!("created home document for {}", escape_log(&self.player));
            return Ok(empty);
        };

        match decode_document::<L>(&raw) {
            Ok((mut book, layout)) => {
                for name in book.drop_invalid_names() {
                    warn!(
                        "ignoring home '{}' of {}: not a usable home name",
                        escape_log(&name),
                        escape_log(&self.player)
                    );
                }
                if let Some(dangling) = book.heal() {
                    warn!(
                        "default home '{}' of {} does not exist; treating default as unset",
                        escape_log(&dangling),
                        escape_log(&self.player)
                    );
                }
                if layout == DocumentLayout::Flat {
                    info!(
                        "read flat home document for {}; it will be rewritten on next save",
                        escape_log(&self.player)
                    );
                }
                debug!(
                    "loaded {} home(s) for {}",
                    book.len(),
                    escape_log(&self.player)
                );
                Ok(book)
            }
            Err(e) => self.recover_corrupt_document(&raw, &e),
        }
    }

    /// Reset policy for unreadable documents: log, optionally keep a copy, and start over
    /// with an empty book. The only place where stored data is discarded.
    fn recover_corrupt_document(&self, raw: &[u8], cause: &serde_json::Error) -> Result<HomeBook<L>> {
        error!(
            "invalid data in home document {}: {}",
            self.documents.path_for(&self.player).display(),
            cause
        );
        if self.documents.quarantine_enabled() {
            let kept = self.documents.quarantine(&self.player, raw)?;
            info!("kept corrupt home document as {}", kept.display());
        }
        let empty = HomeBook::new();
        self.documents.write(&self.player, &encode_document(&empty)?)?;
        info!("reset home document for {}", escape_log(&self.player));
        Ok(empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(x: f64) -> Location {
        Location::overworld(x, 64.0, 0.0)
    }

    #[test]
    fn first_home_becomes_default() {
        let mut book = HomeBook::new();
        assert!(book.insert_home("base", loc(1.0)));
        assert!(book.insert_home("farm", loc(2.0)));
        assert_eq!(book.default_name(), Some("base"));
        assert_eq!(book.default_location(), Some(&loc(1.0)));
    }

    #[test]
    fn reserved_empty_and_duplicate_names_rejected() {
        let mut book = HomeBook::new();
        assert!(!book.insert_home(DEFAULT_HOME_KEY, loc(1.0)));
        assert!(!book.insert_home("", loc(1.0)));
        assert!(book.is_empty());
        assert!(book.insert_home("base", loc(1.0)));
        assert!(!book.insert_home("base", loc(9.0)));
        assert_eq!(book.get("base"), Some(&loc(1.0)));
    }

    #[test]
    fn removing_default_clears_pointer() {
        let mut book = HomeBook::new();
        book.insert_home("base", loc(1.0));
        book.insert_home("farm", loc(2.0));
        assert!(book.remove_home("base"));
        assert_eq!(book.default_name(), None);
        assert!(!book.remove_home("base"));

        // A later insert does not re-seed the default while other homes exist
        book.insert_home("mine", loc(3.0));
        assert_eq!(book.default_name(), None);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut book = HomeBook::new();
        assert!(book.insert_home("Base", loc(1.0)));
        assert!(book.insert_home("base", loc(2.0)));
        assert_eq!(book.len(), 2);
        assert!(!book.set_default("BASE"));
    }

    #[test]
    fn heal_drops_dangling_default() {
        let mut homes = BTreeMap::new();
        homes.insert("farm".to_string(), loc(2.0));
        let book = HomeBook::from_parts(homes, Some("gone".to_string()));
        assert_eq!(book.default_name(), None);

        let mut book: HomeBook<Location> = HomeBook::new();
        book.default = Some("ghost".to_string());
        assert_eq!(book.default_location(), None);
        assert_eq!(book.heal().as_deref(), Some("ghost"));
        assert_eq!(book.heal(), None);
    }

    #[test]
    fn empty_book_encodes_as_empty_object() {
        let book: HomeBook<Location> = HomeBook::new();
        assert_eq!(encode_document(&book).unwrap(), "{}");
    }

    #[test]
    fn encoding_uses_four_space_indent_and_keeps_unicode() {
        let mut book = HomeBook::new();
        book.insert_home("家", loc(1.0));
        let text = encode_document(&book).unwrap();
        assert!(text.contains("\n    \"homes\": {"));
        assert!(text.contains("\"家\""));
        assert!(text.contains("\"default\": \"家\""));
    }

    #[test]
    fn decode_flat_layout() {
        let raw = r#"{
            "base": {"dimension": "minecraft:overworld", "x": 1.0, "y": 64.0, "z": 0.0},
            "__default__": "base"
        }"#;
        let (book, layout) = decode_document::<Location>(raw.as_bytes()).unwrap();
        assert_eq!(layout, DocumentLayout::Flat);
        assert_eq!(book.default_location(), Some(&loc(1.0)));
    }

    #[test]
    fn decode_rejects_bad_shapes() {
        assert!(decode_document::<Location>(b"[]").is_err());
        assert!(decode_document::<Location>(b"not json").is_err());
        assert!(decode_document::<Location>(br#"{"base": 5}"#).is_err());
        assert!(decode_document::<Location>(br#"{"__default__": 3}"#).is_err());
        assert!(decode_document::<Location>(br#"{"homes": {"a": 1}}"#).is_err());
        let err = decode_document::<Location>(b"{\xFF\xFE}").unwrap_err();
        assert!(err.to_string().contains("UTF-8"), "{}", err);
    }

    #[test]
    fn decode_current_layout_and_leading_nuls() {
        let (book, layout) = decode_document::<Location>(b"\0\0{}").unwrap();
        assert_eq!(layout, DocumentLayout::Current);
        assert!(book.is_empty());
    }

    #[test]
    fn reserved_and_empty_keys_are_dropped_from_decoded_books() {
        let raw = br#"{
            "homes": {
                "__default__": {"dimension": "minecraft:overworld", "x": 9.0, "y": 64.0, "z": 0.0},
                "": {"dimension": "minecraft:overworld", "x": 8.0, "y": 64.0, "z": 0.0},
                "base": {"dimension": "minecraft:overworld", "x": 1.0, "y": 64.0, "z": 0.0}
            },
            "default": "__default__"
        }"#;
        let (mut book, _) = decode_document::<Location>(raw).unwrap();
        let mut dropped = book.drop_invalid_names();
        dropped.sort();
        assert_eq!(dropped, vec!["".to_string(), DEFAULT_HOME_KEY.to_string()]);
        assert_eq!(book.heal().as_deref(), Some(DEFAULT_HOME_KEY));
        assert_eq!(book.len(), 1);
        assert_eq!(book.default_location(), None);

        let mut homes = BTreeMap::new();
        homes.insert(DEFAULT_HOME_KEY.to_string(), loc(9.0));
        let book = HomeBook::from_parts(homes, Some(DEFAULT_HOME_KEY.to_string()));
        assert!(book.is_empty());
        assert_eq!(book.default_name(), None);
    }

    #[test]
    fn panic_while_holding_the_lock_forces_a_reread() {
        let tmp = tempfile::tempdir().unwrap();
        let homes: crate::storage::HomeDirectory =
            crate::storage::HomeDirectory::open(tmp.path().join("home")).unwrap();
        let store = homes.store("alex").unwrap();
        assert!(store.set_home("base", loc(1.0)).unwrap());

        let slot = store.slot.clone();
        let crashed = std::thread::spawn(move || {
            let _guard = slot.lock().unwrap();
            panic!("crash while holding the home lock");
        })
        .join();
        assert!(crashed.is_err());
        assert!(store.slot.is_poisoned());

        // Edit the document behind the stale cache
        let path = store.documents.path_for(store.player());
        let mut edited = HomeBook::new();
        edited.insert_home("farm", loc(2.0));
        std::fs::write(&path, encode_document(&edited).unwrap()).unwrap();

        assert_eq!(store.get_home("farm", None).unwrap(), Some(loc(2.0)));
        assert_eq!(store.get_home("base", None).unwrap(), None);
        assert!(!store.slot.is_poisoned());

        // The recovered lock keeps working for writes
        assert!(store.set_home("mine", loc(3.0)).unwrap());
        assert_eq!(store.default_name().unwrap().as_deref(), Some("farm"));
    }
}
