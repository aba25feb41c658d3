//! Per-player JSON documents inside one folder.
//!
//! Each player owns `<folder>/<safe_filename(player)>.json`. This layer knows nothing
//! about the document contents: it resolves paths, reads and atomically replaces files,
//! and keeps the in-process lock registry (one slot per player).

use chrono::Utc;
use fs2::FileExt;
use log::debug;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::validation::safe_filename;

/// Shared per-player slot. The mutex is the player's lock; the guarded value is
/// whatever the caller caches for that player.
pub type Slot<T> = Arc<Mutex<Option<T>>>;

pub struct PlayerDocuments<T> {
    folder: PathBuf,
    quarantine_corrupt: bool,
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T> PlayerDocuments<T> {
    pub fn new(folder: impl Into<PathBuf>, quarantine_corrupt: bool) -> Self {
        Self {
            folder: folder.into(),
            quarantine_corrupt,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn quarantine_enabled(&self) -> bool {
        self.quarantine_corrupt
    }

    /// Create the folder if it does not exist yet.
    pub fn ensure_folder(&self) -> std::io::Result<()> {
        if !self.folder.exists() {
            fs::create_dir_all(&self.folder)?;
        }
        Ok(())
    }

    pub fn path_for(&self, player: &str) -> PathBuf {
        self.folder.join(format!("{}.json", safe_filename(player)))
    }

    pub fn exists(&self, player: &str) -> bool {
        self.path_for(player).is_file()
    }

    /// Read the raw document bytes; `None` when the player has no document yet.
    /// Contents are not checked here, not even for UTF-8.
    pub fn read(&self, player: &str) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(player)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the player's document with `content`.
    pub fn write(&self, player: &str, content: &str) -> std::io::Result<()> {
        self.ensure_folder()?;
        write_file_locked(&self.path_for(player), content.as_bytes())
    }

    /// Copy a corrupt document aside before it is reset. Returns the copy's path.
    pub fn quarantine(&self, player: &str, raw: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(player);
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("home.json");
        let target = self.folder.join(format!("{}.corrupt-{}", base, stamp));
        fs::write(&target, raw)?;
        Ok(target)
    }

    /// Fetch (or create) the lock slot for a player.
    pub fn slot(&self, player: &str) -> Slot<T> {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots
            .entry(player.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Player ids that currently have a document, decoded from their filenames.
    pub fn players(&self) -> std::io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut players = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            let decoded = percent_encoding::percent_decode_str(stem).decode_utf8_lossy();
            players.push(decoded.into_owned());
        }
        players.sort();
        Ok(players)
    }
}

/// Sidecar file locked while `path` is replaced. The document itself only ever
/// appears through the final rename.
fn lock_path(path: &Path) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("home.json");
    dir.join(format!(".{}.lock", base))
}

/// Write `content` to `path` under an exclusive lock: temp file in the same directory,
/// fsync, rename over the destination, then fsync the directory (best-effort).
fn write_file_locked(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path(path))?;
    lock_file.lock_exclusive()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("home.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                if let Err(e) = tmp.write_all(content).and_then(|_| tmp.flush()) {
                    drop(tmp);
                    let _ = fs::remove_file(&candidate);
                    return Err(e);
                }
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(e),
        }
    };

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    debug!("wrote {} ({} bytes)", path.display(), content.len());

    let _ = lock_file.unlock();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_missing_document_is_none() {
        let tmp = tempdir().unwrap();
        let docs: PlayerDocuments<()> = PlayerDocuments::new(tmp.path().join("home"), false);
        assert!(!docs.exists("alex"));
        assert!(docs.read("alex").unwrap().is_none());
    }

    #[test]
    fn write_creates_folder_and_replaces_contents() {
        let tmp = tempdir().unwrap();
        let docs: PlayerDocuments<()> = PlayerDocuments::new(tmp.path().join("home"), false);
        docs.write("alex", "{\"a\": 1}").unwrap();
        docs.write("alex", "{}").unwrap();
        assert!(docs.exists("alex"));
        assert_eq!(docs.read("alex").unwrap().as_deref(), Some(&b"{}"[..]));

        // No temp files are left behind
        let leftovers: Vec<_> = fs::read_dir(docs.folder())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn path_layout_uses_encoded_player_id() {
        let docs: PlayerDocuments<()> = PlayerDocuments::new("/srv/data/home", false);
        assert_eq!(
            docs.path_for("Steve"),
            PathBuf::from("/srv/data/home/Steve.json")
        );
        assert_eq!(
            docs.path_for("../x"),
            PathBuf::from("/srv/data/home/%2E%2E%2Fx.json")
        );
    }

    #[test]
    fn slots_are_shared_per_player() {
        let docs: PlayerDocuments<u32> = PlayerDocuments::new("/unused", false);
        let a1 = docs.slot("alex");
        let a2 = docs.slot("alex");
        let b = docs.slot("blair");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));

        *a1.lock().unwrap() = Some(7);
        assert_eq!(*a2.lock().unwrap(), Some(7));
        assert_eq!(*b.lock().unwrap(), None);
    }

    #[test]
    fn players_lists_decoded_ids() {
        let tmp = tempdir().unwrap();
        let docs: PlayerDocuments<()> = PlayerDocuments::new(tmp.path(), false);
        docs.write("zed", "{}").unwrap();
        docs.write("a b", "{}").unwrap();
        docs.quarantine("zed", b"[]").unwrap();
        assert_eq!(docs.players().unwrap(), vec!["a b".to_string(), "zed".to_string()]);
    }

    #[test]
    fn read_returns_bytes_that_are_not_utf8() {
        let tmp = tempdir().unwrap();
        let docs: PlayerDocuments<()> = PlayerDocuments::new(tmp.path(), false);
        fs::write(docs.path_for("alex"), b"{\xFF\xFE}").unwrap();
        assert_eq!(docs.read("alex").unwrap().as_deref(), Some(&b"{\xFF\xFE}"[..]));
    }

    #[test]
    fn lock_lives_beside_the_document() {
        let tmp = tempdir().unwrap();
        let docs: PlayerDocuments<()> = PlayerDocuments::new(tmp.path(), false);
        docs.write("alex", "{}").unwrap();
        assert!(tmp.path().join(".alex.json.lock").is_file());
        assert_eq!(fs::read(docs.path_for("alex")).unwrap(), b"{}");
        assert_eq!(docs.players().unwrap(), vec!["alex".to_string()]);
    }

    #[test]
    fn failed_write_leaves_no_document_behind() {
        let tmp = tempdir().unwrap();
        let docs: PlayerDocuments<()> = PlayerDocuments::new(tmp.path(), false);
        // A non-empty directory in the document's place makes the final rename fail
        let blocker = docs.path_for("alex");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        assert!(docs.write("alex", "{\"homes\": {}}").is_err());
        assert!(blocker.is_dir());
        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.contains(".tmp-")), "{:?}", names);
        assert!(!docs.exists("alex"));
    }

    #[test]
    fn new_document_is_never_observed_empty() {
        let tmp = tempdir().unwrap();
        let docs: PlayerDocuments<()> = PlayerDocuments::new(tmp.path().join("home"), false);
        assert!(!docs.path_for("alex").exists());
        docs.write("alex", "{}").unwrap();
        assert_eq!(fs::metadata(docs.path_for("alex")).unwrap().len(), 2);
    }
}
