//! Test utilities & fixtures shared by the home storage integration tests.

use playerhomes::location::Location;
use playerhomes::storage::{HomeBook, HomeDirectory, HomeDirectoryBuilder};
use std::path::Path;

/// Open a fresh home directory in `root` (no quarantine).
#[allow(dead_code)]
pub fn open_dir(root: &Path) -> HomeDirectory {
    HomeDirectory::open(root.join("home")).expect("open home dir")
}

/// Open a fresh home directory in `root` keeping copies of corrupt documents.
#[allow(dead_code)]
pub fn open_dir_quarantined(root: &Path) -> HomeDirectory {
    HomeDirectoryBuilder::new(root.join("home"))
        .quarantine_corrupt(true)
        .open()
        .expect("open home dir")
}

#[allow(dead_code)]
pub fn loc(x: f64, y: f64, z: f64) -> Location {
    Location::overworld(x, y, z)
}

/// Check the book-level invariants: the default, when set, names an existing home.
#[allow(dead_code)]
pub fn assert_consistent(book: &HomeBook) {
    if let Some(name) = book.default_name() {
        assert!(book.contains(name), "default '{}' names no home", name);
    }
    assert!(!book.contains(playerhomes::storage::DEFAULT_HOME_KEY));
}
