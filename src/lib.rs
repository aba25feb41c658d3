//! # Playerhomes - Per-Player Home Bookmarks
//!
//! Playerhomes stores named "home" locations for the players of a game server. Each player
//! may save several homes and pick one of them as the default, which is what a bare
//! `home` command teleports to.
//!
//! ## Features
//!
//! - **One Document Per Player**: pretty-printed UTF-8 JSON, readable and editable by operators
//! - **Default Home**: the first home saved becomes the default; removing it clears the default
//! - **Race-Safe**: each operation holds the player's lock from load to write-back
//! - **Self-Healing**: unreadable documents reset to empty instead of failing the caller
//! - **Operator CLI**: the `playerhomes` binary lists and edits homes from the shell
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use playerhomes::location::Location;
//! use playerhomes::storage::HomeDirectory;
//!
//! fn main() -> anyhow::Result<()> {
//!     let homes: HomeDirectory = HomeDirectory::open("./data/home")?;
//!     let alex = homes.store("Alex")?;
//!
//!     assert!(alex.set_home("base", Location::overworld(0.5, 70.0, 0.5))?);
//!     assert!(alex.set_home("mine", Location::overworld(120.0, 12.0, -40.0))?);
//!     assert!(alex.set_default("mine")?);
//!
//!     if let Some(spot) = alex.get_default(None)? {
//!         println!("teleporting Alex to {}", spot);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`storage`] - Home documents, per-player locking and caching
//! - [`location`] - The saved coordinate type
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Player id and home name rules
//! - [`logutil`] - Log-safe rendering of player-supplied strings

pub mod config;
pub mod location;
pub mod logutil;
pub mod storage;
pub mod validation;
