//! Saved world coordinates.
//!
//! The home store never looks inside a location: it is written, read back and compared
//! as a whole. Any serde-serializable type can stand in for [`Location`] by using
//! `PlayerHomeStore<MyLocation>` instead of the default.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimension key for the overworld as reported by the game server.
pub const OVERWORLD: &str = "minecraft:overworld";

/// A position inside one dimension of the game world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub dimension: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(dimension: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            dimension: dimension.into(),
            x,
            y,
            z,
        }
    }

    /// Convenience constructor for the overworld.
    pub fn overworld(x: f64, y: f64, z: f64) -> Self {
        Self::new(OVERWORLD, x, y, z)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.1}, {:.1}, {:.1})",
            self.dimension, self.x, self.y, self.z
        )
    }
}
