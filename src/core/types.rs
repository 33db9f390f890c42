//! Core type aliases and coordinates

use serde::{Deserialize, Serialize};

pub use glam::IVec3;

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Horizontal coordinate of a world chunk column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region containing this chunk, flooring toward negative infinity
    pub fn region(self, region_size: usize) -> RegionPos {
        let size = region_size as i32;
        RegionPos::new(self.x.div_euclid(size), self.z.div_euclid(size))
    }
}

/// Coordinate of a region (a square block of `region_size` chunks per side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk at the minimum corner of this region
    pub fn min_chunk(self, region_size: usize) -> ChunkPos {
        let size = region_size as i32;
        ChunkPos::new(self.x * size, self.z * size)
    }
}

/// Identifier of a world dimension (0 = overworld)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionId(pub i32);

impl DimensionId {
    pub const OVERWORLD: DimensionId = DimensionId(0);

    /// Save folder of this dimension relative to the world folder
    ///
    /// The overworld stores directly under `data`, other dimensions under `DIM<n>/data`.
    pub fn folder(self) -> std::path::PathBuf {
        if self == Self::OVERWORLD {
            std::path::PathBuf::from("data")
        } else {
            std::path::PathBuf::from(format!("DIM{}", self.0)).join("data")
        }
    }
}

impl std::fmt::Display for DimensionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DIM{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_region_of_positive_chunk() {
        assert_eq!(ChunkPos::new(0, 0).region(5), RegionPos::new(0, 0));
        assert_eq!(ChunkPos::new(4, 9).region(5), RegionPos::new(0, 1));
        assert_eq!(ChunkPos::new(10, 14).region(5), RegionPos::new(2, 2));
    }

    #[test]
    fn test_region_of_negative_chunk_floors() {
        assert_eq!(ChunkPos::new(-1, -1).region(5), RegionPos::new(-1, -1));
        assert_eq!(ChunkPos::new(-5, -6).region(5), RegionPos::new(-1, -2));
        assert_eq!(ChunkPos::new(-10, 3).region(5), RegionPos::new(-2, 0));
    }

    #[test]
    fn test_region_min_chunk() {
        assert_eq!(RegionPos::new(-1, 2).min_chunk(5), ChunkPos::new(-5, 10));
    }

    #[test]
    fn test_dimension_folder() {
        assert_eq!(DimensionId::OVERWORLD.folder(), PathBuf::from("data"));
        assert_eq!(DimensionId(-1).folder(), PathBuf::from("DIM-1").join("data"));
    }
}
