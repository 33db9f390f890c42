//! Raw column input handed over by the host world

use crate::core::{ChunkPos, IVec3};
use crate::voxel::section::{Section, SECTION_SIZE};
use crate::voxel::voxel::Voxel;

/// Width of a chunk footprint in voxels
pub const CHUNK_WIDTH: usize = SECTION_SIZE;

/// Resolves the color a voxel shows at a world position.
///
/// Returns a packed 24-bit RGB value, or 0 when the voxel has no visible
/// color (air, invisible blocks).
pub trait ColorSource: Send + Sync {
    fn face_color(&self, voxel: Voxel, pos: IVec3) -> u32;
}

/// The live host world LOD generation reads from.
pub trait HostWorld: ColorSource {
    /// Identity of the currently loaded world, `None` once it has been unloaded
    fn world_id(&self) -> Option<String>;
}

/// Full-height voxel column for one chunk footprint
///
/// A stack of sections from the bottom of the world up; absent sections
/// hold no blocks.
#[derive(Debug, Clone, Default)]
pub struct ColumnVolume {
    pub pos: ChunkPos,
    pub sections: Vec<Option<Section>>,
}

impl ColumnVolume {
    pub fn new(pos: ChunkPos, sections: Vec<Option<Section>>) -> Self {
        Self { pos, sections }
    }

    /// Column of `section_count` absent sections
    pub fn empty(pos: ChunkPos, section_count: usize) -> Self {
        Self {
            pos,
            sections: vec![None; section_count],
        }
    }

    /// Total height in voxels
    pub fn height(&self) -> usize {
        self.sections.len() * SECTION_SIZE
    }

    /// Whether any present section holds a non-air voxel
    pub fn has_block_data(&self) -> bool {
        self.sections.iter().flatten().any(|s| !s.is_empty())
    }

    /// Voxel at column-local coordinates (`y` counts from the bottom of the world)
    pub fn get(&self, x: usize, y: usize, z: usize) -> Voxel {
        match self.sections.get(y / SECTION_SIZE) {
            Some(Some(section)) => section.get(x, y % SECTION_SIZE, z),
            _ => Voxel::AIR,
        }
    }

    /// Set a voxel, materializing the section if needed
    pub fn set(&mut self, x: usize, y: usize, z: usize, voxel: Voxel) {
        let index = y / SECTION_SIZE;
        if index >= self.sections.len() {
            self.sections.resize(index + 1, None);
        }
        self.sections[index]
            .get_or_insert_with(Section::new)
            .set(x, y % SECTION_SIZE, z, voxel);
    }

    /// World position of a column-local voxel
    pub fn world_pos(&self, x: usize, y: usize, z: usize) -> IVec3 {
        IVec3::new(
            self.pos.x * CHUNK_WIDTH as i32 + x as i32,
            y as i32,
            self.pos.z * CHUNK_WIDTH as i32 + z as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_column_has_no_data() {
        let column = ColumnVolume::empty(ChunkPos::new(0, 0), 16);
        assert!(!column.has_block_data());
        assert_eq!(column.height(), 256);
        assert_eq!(column.get(0, 100, 0), Voxel::AIR);
    }

    #[test]
    fn test_present_but_empty_section_has_no_data() {
        let column = ColumnVolume::new(ChunkPos::new(0, 0), vec![Some(Section::new()), None]);
        assert!(!column.has_block_data());
    }

    #[test]
    fn test_set_materializes_section() {
        let mut column = ColumnVolume::empty(ChunkPos::new(0, 0), 4);
        column.set(1, 37, 2, Voxel::solid(9));
        assert!(column.has_block_data());
        assert!(column.sections[2].is_some());
        assert!(column.sections[0].is_none());
        assert_eq!(column.get(1, 37, 2), Voxel::solid(9));
    }

    #[test]
    fn test_world_pos() {
        let column = ColumnVolume::empty(ChunkPos::new(-2, 3), 1);
        assert_eq!(column.world_pos(1, 5, 15), IVec3::new(-31, 5, 63));
    }
}
