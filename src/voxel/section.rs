//! Fixed-size cubic sub-volume of a chunk column

use crate::voxel::voxel::Voxel;

/// Edge length of a section in voxels
pub const SECTION_SIZE: usize = 16;

/// Voxels per section
pub const SECTION_VOXELS: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// A 16x16x16 block of voxels, one vertical slice of a chunk column
///
/// Indexed `x + z * 16 + y * 256`, so one horizontal layer is contiguous.
#[derive(Clone, PartialEq, Eq)]
pub struct Section {
    voxels: Box<[Voxel]>,
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("non_air", &self.non_air_count())
            .finish()
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}

impl Section {
    /// Create an all-air section
    pub fn new() -> Self {
        Self {
            voxels: vec![Voxel::AIR; SECTION_VOXELS].into_boxed_slice(),
        }
    }

    /// Create a section with every voxel set to `voxel`
    pub fn filled(voxel: Voxel) -> Self {
        Self {
            voxels: vec![voxel; SECTION_VOXELS].into_boxed_slice(),
        }
    }

    #[inline]
    fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < SECTION_SIZE && y < SECTION_SIZE && z < SECTION_SIZE);
        x + z * SECTION_SIZE + y * SECTION_SIZE * SECTION_SIZE
    }

    /// Voxel at local coordinates
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Voxel {
        self.voxels[Self::index(x, y, z)]
    }

    /// Set voxel at local coordinates
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, voxel: Voxel) {
        self.voxels[Self::index(x, y, z)] = voxel;
    }

    /// Fill one horizontal layer
    pub fn fill_layer(&mut self, y: usize, voxel: Voxel) {
        let start = Self::index(0, y, 0);
        self.voxels[start..start + SECTION_SIZE * SECTION_SIZE].fill(voxel);
    }

    /// Number of non-air voxels
    pub fn non_air_count(&self) -> usize {
        self.voxels.iter().filter(|v| !v.is_air()).count()
    }

    /// True if the section holds only air
    pub fn is_empty(&self) -> bool {
        self.voxels.iter().all(|v| v.is_air())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let section = Section::new();
        assert!(section.is_empty());
        assert_eq!(section.non_air_count(), 0);
    }

    #[test]
    fn test_set_get() {
        let mut section = Section::new();
        section.set(3, 15, 7, Voxel::solid(5));
        assert_eq!(section.get(3, 15, 7), Voxel::solid(5));
        assert_eq!(section.get(7, 15, 3), Voxel::AIR);
        assert!(!section.is_empty());
    }

    #[test]
    fn test_fill_layer() {
        let mut section = Section::new();
        section.fill_layer(2, Voxel::solid(1));
        assert_eq!(section.non_air_count(), SECTION_SIZE * SECTION_SIZE);
        assert!(section.get(0, 2, 0).is_opaque_cube());
        assert!(section.get(15, 2, 15).is_opaque_cube());
        assert!(section.get(0, 1, 0).is_air());
        assert!(section.get(0, 3, 0).is_air());
    }

    #[test]
    fn test_filled() {
        let section = Section::filled(Voxel::solid(3));
        assert_eq!(section.non_air_count(), SECTION_VOXELS);
    }
}
