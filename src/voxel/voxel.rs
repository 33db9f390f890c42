//! Voxel data type

/// Voxel flags
pub mod flags {
    /// Light passes through (glass, leaves, water)
    pub const TRANSPARENT: u8 = 1 << 0;
    /// Occupies less than a full cube (slabs, flowers, torches)
    pub const PARTIAL: u8 = 1 << 1;
}

/// Single voxel as seen by the LOD builder
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Voxel {
    /// Host block identifier, 0 is air
    pub block_id: u16,
    /// Flags (transparent, partial, ...)
    pub flags: u8,
}

impl Voxel {
    /// Empty/air voxel
    pub const AIR: Voxel = Voxel {
        block_id: 0,
        flags: 0,
    };

    /// Full opaque cube of the given block
    pub fn solid(block_id: u16) -> Self {
        Self { block_id, flags: 0 }
    }

    /// Create a copy of this voxel with the given flags value
    pub fn with_flags(self, flags: u8) -> Self {
        Self { flags, ..self }
    }

    /// Check if voxel is air
    pub fn is_air(&self) -> bool {
        self.block_id == 0
    }

    /// Check if voxel is transparent
    pub fn is_transparent(&self) -> bool {
        self.flags & flags::TRANSPARENT != 0
    }

    /// Non-air, non-transparent and filling its whole cell
    pub fn is_opaque_cube(&self) -> bool {
        !self.is_air() && self.flags & (flags::TRANSPARENT | flags::PARTIAL) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air() {
        assert!(Voxel::AIR.is_air());
        assert!(Voxel::default().is_air());
        assert!(!Voxel::AIR.is_opaque_cube());
    }

    #[test]
    fn test_solid_is_opaque_cube() {
        assert!(Voxel::solid(1).is_opaque_cube());
    }

    #[test]
    fn test_flags() {
        let glass = Voxel::solid(20).with_flags(flags::TRANSPARENT);
        assert!(glass.is_transparent());
        assert!(!glass.is_opaque_cube());

        let slab = Voxel::solid(44).with_flags(flags::PARTIAL);
        assert!(!slab.is_transparent());
        assert!(!slab.is_opaque_cube());
    }
}
