//! Voxel data handed over by the host

pub mod voxel;
pub mod section;

pub use voxel::{Voxel, flags};
pub use section::{Section, SECTION_SIZE, SECTION_VOXELS};
