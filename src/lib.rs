//! Terralod - region-cached LOD terrain summaries for voxel worlds

pub mod core;
pub mod voxel;
pub mod lod;
pub mod streaming;
