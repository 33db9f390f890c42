//! Fixed-size square grid of LOD records
//!
//! A region is the caching and persistence unit: it is loaded, saved and
//! evicted as a whole, and carries one dirty flag for all of its records.

use crate::core::{ChunkPos, Error, RegionPos, Result};
use crate::lod::record::LodRecord;

/// `size × size` LOD records covering one region of chunk columns
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGrid {
    pos: RegionPos,
    size: usize,
    /// Row-major by local x, then local z
    records: Vec<Option<LodRecord>>,
    dirty: bool,
}

impl RegionGrid {
    /// Create an empty, clean region
    ///
    /// # Arguments
    /// * `pos` - Region coordinate
    /// * `size` - Chunks per region side
    pub fn new(pos: RegionPos, size: usize) -> Self {
        Self {
            pos,
            size,
            records: vec![None; size * size],
            dirty: false,
        }
    }

    pub fn pos(&self) -> RegionPos {
        self.pos
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the record at region-local coordinates
    ///
    /// # Returns
    /// The record if the slot is filled, `Err(OutOfRange)` if the
    /// coordinates fall outside the region
    pub fn get(&self, local_x: usize, local_z: usize) -> Result<Option<&LodRecord>> {
        let index = self.local_index(local_x, local_z)?;
        Ok(self.records[index].as_ref())
    }

    /// Get the record for a world chunk inside this region
    pub fn get_chunk(&self, pos: ChunkPos) -> Result<Option<&LodRecord>> {
        let (local_x, local_z) = self.to_local(pos)?;
        self.get(local_x, local_z)
    }

    /// Store a record at the slot given by its own chunk coordinate
    ///
    /// Overwrites any existing record and marks the region dirty.
    pub fn put(&mut self, record: LodRecord) -> Result<()> {
        let (local_x, local_z) = self.to_local(record.pos)?;
        let index = local_x * self.size + local_z;
        self.records[index] = Some(record);
        self.dirty = true;
        Ok(())
    }

    /// Iterate over stored records, skipping empty slots and placeholders
    pub fn all_records(&self) -> impl Iterator<Item = &LodRecord> {
        self.records
            .iter()
            .flatten()
            .filter(|record| !record.is_placeholder())
    }

    /// Whether the chunk lies inside this region
    pub fn contains_chunk(&self, pos: ChunkPos) -> bool {
        self.to_local(pos).is_ok()
    }

    /// Number of filled slots
    pub fn len(&self) -> usize {
        self.records.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.iter().all(Option::is_none)
    }

    /// Check if the region has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Translate a world chunk coordinate into region-local indices
    fn to_local(&self, pos: ChunkPos) -> Result<(usize, usize)> {
        let min = self.pos.min_chunk(self.size);
        let size = self.size as i32;
        let dx = pos.x - min.x;
        let dz = pos.z - min.z;
        if (0..size).contains(&dx) && (0..size).contains(&dz) {
            Ok((dx as usize, dz as usize))
        } else {
            Err(self.out_of_range(pos.x, pos.z))
        }
    }

    fn local_index(&self, local_x: usize, local_z: usize) -> Result<usize> {
        if local_x < self.size && local_z < self.size {
            Ok(local_x * self.size + local_z)
        } else {
            let min = self.pos.min_chunk(self.size);
            Err(self.out_of_range(
                min.x.saturating_add(local_x as i32),
                min.z.saturating_add(local_z as i32),
            ))
        }
    }

    fn out_of_range(&self, x: i32, z: i32) -> Error {
        Error::OutOfRange {
            x,
            z,
            region_x: self.pos.x,
            region_z: self.pos.z,
        }
    }
}
