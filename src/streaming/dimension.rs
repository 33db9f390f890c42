//! Sliding window of regions for one dimension
//!
//! The window is a `width × width` square of region slots centered on the
//! viewpoint's region. Slot `(i, j)` holds region
//! `(center.x - width / 2 + i, center.z - width / 2 + j)`. Moving the
//! viewpoint shifts the window; regions that fall off the edge are evicted
//! and handed back to the caller so dirty ones can be flushed. Until that
//! flush lands, a copy stays in the cache's unflushed set and is reused in
//! preference to the (older) file on disk.

use std::collections::HashMap;

use crate::core::{ChunkPos, DimensionId, RegionPos, Result};
use crate::lod::record::LodRecord;
use crate::streaming::disk_io::RegionStore;
use crate::streaming::region::RegionGrid;

/// LOD cache for one dimension
#[derive(Debug)]
pub struct DimensionCache {
    dimension: DimensionId,
    region_size: usize,
    width: usize,
    center: RegionPos,
    /// Indexed `i * width + j`
    regions: Vec<Option<RegionGrid>>,
    /// Region files backing this dimension, if persisted
    store: Option<RegionStore>,
    /// Dirty regions evicted from the window whose write has not landed
    unflushed: HashMap<RegionPos, RegionGrid>,
}

impl DimensionCache {
    /// Create an empty window centered on region (0, 0)
    ///
    /// # Arguments
    /// * `dimension` - Dimension identifier
    /// * `region_size` - Chunks per region side
    /// * `width` - Regions per window side
    /// * `store` - Region files to fill cache misses from, if any
    pub fn new(dimension: DimensionId, region_size: usize, width: usize, store: Option<RegionStore>) -> Self {
        Self {
            dimension,
            region_size,
            width,
            center: RegionPos::default(),
            regions: std::iter::repeat_with(|| None).take(width * width).collect(),
            store,
            unflushed: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> DimensionId {
        self.dimension
    }

    pub fn region_size(&self) -> usize {
        self.region_size
    }

    /// Regions per window side
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn center(&self) -> RegionPos {
        self.center
    }

    pub fn store(&self) -> Option<&RegionStore> {
        self.store.as_ref()
    }

    /// Get the LOD record for a world chunk
    ///
    /// # Returns
    /// `None` if the owning region is outside the window, not loaded, or
    /// has no record for this chunk
    pub fn record_at(&self, chunk_x: i32, chunk_z: i32) -> Option<&LodRecord> {
        let pos = ChunkPos::new(chunk_x, chunk_z);
        let region = self.region(pos.region(self.region_size))?;
        region.get_chunk(pos).ok().flatten()
    }

    /// Get a loaded region
    pub fn region(&self, pos: RegionPos) -> Option<&RegionGrid> {
        let index = self.slot_index(pos)?;
        self.regions[index].as_ref()
    }

    /// Insert a record, loading or creating its region on demand
    ///
    /// # Returns
    /// `Ok(false)` if the record's region lies outside the window (the
    /// record is dropped), `Ok(true)` once stored
    pub fn insert(&mut self, record: LodRecord) -> Result<bool> {
        let region_pos = record.pos.region(self.region_size);
        let Some(index) = self.slot_index(region_pos) else {
            return Ok(false);
        };

        let region = match self.regions[index].take() {
            Some(region) => region,
            None => self
                .fetch(region_pos)?
                .unwrap_or_else(|| RegionGrid::new(region_pos, self.region_size)),
        };
        self.regions[index].insert(region).put(record)?;
        Ok(true)
    }

    /// Store that must be read before `chunk` can be inserted
    ///
    /// `None` when the owning region is resident, unflushed, outside the
    /// window, or the dimension has no store. Lets callers read the file
    /// without holding the cache lock and hand the result to `install`.
    pub fn pending_load(&self, chunk: ChunkPos) -> Option<(RegionPos, RegionStore)> {
        let pos = chunk.region(self.region_size);
        let index = self.slot_index(pos)?;
        if self.regions[index].is_some() || self.unflushed.contains_key(&pos) {
            return None;
        }
        Some((pos, self.store.clone()?))
    }

    /// Place a region read from disk into its slot
    ///
    /// # Returns
    /// False, dropping `region`, if the slot is outside the window or the
    /// region became resident or unflushed in the meantime
    pub fn install(&mut self, region: RegionGrid) -> bool {
        let pos = region.pos();
        let Some(index) = self.slot_index(pos) else {
            return false;
        };
        if self.regions[index].is_some() || self.unflushed.contains_key(&pos) {
            return false;
        }
        self.regions[index] = Some(region);
        true
    }

    /// Load a region from the store into its slot if it is not resident
    ///
    /// # Returns
    /// True if the region is resident afterwards
    pub fn ensure_loaded(&mut self, pos: RegionPos) -> Result<bool> {
        let Some(index) = self.slot_index(pos) else {
            return Ok(false);
        };
        if self.regions[index].is_none() {
            self.regions[index] = self.fetch(pos)?;
        }
        Ok(self.regions[index].is_some())
    }

    /// Fill every empty slot whose region has a file on disk
    ///
    /// # Returns
    /// Number of regions loaded
    pub fn load_missing(&mut self) -> Result<usize> {
        let Some(store) = self.store.clone() else {
            return Ok(0);
        };

        let mut loaded = 0;
        for i in 0..self.width {
            for j in 0..self.width {
                let index = i * self.width + j;
                if self.regions[index].is_some() {
                    continue;
                }
                let pos = self.slot_region(i, j);
                let fetched = match self.unflushed.remove(&pos) {
                    Some(region) => Some(region),
                    None => store.load(pos)?,
                };
                if let Some(region) = fetched {
                    self.regions[index] = Some(region);
                    loaded += 1;
                }
            }
        }
        Ok(loaded)
    }

    /// Whether a region coordinate falls inside the current window
    pub fn region_in_range(&self, pos: RegionPos) -> bool {
        self.slot_index(pos).is_some()
    }

    /// Move the window so it is centered on `new_center`
    ///
    /// Regions that remain inside keep their records; the others are
    /// evicted. Newly exposed slots stay empty until the next insert.
    ///
    /// # Returns
    /// Evicted regions that still have unsaved changes
    pub fn recenter(&mut self, new_center: RegionPos) -> Vec<RegionGrid> {
        if new_center == self.center {
            return Vec::new();
        }
        self.center = new_center;
        self.rebuild(self.width)
    }

    /// Move the window by a relative number of regions
    pub fn shift(&mut self, dx: i32, dz: i32) -> Vec<RegionGrid> {
        self.recenter(RegionPos::new(self.center.x + dx, self.center.z + dz))
    }

    /// Recenter on the region holding the viewpoint, if it changed
    pub fn update_viewpoint(&mut self, chunk_x: i32, chunk_z: i32) -> Vec<RegionGrid> {
        let region = ChunkPos::new(chunk_x, chunk_z).region(self.region_size);
        self.recenter(region)
    }

    /// Rebuild the window with a new width around the same center
    ///
    /// # Returns
    /// Evicted regions that still have unsaved changes
    pub fn resize(&mut self, new_width: usize) -> Vec<RegionGrid> {
        if new_width == self.width {
            return Vec::new();
        }
        self.rebuild(new_width)
    }

    /// Mutable access to every loaded region with unsaved changes
    pub fn dirty_regions_mut(&mut self) -> impl Iterator<Item = &mut RegionGrid> {
        self.regions.iter_mut().flatten().filter(|r| r.is_dirty())
    }

    /// Mutable access to a loaded region
    pub fn region_mut(&mut self, pos: RegionPos) -> Option<&mut RegionGrid> {
        let index = self.slot_index(pos)?;
        self.regions[index].as_mut()
    }

    /// All loaded regions
    pub fn regions(&self) -> impl Iterator<Item = &RegionGrid> {
        self.regions.iter().flatten()
    }

    /// Number of loaded regions
    pub fn loaded_count(&self) -> usize {
        self.regions.iter().flatten().count()
    }

    /// Take every loaded region out of the window, leaving it empty
    pub fn drain(&mut self) -> Vec<RegionGrid> {
        self.regions.iter_mut().filter_map(Option::take).collect()
    }

    /// Evicted regions still waiting for their write
    pub fn unflushed(&self) -> impl Iterator<Item = &RegionGrid> {
        self.unflushed.values()
    }

    pub fn is_unflushed(&self, pos: RegionPos) -> bool {
        self.unflushed.contains_key(&pos)
    }

    /// Record the outcome of writing an evicted region
    ///
    /// A successful write forgets the unflushed copy unless a newer eviction
    /// replaced it. A failed one keeps the changes around: the resident
    /// region is marked dirty again, otherwise the copy returns to the
    /// unflushed set.
    pub fn finish_flush(&mut self, region: RegionGrid, written: bool) {
        let pos = region.pos();
        if written {
            if self.unflushed.get(&pos) == Some(&region) {
                self.unflushed.remove(&pos);
            }
            return;
        }

        if let Some(resident) = self.region_mut(pos) {
            resident.mark_dirty();
        } else {
            self.unflushed.entry(pos).or_insert(region);
        }
    }

    /// Unflushed copy first, then the store
    fn fetch(&mut self, pos: RegionPos) -> Result<Option<RegionGrid>> {
        if let Some(region) = self.unflushed.remove(&pos) {
            return Ok(Some(region));
        }
        match &self.store {
            Some(store) => store.load(pos),
            None => Ok(None),
        }
    }

    /// Re-slot every region for the current center and the given width
    fn rebuild(&mut self, width: usize) -> Vec<RegionGrid> {
        let old = std::mem::take(&mut self.regions);
        self.width = width;
        self.regions = std::iter::repeat_with(|| None).take(width * width).collect();

        let mut evicted = Vec::new();
        for region in old.into_iter().flatten() {
            match self.slot_index(region.pos()) {
                Some(index) => self.regions[index] = Some(region),
                None if region.is_dirty() => {
                    if self.store.is_some() {
                        self.unflushed.insert(region.pos(), region.clone());
                    }
                    evicted.push(region);
                }
                None => {}
            }
        }

        if !evicted.is_empty() {
            log::debug!(
                "{}: {} dirty regions left the window centered at ({}, {})",
                self.dimension, evicted.len(), self.center.x, self.center.z
            );
        }
        evicted
    }

    fn slot_region(&self, i: usize, j: usize) -> RegionPos {
        let half = (self.width / 2) as i32;
        RegionPos::new(self.center.x - half + i as i32, self.center.z - half + j as i32)
    }

    /// Window slot for a region coordinate, `None` outside the window
    fn slot_index(&self, pos: RegionPos) -> Option<usize> {
        let half = (self.width / 2) as i32;
        let i = pos.x - (self.center.x - half);
        let j = pos.z - (self.center.z - half);
        let width = self.width as i32;
        if (0..width).contains(&i) && (0..width).contains(&j) {
            Some(i as usize * self.width + j as usize)
        } else {
            None
        }
    }
}
