//! Owned entry point tying configuration, loaded world and writer together
//!
//! One `LodContext` replaces any process-wide registry: the host creates it,
//! shares it as `Arc<LodContext>` with the generation pipeline, and queries
//! it from the render thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::core::{DimensionId, Error, Result};
use crate::lod::record::LodRecord;
use crate::streaming::config::LodConfig;
use crate::streaming::dimension::DimensionCache;
use crate::streaming::region::RegionGrid;
use crate::streaming::registry::{SharedDimension, WorldRegistry};
use crate::streaming::writer::{RegionWriter, SaveHandle};

/// Shared LOD state for one host session
#[derive(Debug)]
pub struct LodContext {
    config: LodConfig,
    registry: RwLock<Option<WorldRegistry>>,
    writer: RegionWriter,
    redraw: AtomicBool,
    last_save: Mutex<Instant>,
}

impl LodContext {
    pub fn new(config: LodConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: RwLock::new(None),
            writer: RegionWriter::new()?,
            redraw: AtomicBool::new(false),
            last_save: Mutex::new(Instant::now()),
        })
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    pub fn writer(&self) -> &RegionWriter {
        &self.writer
    }

    /// Identity of the loaded world, if any
    pub fn world_id(&self) -> Option<String> {
        self.read_registry().as_ref().map(|r| r.world_id().to_string())
    }

    /// Make `world_id` the loaded world
    ///
    /// A different world already loaded is discarded whole; its dirty
    /// regions are queued for saving first.
    pub fn ensure_world(&self, world_id: &str) -> Vec<SaveHandle> {
        let mut registry = self.write_registry();
        if registry.as_ref().is_some_and(|r| r.world_id() == world_id) {
            return Vec::new();
        }

        let window_width = registry.as_ref().map(WorldRegistry::window_width);
        let handles = match registry.take() {
            Some(old) => {
                log::info!("World changed from '{}' to '{}', discarding LOD cache", old.world_id(), world_id);
                self.flush_registry(&old)
            }
            None => {
                log::info!("Loading LOD cache for world '{}'", world_id);
                Vec::new()
            }
        };

        let mut fresh = WorldRegistry::new(world_id, &self.config);
        if let Some(width) = window_width {
            fresh.set_window_width(width);
        }
        *registry = Some(fresh);
        self.request_redraw();
        handles
    }

    /// Unload the current world, queueing its dirty regions for saving
    pub fn close_world(&self) -> Vec<SaveHandle> {
        match self.write_registry().take() {
            Some(old) => {
                log::info!("Closing LOD cache for world '{}'", old.world_id());
                self.flush_registry(&old)
            }
            None => Vec::new(),
        }
    }

    /// Store a record for `world_id`
    ///
    /// Creates the registry when no world is loaded and the dimension
    /// cache on first use. A region file that has to be read first is read
    /// without holding the dimension lock, so readers are never stalled on
    /// disk.
    ///
    /// # Returns
    /// `Ok(false)` if the record fell outside the dimension window
    ///
    /// # Errors
    /// `Error::StaleContext` if another world is loaded
    pub fn insert(&self, world_id: &str, dimension: DimensionId, record: LodRecord) -> Result<bool> {
        let shared = {
            let mut registry = self.write_registry();
            let registry = registry.get_or_insert_with(|| WorldRegistry::new(world_id, &self.config));
            if registry.world_id() != world_id {
                return Err(Error::StaleContext(format!(
                    "record for world '{}' but '{}' is loaded",
                    world_id,
                    registry.world_id()
                )));
            }
            registry.dimension_or_create(dimension)
        };

        let pending = shared.read().unwrap_or_else(PoisonError::into_inner).pending_load(record.pos);
        let loaded = match pending {
            Some((pos, store)) => store.load(pos)?,
            None => None,
        };

        let mut cache = shared.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(region) = loaded {
            // The window may have moved while the file was read
            if !cache.install(region) {
                log::debug!("{}: discarding region read for chunk {:?}", cache.dimension(), record.pos);
            }
        }
        cache.insert(record)
    }

    /// Shared handle to a dimension of the loaded world
    pub fn dimension(&self, dimension: DimensionId) -> Option<SharedDimension> {
        self.read_registry().as_ref()?.dimension(dimension)
    }

    /// Copy of the record for a chunk, if cached
    pub fn record_at(&self, dimension: DimensionId, chunk_x: i32, chunk_z: i32) -> Option<LodRecord> {
        self.with_dimension(dimension, |cache| cache.record_at(chunk_x, chunk_z).copied())
            .flatten()
    }

    /// Run `f` with read access to a dimension cache
    pub fn with_dimension<R>(&self, dimension: DimensionId, f: impl FnOnce(&DimensionCache) -> R) -> Option<R> {
        let shared = self.dimension(dimension)?;
        let cache = shared.read().unwrap_or_else(PoisonError::into_inner);
        Some(f(&cache))
    }

    /// Recenter a dimension on the viewpoint chunk
    ///
    /// Dirty regions leaving the window are handed to the writer, so this
    /// never waits on disk.
    pub fn update_viewpoint(&self, dimension: DimensionId, chunk_x: i32, chunk_z: i32) -> Option<SaveHandle> {
        let shared = self.dimension(dimension)?;
        let mut cache = shared.write().unwrap_or_else(PoisonError::into_inner);
        let evicted = cache.update_viewpoint(chunk_x, chunk_z);
        self.flush_evicted(&shared, &cache, evicted)
    }

    /// Load every region of a dimension's window that has a file on disk
    ///
    /// Reads files while holding the dimension lock; call it off the
    /// render thread.
    pub fn load_window(&self, dimension: DimensionId) -> Result<usize> {
        let Some(shared) = self.dimension(dimension) else {
            return Ok(0);
        };
        let loaded = shared.write().unwrap_or_else(PoisonError::into_inner).load_missing()?;
        if loaded > 0 {
            self.request_redraw();
        }
        Ok(loaded)
    }

    /// Resize every dimension window to cover the host render distance
    ///
    /// # Arguments
    /// * `render_distance` - Host render distance in chunks
    pub fn set_render_distance(&self, render_distance: usize) -> Vec<SaveHandle> {
        let width = self.config.window_width_for_render_distance(render_distance);
        let mut registry = self.write_registry();
        let Some(registry) = registry.as_mut() else {
            return Vec::new();
        };
        if registry.window_width() == width {
            return Vec::new();
        }

        log::debug!("Render distance {} chunks, window width {} regions", render_distance, width);
        registry.set_window_width(width);

        let mut handles = Vec::new();
        for (_, shared) in registry.dimensions() {
            let mut cache = shared.write().unwrap_or_else(PoisonError::into_inner);
            let evicted = cache.resize(width);
            handles.extend(self.flush_evicted(shared, &cache, evicted));
        }
        handles
    }

    /// Queue a save of every dirty region of the loaded world
    pub fn save_all(&self) -> Vec<SaveHandle> {
        *self.last_save.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
        match self.read_registry().as_ref() {
            Some(registry) => self.flush_registry(registry),
            None => Vec::new(),
        }
    }

    /// Periodic housekeeping; saves once `save_interval_secs` have passed
    pub fn tick(&self) -> Vec<SaveHandle> {
        if self.config.save_interval_secs == 0 {
            return Vec::new();
        }
        let due = {
            let last = self.last_save.lock().unwrap_or_else(PoisonError::into_inner);
            last.elapsed() >= Duration::from_secs(self.config.save_interval_secs)
        };
        if due { self.save_all() } else { Vec::new() }
    }

    /// Ask the host to rebuild its LOD geometry next frame
    pub fn request_redraw(&self) {
        self.redraw.store(true, Ordering::Release);
    }

    /// Consume a pending redraw request
    pub fn take_redraw_request(&self) -> bool {
        self.redraw.swap(false, Ordering::AcqRel)
    }

    fn flush_registry(&self, registry: &WorldRegistry) -> Vec<SaveHandle> {
        registry
            .dimensions()
            .map(|(_, shared)| self.writer.save_dirty(shared.clone()))
            .collect()
    }

    fn flush_evicted(
        &self,
        shared: &SharedDimension,
        cache: &DimensionCache,
        evicted: Vec<RegionGrid>,
    ) -> Option<SaveHandle> {
        if evicted.is_empty() {
            return None;
        }
        let store = cache.store()?.clone();
        Some(self.writer.save_regions(shared.clone(), store, evicted))
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Option<WorldRegistry>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Option<WorldRegistry>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}
