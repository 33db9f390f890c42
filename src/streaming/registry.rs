//! Per-world collection of dimension caches

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::core::DimensionId;
use crate::streaming::config::LodConfig;
use crate::streaming::dimension::DimensionCache;
use crate::streaming::disk_io::RegionStore;

/// A dimension cache shared between the render thread, generation workers
/// and the region writer
pub type SharedDimension = Arc<RwLock<DimensionCache>>;

/// Turn a world identity into a single safe path component
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`; names that would be
/// interpreted as `.`/`..` or are empty are prefixed.
pub fn sanitize_world_id(world_id: &str) -> String {
    let cleaned: String = world_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// Dimensions of the currently loaded world
#[derive(Debug)]
pub struct WorldRegistry {
    world_id: String,
    dimensions: HashMap<DimensionId, SharedDimension>,
    region_size: usize,
    window_width: usize,
    /// `<save_root>/<sanitized world id>`, `None` keeps everything in memory
    world_dir: Option<PathBuf>,
}

impl WorldRegistry {
    pub fn new(world_id: impl Into<String>, config: &LodConfig) -> Self {
        let world_id = world_id.into();
        let world_dir = config
            .save_root
            .as_ref()
            .map(|root| root.join(sanitize_world_id(&world_id)));

        Self {
            world_id,
            dimensions: HashMap::new(),
            region_size: config.region_size,
            window_width: config.window_width,
            world_dir,
        }
    }

    pub fn world_id(&self) -> &str {
        &self.world_id
    }

    pub fn world_dir(&self) -> Option<&Path> {
        self.world_dir.as_deref()
    }

    /// Window width new dimensions are created with
    pub fn window_width(&self) -> usize {
        self.window_width
    }

    pub fn set_window_width(&mut self, width: usize) {
        self.window_width = width;
    }

    /// Get an existing dimension
    pub fn dimension(&self, id: DimensionId) -> Option<SharedDimension> {
        self.dimensions.get(&id).cloned()
    }

    /// Get a dimension, creating an empty cache backed by its region folder
    pub fn dimension_or_create(&mut self, id: DimensionId) -> SharedDimension {
        if let Some(existing) = self.dimensions.get(&id) {
            return existing.clone();
        }

        let store = self
            .world_dir
            .as_ref()
            .map(|dir| RegionStore::new(dir.join(id.folder()), self.region_size));
        log::debug!(
            "Creating {} cache for world '{}' (store: {:?})",
            id, self.world_id, store.as_ref().map(RegionStore::dir)
        );

        let cache = Arc::new(RwLock::new(DimensionCache::new(id, self.region_size, self.window_width, store)));
        self.dimensions.insert(id, cache.clone());
        cache
    }

    /// All dimensions, in no particular order
    pub fn dimensions(&self) -> impl Iterator<Item = (DimensionId, &SharedDimension)> {
        self.dimensions.iter().map(|(id, dim)| (*id, dim))
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }
}
