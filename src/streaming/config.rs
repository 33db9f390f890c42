//! Configuration for the LOD cache.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::lod::builder::{ColorStyle, LodBuilder, DEFAULT_DENSITY_THRESHOLD};

/// Chunks per region side
pub const DEFAULT_REGION_SIZE: usize = 5;

/// Regions per side of a dimension's sliding window
pub const DEFAULT_WINDOW_WIDTH: usize = 32;

/// Smallest window the render-distance mapping produces
pub const MIN_WINDOW_WIDTH: usize = 4;

/// How many chunks of LOD terrain are kept per chunk of host render distance
pub const VIEW_DISTANCE_MULTIPLIER: usize = 16;

/// Configuration for generation, caching and persistence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Chunks per region side
    pub region_size: usize,
    /// Regions per side of each dimension window
    pub window_width: usize,
    /// Opaque voxels per quadrant layer needed for an LOD point
    pub density_threshold: usize,
    /// Concurrent generation tasks
    pub generation_workers: usize,
    /// Side face coloring
    pub color_style: ColorStyle,
    /// Root folder for region files; `None` keeps everything in memory
    pub save_root: Option<PathBuf>,
    /// Seconds between automatic saves of dirty regions (0 disables)
    pub save_interval_secs: u64,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            region_size: DEFAULT_REGION_SIZE,
            window_width: DEFAULT_WINDOW_WIDTH,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            generation_workers: 1,
            color_style: ColorStyle::Top,
            save_root: None,
            save_interval_secs: 30,
        }
    }
}

impl LodConfig {
    /// Config persisting under `save_root`
    pub fn with_save_root(save_root: impl Into<PathBuf>) -> Self {
        Self {
            save_root: Some(save_root.into()),
            ..Self::default()
        }
    }

    /// Reject values the cache cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.region_size == 0 {
            return Err(Error::InvalidInput("region_size must be at least 1".into()));
        }
        if self.window_width == 0 {
            return Err(Error::InvalidInput("window_width must be at least 1".into()));
        }
        if self.generation_workers == 0 {
            return Err(Error::InvalidInput("generation_workers must be at least 1".into()));
        }
        Ok(())
    }

    /// Builder configured from this config
    pub fn builder(&self) -> LodBuilder {
        LodBuilder::new(self.density_threshold, self.color_style)
    }

    /// Window width (in regions) covering the host's render distance (in chunks)
    pub fn window_width_for_render_distance(&self, render_distance_chunks: usize) -> usize {
        let span = render_distance_chunks * VIEW_DISTANCE_MULTIPLIER * 2;
        (span / self.region_size.max(1)).max(MIN_WINDOW_WIDTH)
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from file (sync); missing fields take their defaults
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LodConfig::default();
        assert_eq!(config.region_size, 5);
        assert_eq!(config.density_threshold, 16);
        assert_eq!(config.generation_workers, 1);
        assert_eq!(config.color_style, ColorStyle::Top);
        assert!(config.save_root.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let config = LodConfig { region_size: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));

        let config = LodConfig { window_width: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = LodConfig { generation_workers: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_width_for_render_distance() {
        let config = LodConfig::default();
        assert_eq!(config.window_width_for_render_distance(0), MIN_WINDOW_WIDTH);
        assert_eq!(config.window_width_for_render_distance(1), 6);
        assert_eq!(config.window_width_for_render_distance(8), 51);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("config").join("terralod.json");

        let config = LodConfig {
            window_width: 12,
            color_style: ColorStyle::IndividualSides,
            save_root: Some(PathBuf::from("/tmp/lods")),
            ..Default::default()
        };
        config.save_sync(&path).expect("save failed");

        let loaded = LodConfig::load_sync(&path).expect("load failed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "region_size": 8, "color_style": "individual_sides" }"#).unwrap();

        let loaded = LodConfig::load_sync(&path).expect("load failed");
        assert_eq!(loaded.region_size, 8);
        assert_eq!(loaded.color_style, ColorStyle::IndividualSides);
        assert_eq!(loaded.window_width, DEFAULT_WINDOW_WIDTH);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(LodConfig::load_sync(&path), Err(Error::Config(_))));
    }
}
