//! Region caching, persistence and background generation

pub mod config;
pub mod region;
pub mod disk_io;
pub mod dimension;
pub mod registry;
pub mod writer;
pub mod context;
pub mod pipeline;

pub use config::{LodConfig, DEFAULT_REGION_SIZE, DEFAULT_WINDOW_WIDTH, MIN_WINDOW_WIDTH};
pub use region::RegionGrid;
pub use disk_io::{
    RegionStore, DecodedRegion,
    encode_region, decode_region, parse_version_header, region_path,
    LOD_SAVE_FILE_VERSION, LOD_FILE_VERSION_PREFIX,
};
pub use dimension::DimensionCache;
pub use registry::{WorldRegistry, SharedDimension, sanitize_world_id};
pub use writer::{RegionWriter, SaveHandle, SaveReport, wait_all};
pub use context::LodContext;
pub use pipeline::{GenerationPipeline, GenerationResult, TaskOutcome};
