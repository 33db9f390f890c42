//! LOD records and the column → record builder

pub mod record;
pub mod column;
pub mod builder;

pub use record::{LodRecord, LodColor, Quadrant, Face, NO_HEIGHT, DATA_DELIMITER, DATA_FIELD_COUNT, TRANSPARENT_CHANNEL};
pub use column::{ColumnVolume, ColorSource, HostWorld, CHUNK_WIDTH};
pub use builder::{LodBuilder, ColorStyle, DEFAULT_DENSITY_THRESHOLD, MAX_COLUMN_HEIGHT};
