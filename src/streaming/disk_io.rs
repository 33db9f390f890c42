//! Region file format and disk I/O
//!
//! One text file per region:
//!
//! ```text
//! lod_save_file_version 1
//! <x>,<z>,<top x4>,<bottom x4>,<r,g,b x6>,
//! ...
//! ```
//!
//! Files written by an older format version are deleted on load so the
//! region regenerates; files from a newer version are left alone.

use std::io;
use std::path::{Path, PathBuf};

use crate::core::{RegionPos, Result};
use crate::lod::record::LodRecord;
use crate::streaming::region::RegionGrid;

/// Format version written by this build
pub const LOD_SAVE_FILE_VERSION: i32 = 1;

/// Text preceding the version number on the header line
pub const LOD_FILE_VERSION_PREFIX: &str = "lod_save_file_version";

const FILE_NAME_PREFIX: &str = "lod";
const FILE_EXTENSION: &str = "txt";

/// Get the file path for a region
pub fn region_path(dir: &Path, pos: RegionPos) -> PathBuf {
    // Format: dir/lod.{x}.{z}.txt
    dir.join(format!("{FILE_NAME_PREFIX}.{}.{}.{FILE_EXTENSION}", pos.x, pos.z))
}

/// Version stored in a header line, -1 if it has none
pub fn parse_version_header(line: &str) -> i32 {
    line.split_once(' ')
        .and_then(|(_, version)| version.trim().parse().ok())
        .unwrap_or(-1)
}

/// Serialize a region: header line plus one line per real record
pub fn encode_region(region: &RegionGrid) -> String {
    let mut out = format!("{LOD_FILE_VERSION_PREFIX} {LOD_SAVE_FILE_VERSION}\n");
    for record in region.all_records() {
        out.push_str(&record.to_data_line());
        out.push('\n');
    }
    out
}

/// Result of decoding a region file's contents
#[derive(Debug)]
pub enum DecodedRegion {
    /// Readable file; `skipped` counts malformed lines
    Region { region: RegionGrid, skipped: usize },
    /// Header missing or written by an older version
    Outdated(i32),
    /// Written by a newer version
    Newer(i32),
    /// No content at all
    Empty,
}

/// Decode region file contents
///
/// Malformed record lines, and records outside the region, are skipped
/// individually. The returned region is clean.
pub fn decode_region(pos: RegionPos, region_size: usize, contents: &str) -> DecodedRegion {
    let mut lines = contents.lines();

    let header = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return DecodedRegion::Empty,
    };

    let version = parse_version_header(header);
    if version < LOD_SAVE_FILE_VERSION {
        return DecodedRegion::Outdated(version);
    }
    if version > LOD_SAVE_FILE_VERSION {
        return DecodedRegion::Newer(version);
    }

    let mut region = RegionGrid::new(pos, region_size);
    let mut skipped = 0;

    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let stored = line
            .parse::<LodRecord>()
            .and_then(|record| region.put(record));
        if let Err(e) = stored {
            log::warn!("Skipping line {} of region ({}, {}): {}", line_no + 2, pos.x, pos.z, e);
            skipped += 1;
        }
    }

    region.clear_dirty();
    DecodedRegion::Region { region, skipped }
}

/// Region files of one dimension
#[derive(Debug, Clone)]
pub struct RegionStore {
    dir: PathBuf,
    region_size: usize,
}

impl RegionStore {
    /// Create a store over `dir`; nothing is touched on disk until a save
    pub fn new(dir: impl Into<PathBuf>, region_size: usize) -> Self {
        Self {
            dir: dir.into(),
            region_size,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn region_size(&self) -> usize {
        self.region_size
    }

    pub fn region_path(&self, pos: RegionPos) -> PathBuf {
        region_path(&self.dir, pos)
    }

    /// Check if a region file exists
    pub fn exists(&self, pos: RegionPos) -> bool {
        self.region_path(pos).exists()
    }

    /// Load a region from disk (if it exists and is readable)
    ///
    /// Outdated files are deleted, newer files are ignored; both return `None`.
    pub fn load(&self, pos: RegionPos) -> Result<Option<RegionGrid>> {
        let path = self.region_path(pos);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match decode_region(pos, self.region_size, &contents) {
            DecodedRegion::Region { region, skipped } => {
                if skipped > 0 {
                    log::warn!("Region {:?}: skipped {} malformed lines", path, skipped);
                }
                Ok(Some(region))
            }
            DecodedRegion::Outdated(version) => {
                log::info!(
                    "Deleting region file {:?} with outdated version {} (current {})",
                    path, version, LOD_SAVE_FILE_VERSION
                );
                std::fs::remove_file(&path)?;
                Ok(None)
            }
            DecodedRegion::Newer(version) => {
                log::info!(
                    "Ignoring region file {:?} from newer version {} (current {})",
                    path, version, LOD_SAVE_FILE_VERSION
                );
                Ok(None)
            }
            DecodedRegion::Empty => Ok(None),
        }
    }

    /// Save a region to disk (sync)
    pub fn save_sync(&self, region: &RegionGrid) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.region_path(region.pos()), encode_region(region))?;
        Ok(())
    }

    /// Write already-encoded region contents (async)
    pub async fn write_encoded(&self, pos: RegionPos, contents: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.region_path(pos), contents).await?;
        Ok(())
    }

    /// Delete a region file
    pub fn delete(&self, pos: RegionPos) -> Result<()> {
        match std::fs::remove_file(self.region_path(pos)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
