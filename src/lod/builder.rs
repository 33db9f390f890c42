//! Compresses a voxel column into an [`LodRecord`].
//!
//! Heights: each quadrant of the footprint is scanned for the highest (top)
//! and lowest (bottom) horizontal layer holding at least
//! `density_threshold` opaque cubes, so the LOD outline follows solid
//! ground rather than single protruding blocks.
//!
//! Colors: every face averages the first visible voxel found per line of
//! sight through the footprint.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::lod::column::{ColorSource, ColumnVolume, CHUNK_WIDTH};
use crate::lod::record::{Face, LodColor, LodRecord, Quadrant, NO_HEIGHT};
use crate::voxel::section::{Section, SECTION_SIZE};

/// Opaque voxels a layer needs inside one quadrant to count as an LOD point
/// (a quadrant layer holds 64)
pub const DEFAULT_DENSITY_THRESHOLD: usize = 16;

/// Tallest column whose layers all fit a record height
pub const MAX_COLUMN_HEIGHT: usize = i16::MAX as usize + 1;

/// How the four side faces are colored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorStyle {
    /// Sides reuse the top-down sample
    #[default]
    Top,
    /// Each side samples the first visible voxel looking inward from that side
    IndividualSides,
}

/// Running sum of decoded colors
#[derive(Debug, Default, Clone, Copy)]
struct ColorAccumulator {
    red: u32,
    green: u32,
    blue: u32,
    count: u32,
}

impl ColorAccumulator {
    fn add(&mut self, packed: u32) {
        let c = LodColor::from_packed(packed);
        self.red += c.r() as u32;
        self.green += c.g() as u32;
        self.blue += c.b() as u32;
        self.count += 1;
    }

    /// Integer average; with no samples the divisor is 1 and the result black
    fn finish(self) -> LodColor {
        let n = self.count.max(1);
        LodColor::rgb((self.red / n) as u8, (self.green / n) as u8, (self.blue / n) as u8)
    }
}

/// Builds LOD records from raw columns
#[derive(Debug, Clone, Copy)]
pub struct LodBuilder {
    density_threshold: usize,
    color_style: ColorStyle,
}

impl Default for LodBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_DENSITY_THRESHOLD, ColorStyle::default())
    }
}

impl LodBuilder {
    pub fn new(density_threshold: usize, color_style: ColorStyle) -> Self {
        Self {
            density_threshold,
            color_style,
        }
    }

    pub fn density_threshold(&self) -> usize {
        self.density_threshold
    }

    pub fn color_style(&self) -> ColorStyle {
        self.color_style
    }

    /// Build the LOD record for a column.
    ///
    /// Absent sections contribute nothing. Fails with
    /// [`Error::InvalidInput`] only when the column or color source itself
    /// is missing.
    pub fn build(&self, column: Option<&ColumnVolume>, colors: Option<&dyn ColorSource>) -> Result<LodRecord> {
        let column = column.ok_or_else(|| Error::InvalidInput("LOD builder given no column".into()))?;
        let colors = colors.ok_or_else(|| Error::InvalidInput("LOD builder given no color source".into()))?;
        if column.height() > MAX_COLUMN_HEIGHT {
            return Err(Error::InvalidInput(format!(
                "column ({}, {}) is {} voxels tall, heights are limited to {}",
                column.pos.x,
                column.pos.z,
                column.height(),
                MAX_COLUMN_HEIGHT
            )));
        }

        let mut top = [NO_HEIGHT; 4];
        let mut bottom = [NO_HEIGHT; 4];
        for quadrant in Quadrant::ALL {
            top[quadrant.index()] = self.top_point(column, quadrant);
            bottom[quadrant.index()] = self.bottom_point(column, quadrant);
        }

        let top_color = vertical_color(column, colors, true);
        let bottom_color = vertical_color(column, colors, false);

        let mut face_colors = [top_color; 6];
        face_colors[Face::Bottom.index()] = bottom_color;
        if self.color_style == ColorStyle::IndividualSides {
            for face in [Face::North, Face::South, Face::East, Face::West] {
                face_colors[face.index()] = side_color(column, colors, face);
            }
        }

        Ok(LodRecord::new(column.pos, top, bottom, face_colors))
    }

    /// Highest qualifying layer, scanning sections and layers top-down
    fn top_point(&self, column: &ColumnVolume, quadrant: Quadrant) -> i16 {
        for (index, section) in column.sections.iter().enumerate().rev() {
            let Some(section) = section else { continue };
            for y in (0..SECTION_SIZE).rev() {
                if self.is_lod_point(section, quadrant, y) {
                    return layer_height(index, y);
                }
            }
        }
        NO_HEIGHT
    }

    /// Lowest qualifying layer, scanning sections and layers bottom-up
    fn bottom_point(&self, column: &ColumnVolume, quadrant: Quadrant) -> i16 {
        for (index, section) in column.sections.iter().enumerate() {
            let Some(section) = section else { continue };
            for y in 0..SECTION_SIZE {
                if self.is_lod_point(section, quadrant, y) {
                    return layer_height(index, y);
                }
            }
        }
        NO_HEIGHT
    }

    /// Does layer `y` hold enough opaque cubes inside the quadrant?
    fn is_lod_point(&self, section: &Section, quadrant: Quadrant, y: usize) -> bool {
        let (xs, zs) = quadrant.bounds(CHUNK_WIDTH);
        let mut solid = 0;
        for x in xs {
            for z in zs.clone() {
                if section.get(x, y, z).is_opaque_cube() {
                    solid += 1;
                    if solid >= self.density_threshold {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// Callers stay within `MAX_COLUMN_HEIGHT`, checked in `build`
fn layer_height(section_index: usize, y: usize) -> i16 {
    (section_index * SECTION_SIZE + y) as i16
}

/// Packed color of the voxel at column-local coordinates, 0 if nothing visible
fn sample(column: &ColumnVolume, section: &Section, colors: &dyn ColorSource, x: usize, y: usize, z: usize, section_index: usize) -> u32 {
    let voxel = section.get(x, y, z);
    if voxel.is_air() {
        return 0;
    }
    colors.face_color(voxel, column.world_pos(x, section_index * SECTION_SIZE + y, z))
}

/// Average of the first visible voxel per (x, z), from the top or the bottom
fn vertical_color(column: &ColumnVolume, colors: &dyn ColorSource, top_down: bool) -> LodColor {
    let mut acc = ColorAccumulator::default();

    for x in 0..CHUNK_WIDTH {
        for z in 0..CHUNK_WIDTH {
            if let Some(packed) = first_visible_vertical(column, colors, x, z, top_down) {
                acc.add(packed);
            }
        }
    }

    acc.finish()
}

fn first_visible_vertical(column: &ColumnVolume, colors: &dyn ColorSource, x: usize, z: usize, top_down: bool) -> Option<u32> {
    let count = column.sections.len();
    for step in 0..count {
        let index = if top_down { count - 1 - step } else { step };
        let Some(section) = &column.sections[index] else { continue };
        for layer in 0..SECTION_SIZE {
            let y = if top_down { SECTION_SIZE - 1 - layer } else { layer };
            let packed = sample(column, section, colors, x, y, z, index);
            if packed != 0 {
                return Some(packed);
            }
        }
    }
    None
}

/// Average of the first visible voxel per (horizontal, y) line looking inward from a side
fn side_color(column: &ColumnVolume, colors: &dyn ColorSource, face: Face) -> LodColor {
    let mut acc = ColorAccumulator::default();
    let last = CHUNK_WIDTH - 1;

    for (index, section) in column.sections.iter().enumerate() {
        let Some(section) = section else { continue };
        for y in 0..SECTION_SIZE {
            for across in 0..CHUNK_WIDTH {
                for depth in 0..CHUNK_WIDTH {
                    // (x, z) of the voxel `depth` steps in from the face
                    let (x, z) = match face {
                        Face::North => (across, depth),
                        Face::South => (across, last - depth),
                        Face::East => (last - depth, across),
                        Face::West => (depth, across),
                        Face::Top | Face::Bottom => unreachable!("vertical faces use vertical_color"),
                    };
                    let packed = sample(column, section, colors, x, y, z, index);
                    if packed != 0 {
                        acc.add(packed);
                        break;
                    }
                }
            }
        }
    }

    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChunkPos, IVec3};
    use crate::voxel::voxel::{flags, Voxel};

    /// Colors every non-air block by id: 1 = grass, 2 = stone, 3 = sand
    struct Palette;

    impl ColorSource for Palette {
        fn face_color(&self, voxel: Voxel, _pos: IVec3) -> u32 {
            match voxel.block_id {
                1 => 0x22_AA_33,
                2 => 0x80_80_80,
                3 => 0xEE_DD_99,
                _ => 0,
            }
        }
    }

    fn column(sections: usize) -> ColumnVolume {
        ColumnVolume::empty(ChunkPos::new(3, -4), sections)
    }

    /// Place `count` opaque voxels of block 2 into layer `y` of a quadrant
    fn fill_quadrant_layer(column: &mut ColumnVolume, quadrant: Quadrant, y: usize, count: usize) {
        let (xs, zs) = quadrant.bounds(CHUNK_WIDTH);
        let cells = xs.flat_map(|x| zs.clone().map(move |z| (x, z)));
        for (x, z) in cells.take(count) {
            column.set(x, y, z, Voxel::solid(2));
        }
    }

    #[test]
    fn test_missing_inputs_are_invalid() {
        let builder = LodBuilder::default();
        let col = column(1);
        assert!(matches!(builder.build(None, Some(&Palette)), Err(Error::InvalidInput(_))));
        assert!(matches!(builder.build(Some(&col), None), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_all_absent_sections_give_sentinels() {
        let record = LodBuilder::default().build(Some(&column(16)), Some(&Palette)).unwrap();
        assert_eq!(record.top, [NO_HEIGHT; 4]);
        assert_eq!(record.bottom, [NO_HEIGHT; 4]);
        assert_eq!(record.colors, [LodColor::rgb(0, 0, 0); 6]);
        assert!(!record.is_placeholder());
        assert_eq!(record.pos, ChunkPos::new(3, -4));
    }

    #[test]
    fn test_density_threshold_15_is_not_enough() {
        let mut col = column(2);
        for y in 0..2 * SECTION_SIZE {
            fill_quadrant_layer(&mut col, Quadrant::NE, y, 15);
        }
        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.top_height(Quadrant::NE), NO_HEIGHT);
        assert_eq!(record.bottom_height(Quadrant::NE), NO_HEIGHT);
    }

    #[test]
    fn test_density_threshold_16_qualifies() {
        let mut col = column(2);
        for y in 0..2 * SECTION_SIZE {
            fill_quadrant_layer(&mut col, Quadrant::NE, y, 16);
        }
        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.top_height(Quadrant::NE), 31);
        assert_eq!(record.bottom_height(Quadrant::NE), 0);
        // other quadrants are untouched
        assert_eq!(record.top_height(Quadrant::SW), NO_HEIGHT);
    }

    #[test]
    fn test_custom_threshold() {
        let mut col = column(1);
        fill_quadrant_layer(&mut col, Quadrant::SE, 4, 1);
        let record = LodBuilder::new(1, ColorStyle::Top).build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.top_height(Quadrant::SE), 4);
        assert_eq!(record.bottom_height(Quadrant::SE), 4);
    }

    #[test]
    fn test_non_opaque_voxels_do_not_count() {
        let mut col = column(1);
        let (xs, zs) = Quadrant::NW.bounds(CHUNK_WIDTH);
        for x in xs {
            for z in zs.clone() {
                col.set(x, 3, z, Voxel::solid(20).with_flags(flags::TRANSPARENT));
            }
        }
        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.top_height(Quadrant::NW), NO_HEIGHT);
    }

    #[test]
    fn test_heights_span_sections_and_skip_absent_ones() {
        let mut sections = vec![None; 8];
        let mut low = Section::new();
        low.fill_layer(5, Voxel::solid(2));
        let mut high = Section::new();
        high.fill_layer(9, Voxel::solid(2));
        sections[1] = Some(low);
        sections[6] = Some(high);
        let col = ColumnVolume::new(ChunkPos::new(0, 0), sections);

        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        for q in Quadrant::ALL {
            assert_eq!(record.top_height(q), (6 * 16 + 9) as i16);
            assert_eq!(record.bottom_height(q), (16 + 5) as i16);
        }
    }

    #[test]
    fn test_single_solid_layer_end_to_end() {
        // one section, fully opaque at its lowest layer, empty above
        let mut section = Section::new();
        section.fill_layer(0, Voxel::solid(1));
        let col = ColumnVolume::new(ChunkPos::new(0, 0), vec![Some(section), None, None]);

        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.top, [0; 4]);
        assert_eq!(record.bottom, [0; 4]);
        assert_eq!(record.colors, [LodColor::rgb(0x22, 0xAA, 0x33); 6]);
    }

    #[test]
    fn test_top_and_bottom_colors_come_from_opposite_ends() {
        let mut col = column(1);
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                col.set(x, 0, z, Voxel::solid(2));
                col.set(x, 10, z, Voxel::solid(1));
            }
        }
        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.color(Face::Top), LodColor::rgb(0x22, 0xAA, 0x33));
        assert_eq!(record.color(Face::Bottom), LodColor::rgb(0x80, 0x80, 0x80));
        // reference style: sides copy the top sample
        assert_eq!(record.color(Face::North), record.color(Face::Top));
        assert_eq!(record.color(Face::West), record.color(Face::Top));
    }

    #[test]
    fn test_columns_without_visible_voxels_are_excluded_from_average() {
        let mut col = column(1);
        // half the footprint grass, the other half air
        for x in 0..CHUNK_WIDTH / 2 {
            for z in 0..CHUNK_WIDTH {
                col.set(x, 2, z, Voxel::solid(1));
            }
        }
        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.color(Face::Top), LodColor::rgb(0x22, 0xAA, 0x33));
    }

    #[test]
    fn test_colorless_blocks_are_skipped() {
        let mut col = column(1);
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                col.set(x, 8, z, Voxel::solid(99)); // no color in the palette
                col.set(x, 4, z, Voxel::solid(3));
            }
        }
        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.color(Face::Top), LodColor::rgb(0xEE, 0xDD, 0x99));
    }

    #[test]
    fn test_average_uses_integer_division() {
        struct Split;
        impl ColorSource for Split {
            fn face_color(&self, _voxel: Voxel, pos: IVec3) -> u32 {
                if pos.x.rem_euclid(2) == 0 { 0x00_00_03 } else { 0x00_00_00_04 }
            }
        }
        let mut col = column(1);
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                col.set(x, 0, z, Voxel::solid(1));
            }
        }
        let record = LodBuilder::default().build(Some(&col), Some(&Split)).unwrap();
        // (3 * 128 + 4 * 128) / 256 = 3
        assert_eq!(record.color(Face::Top).b(), 3);
    }

    #[test]
    fn test_individual_sides_sample_directionally() {
        let mut col = column(1);
        // a sand wall along the north edge, a stone wall along the east edge
        for y in 0..4 {
            for x in 0..CHUNK_WIDTH {
                col.set(x, y, 0, Voxel::solid(3));
            }
            for z in 1..CHUNK_WIDTH {
                col.set(CHUNK_WIDTH - 1, y, z, Voxel::solid(2));
            }
        }
        let builder = LodBuilder::new(DEFAULT_DENSITY_THRESHOLD, ColorStyle::IndividualSides);
        let record = builder.build(Some(&col), Some(&Palette)).unwrap();

        assert_eq!(record.color(Face::North), LodColor::rgb(0xEE, 0xDD, 0x99));
        // 15 stone rows and the sand corner at z = 0
        assert_eq!(record.color(Face::East), LodColor::rgb(134, 133, 129));
        assert_eq!(record.color(Face::West), LodColor::rgb(134, 133, 129));
        // 15 sand rows and the stone corner at x = 15
        assert_eq!(record.color(Face::South), LodColor::rgb(231, 215, 151));
        // top still samples top-down
        assert_ne!(record.color(Face::Top), record.color(Face::East));
    }

    #[test]
    fn test_tallest_column_reaches_max_height() {
        let mut col = column(MAX_COLUMN_HEIGHT / SECTION_SIZE);
        fill_quadrant_layer(&mut col, Quadrant::NE, MAX_COLUMN_HEIGHT - 1, 16);

        let record = LodBuilder::default().build(Some(&col), Some(&Palette)).unwrap();
        assert_eq!(record.top_height(Quadrant::NE), i16::MAX);
        assert_eq!(record.bottom_height(Quadrant::NE), i16::MAX);
        assert_eq!(record.top_height(Quadrant::SW), NO_HEIGHT);
    }

    #[test]
    fn test_columns_taller_than_height_range_are_rejected() {
        let col = column(MAX_COLUMN_HEIGHT / SECTION_SIZE + 1);
        let result = LodBuilder::default().build(Some(&col), Some(&Palette));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
