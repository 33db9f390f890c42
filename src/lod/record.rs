//! The per-column LOD record and its text encoding

use std::fmt;
use std::str::FromStr;

use crate::core::{ChunkPos, Error};

/// Height value meaning "no qualifying solid layer in this quadrant"
pub const NO_HEIGHT: i16 = -1;

/// Separator between fields of a record line
pub const DATA_DELIMITER: char = ',';

/// Number of fields in a record line: 2 coordinates + 8 heights + 18 color channels
pub const DATA_FIELD_COUNT: usize = 28;

/// One quarter of a chunk footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NE,
    SE,
    SW,
    NW,
}

impl Quadrant {
    /// Storage / serialization order
    pub const ALL: [Quadrant; 4] = [Quadrant::NE, Quadrant::SE, Quadrant::SW, Quadrant::NW];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Half-open `(x, z)` bounds of this quadrant inside a footprint of `width`
    ///
    /// North is -Z, east is +X.
    pub fn bounds(self, width: usize) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let half = width / 2;
        match self {
            Quadrant::NE => (half..width, 0..half),
            Quadrant::SE => (half..width, half..width),
            Quadrant::SW => (0..half, half..width),
            Quadrant::NW => (0..half, 0..half),
        }
    }
}

/// The six faces an LOD column is colored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Top,
    Bottom,
    North,
    South,
    East,
    West,
}

impl Face {
    /// Storage / serialization order
    pub const ALL: [Face; 6] = [
        Face::Top,
        Face::Bottom,
        Face::North,
        Face::South,
        Face::East,
        Face::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_side(self) -> bool {
        !matches!(self, Face::Top | Face::Bottom)
    }
}

/// Channel value written for every channel of a transparent color
pub const TRANSPARENT_CHANNEL: i16 = -1;

/// Averaged face color
///
/// Either opaque RGB or [`LodColor::TRANSPARENT`] ("nothing visible was
/// sampled"); no other alpha exists, so every value survives the text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LodColor {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl LodColor {
    pub const TRANSPARENT: LodColor = LodColor { r: 0, g: 0, b: 0, a: 0 };

    /// Opaque color from channels
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Decode a packed 24-bit color (bits 16-23 red, 8-15 green, 0-7 blue)
    pub fn from_packed(packed: u32) -> Self {
        Self::rgb(
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            (packed & 0xFF) as u8,
        )
    }

    pub fn r(&self) -> u8 {
        self.r
    }

    pub fn g(&self) -> u8 {
        self.g
    }

    pub fn b(&self) -> u8 {
        self.b
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// The three channels as written to a region file
    fn channels(&self) -> [i16; 3] {
        if self.is_transparent() {
            [TRANSPARENT_CHANNEL; 3]
        } else {
            [self.r as i16, self.g as i16, self.b as i16]
        }
    }

    /// Inverse of [`LodColor::channels`]
    fn from_channels(channels: [i16; 3]) -> Option<Self> {
        if channels == [TRANSPARENT_CHANNEL; 3] {
            return Some(Self::TRANSPARENT);
        }
        let [r, g, b] = channels.map(|c| u8::try_from(c).ok());
        Some(Self::rgb(r?, g?, b?))
    }
}

/// Compact height + color summary of one chunk column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodRecord {
    pub pos: ChunkPos,
    /// Highest qualifying layer per quadrant, in `Quadrant::ALL` order
    pub top: [i16; 4],
    /// Lowest qualifying layer per quadrant, in `Quadrant::ALL` order
    pub bottom: [i16; 4],
    /// Average color per face, in `Face::ALL` order
    pub colors: [LodColor; 6],
}

impl LodRecord {
    pub fn new(pos: ChunkPos, top: [i16; 4], bottom: [i16; 4], colors: [LodColor; 6]) -> Self {
        Self { pos, top, bottom, colors }
    }

    /// Stand-in record: zero heights, invisible colors. Never persisted.
    pub fn placeholder(pos: ChunkPos) -> Self {
        Self {
            pos,
            top: [0; 4],
            bottom: [0; 4],
            colors: [LodColor::TRANSPARENT; 6],
        }
    }

    /// True for records made by [`LodRecord::placeholder`]
    pub fn is_placeholder(&self) -> bool {
        self.top == [0; 4]
            && self.bottom == [0; 4]
            && self.colors.iter().all(LodColor::is_transparent)
    }

    pub fn top_height(&self, quadrant: Quadrant) -> i16 {
        self.top[quadrant.index()]
    }

    pub fn bottom_height(&self, quadrant: Quadrant) -> i16 {
        self.bottom[quadrant.index()]
    }

    pub fn color(&self, face: Face) -> LodColor {
        self.colors[face.index()]
    }

    /// Encode as one line of a region file (without the newline)
    ///
    /// Every field, including the last, is followed by a delimiter:
    /// `x,z,topNE,topSE,topSW,topNW,bottomNE,...,rTop,gTop,bTop,...,rW,gW,bW,`
    pub fn to_data_line(&self) -> String {
        use fmt::Write;

        let mut line = String::with_capacity(96);
        // writing to a String cannot fail
        let _ = write!(line, "{}{DATA_DELIMITER}{}{DATA_DELIMITER}", self.pos.x, self.pos.z);
        for h in self.top.iter().chain(self.bottom.iter()) {
            let _ = write!(line, "{h}{DATA_DELIMITER}");
        }
        for c in &self.colors {
            let [r, g, b] = c.channels();
            let _ = write!(line, "{r}{DATA_DELIMITER}{g}{DATA_DELIMITER}{b}{DATA_DELIMITER}");
        }
        line
    }
}

fn parse_field<T: FromStr>(fields: &[&str], index: usize, what: &str) -> Result<T, Error> {
    let raw = fields[index].trim();
    raw.parse::<T>().map_err(|_| {
        Error::MalformedRecord(format!("field {index} ({what}) is not valid: {raw:?}"))
    })
}

impl FromStr for LodRecord {
    type Err = Error;

    /// Decode a line produced by [`LodRecord::to_data_line`]
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let body = line
            .trim_end()
            .strip_suffix(DATA_DELIMITER)
            .ok_or_else(|| Error::MalformedRecord("line is not delimiter-terminated".into()))?;

        let fields: Vec<&str> = body.split(DATA_DELIMITER).collect();
        if fields.len() != DATA_FIELD_COUNT {
            return Err(Error::MalformedRecord(format!(
                "expected {DATA_FIELD_COUNT} fields, found {}",
                fields.len()
            )));
        }

        let pos = ChunkPos::new(parse_field(&fields, 0, "x")?, parse_field(&fields, 1, "z")?);

        let mut top = [0i16; 4];
        let mut bottom = [0i16; 4];
        for i in 0..4 {
            top[i] = parse_field(&fields, 2 + i, "top height")?;
            bottom[i] = parse_field(&fields, 6 + i, "bottom height")?;
        }

        let mut colors = [LodColor::TRANSPARENT; 6];
        for (face, color) in colors.iter_mut().enumerate() {
            let base = 10 + face * 3;
            let channels = [
                parse_field(&fields, base, "red")?,
                parse_field(&fields, base + 1, "green")?,
                parse_field(&fields, base + 2, "blue")?,
            ];
            *color = LodColor::from_channels(channels).ok_or_else(|| {
                Error::MalformedRecord(format!("face {face} has invalid channels {channels:?}"))
            })?;
        }

        Ok(Self { pos, top, bottom, colors })
    }
}

impl fmt::Display for LodRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x: {} z: {}\ttop: {:?}\tbottom: {:?}\tcolors:", self.pos.x, self.pos.z, self.top, self.bottom)?;
        for c in &self.colors {
            if c.is_transparent() {
                write!(f, " (transparent)")?;
            } else {
                write!(f, " ({}, {}, {})", c.r, c.g, c.b)?;
            }
        }
        Ok(())
    }
}
