//! Segment allocation
//!
//! A segment is a contiguous, aligned span of the output reserved by an
//! encoder before any bytes exist. Segments are append-only and keep their
//! creation order; the serializer places them in that order.

use crate::error::{BuildError, Result};
use std::fmt;
use std::ops::BitOr;
use tracing::debug;

/// Maximum number of segments in one pak (asset page ranges are 16-bit)
pub const MAX_SEGMENTS: usize = u16::MAX as usize;

/// Category bitset of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SegmentFlags {
    /// Raw flag value
    pub value: u32,
}

impl SegmentFlags {
    /// Asset header segment (no bits set)
    pub const HEADER: Self = Self::new(0);

    /// Asset data segment (bit 0)
    pub const DATA: Self = Self::new(0x1);

    /// Kept resident in CPU memory after load (bit 1)
    pub const CPU: Self = Self::new(0x2);

    /// Only loaded by the client (bit 2)
    pub const CLIENT_ONLY: Self = Self::new(0x4);

    /// Create flags from a raw value
    pub const fn new(value: u32) -> Self {
        Self { value }
    }

    /// Check whether every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.value & other.value == other.value
    }

    /// Whether this is a header segment
    pub const fn is_header(self) -> bool {
        self.value == 0
    }
}

impl BitOr for SegmentFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::new(self.value | rhs.value)
    }
}

impl fmt::Display for SegmentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_header() {
            return write!(f, "header");
        }
        let names: Vec<&str> = [
            (Self::DATA, "data"),
            (Self::CPU, "cpu"),
            (Self::CLIENT_ONLY, "client"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
        write!(f, "{}", names.join("|"))
    }
}

/// One reserved segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Position in creation order
    pub index: u32,
    /// Category flags
    pub flags: SegmentFlags,
    /// Required alignment of the segment's file placement
    pub alignment: u32,
    /// Declared size in bytes
    pub size: u64,
}

/// Handle returned to encoders when a segment is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Segment index
    pub index: u32,
    /// Declared size in bytes
    pub size: u64,
}

/// Ordered list of segments
#[derive(Debug, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a new segment
    ///
    /// # Errors
    /// - `InvalidSegment` if `size` is zero
    /// - `InvalidAlignment` if `alignment` is not a power of two
    /// - `TooManySegments` if the table is full
    pub fn create(&mut self, size: u64, flags: SegmentFlags, alignment: u32) -> Result<SegmentInfo> {
        if size == 0 {
            return Err(BuildError::InvalidSegment);
        }
        if !alignment.is_power_of_two() {
            return Err(BuildError::InvalidAlignment(alignment));
        }
        if self.segments.len() >= MAX_SEGMENTS {
            return Err(BuildError::TooManySegments { max: MAX_SEGMENTS });
        }

        let index = self.segments.len() as u32;
        self.segments.push(Segment {
            index,
            flags,
            alignment,
            size,
        });
        debug!("Created segment {index}: {size} bytes, {flags}, align {alignment}");

        Ok(SegmentInfo { index, size })
    }

    /// Look up a segment by index
    pub fn get(&self, index: u32) -> Option<&Segment> {
        self.segments.get(index as usize)
    }

    /// Look up a segment, failing with `UnknownSegment`
    pub fn require(&self, index: u32) -> Result<&Segment> {
        self.get(index).ok_or(BuildError::UnknownSegment(index))
    }

    /// Segments in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if no segment was created
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
