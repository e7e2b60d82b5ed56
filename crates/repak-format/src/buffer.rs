//! Length-checked segment buffers and pending pointers
//!
//! Encoders fill a [`SegmentBuffer`] sized exactly to its segment. Pointer
//! slots receive a [`PagePtr`] placeholder (target segment and offset as two
//! little-endian `u32`) which the serializer rewrites to the final file
//! offset once every segment has been placed.

use crate::error::{BuildError, Result};
use crate::raw_block::RawDataBlock;
use crate::segment::SegmentInfo;

/// Size of a pointer or GUID slot in bytes
pub const SLOT_SIZE: usize = 8;

/// Location inside a segment, used as a pointer before layout is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PagePtr {
    /// Target segment index
    pub segment: u32,
    /// Byte offset inside the target segment
    pub offset: u32,
}

impl PagePtr {
    /// Create a pointer to `offset` inside `segment`
    pub const fn new(segment: u32, offset: u32) -> Self {
        Self { segment, offset }
    }

    /// Placeholder encoding written into a pointer slot
    pub fn to_bytes(self) -> [u8; SLOT_SIZE] {
        let mut bytes = [0u8; SLOT_SIZE];
        bytes[..4].copy_from_slice(&self.segment.to_le_bytes());
        bytes[4..].copy_from_slice(&self.offset.to_le_bytes());
        bytes
    }

    /// Decode a placeholder slot
    pub fn from_bytes(bytes: [u8; SLOT_SIZE]) -> Self {
        Self {
            segment: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            offset: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// Zero-filled byte buffer bound to one segment
#[derive(Debug, Clone)]
pub struct SegmentBuffer {
    segment: SegmentInfo,
    data: Vec<u8>,
}

impl SegmentBuffer {
    /// Allocate a buffer matching the segment's declared size
    pub fn new(segment: SegmentInfo) -> Self {
        Self {
            segment,
            data: vec![0u8; segment.size as usize],
        }
    }

    /// Index of the segment this buffer fills
    pub fn index(&self) -> u32 {
        self.segment.index
    }

    /// Pointer to an offset inside this buffer's segment
    pub fn ptr(&self, offset: u32) -> PagePtr {
        PagePtr::new(self.segment.index, offset)
    }

    /// Buffer length (the segment size)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current contents
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Copy bytes to `offset`
    ///
    /// # Errors
    /// `WriteOutOfBounds` if the write does not fit the segment
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.data.len())
            .ok_or(BuildError::WriteOutOfBounds {
                segment: self.segment.index,
                offset: offset as u64,
                len: bytes.len(),
                size: self.segment.size,
            })?;
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Write a byte
    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.write_bytes(offset, &[value])
    }

    /// Write a little-endian `u16`
    pub fn write_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write a little-endian `u32`
    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write a little-endian `u64`
    pub fn write_u64(&mut self, offset: usize, value: u64) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write a NUL-terminated string, returning the bytes written
    pub fn write_cstr(&mut self, offset: usize, value: &str) -> Result<usize> {
        self.write_bytes(offset, value.as_bytes())?;
        self.write_u8(offset + value.len(), 0)?;
        Ok(value.len() + 1)
    }

    /// Write a pointer placeholder; callers register the slot separately
    pub(crate) fn write_placeholder(&mut self, offset: usize, target: PagePtr) -> Result<()> {
        self.write_bytes(offset, &target.to_bytes())
    }

    /// Hand the bytes over as the segment's raw data block
    pub fn into_block(self) -> RawDataBlock {
        RawDataBlock::new(self.segment.index, self.data)
    }
}

/// Round `value` up to a multiple of `alignment` (a power of two)
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}
