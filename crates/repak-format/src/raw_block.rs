//! Raw byte buffers attached to segments

use crate::error::{BuildError, Result};
use crate::segment::SegmentTable;
use std::collections::BTreeMap;

/// Bytes supplied for one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataBlock {
    /// Segment the bytes belong to
    pub segment_index: u32,
    /// Size the caller declares for the buffer
    pub size: u64,
    /// The bytes, emitted verbatim after pointer patching
    pub data: Vec<u8>,
}

impl RawDataBlock {
    /// Wrap a buffer, declaring its length as the size
    pub fn new(segment_index: u32, data: Vec<u8>) -> Self {
        Self {
            segment_index,
            size: data.len() as u64,
            data,
        }
    }
}

/// Owns exactly one raw block per segment
#[derive(Debug, Default)]
pub struct RawBlockRegistry {
    blocks: BTreeMap<u32, Vec<u8>>,
}

impl RawBlockRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a segment's bytes
    ///
    /// # Errors
    /// - `UnknownSegment` if the segment was never created
    /// - `SizeMismatch` if the block size differs from the declared segment size
    /// - `DuplicateBlock` if the segment already has bytes
    pub fn add(&mut self, segments: &SegmentTable, block: RawDataBlock) -> Result<()> {
        let segment = segments.require(block.segment_index)?;

        let actual = block.data.len() as u64;
        if block.size != segment.size || actual != segment.size {
            return Err(BuildError::SizeMismatch {
                segment: segment.index,
                expected: segment.size,
                actual: if block.size == segment.size {
                    actual
                } else {
                    block.size
                },
            });
        }

        if self.blocks.contains_key(&block.segment_index) {
            return Err(BuildError::DuplicateBlock(block.segment_index));
        }

        self.blocks.insert(block.segment_index, block.data);
        Ok(())
    }

    /// Bytes registered for a segment
    pub fn get(&self, segment: u32) -> Option<&[u8]> {
        self.blocks.get(&segment).map(Vec::as_slice)
    }

    /// Check whether a segment has bytes
    pub fn contains(&self, segment: u32) -> bool {
        self.blocks.contains_key(&segment)
    }

    /// Number of registered blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if no block was registered
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Release all buffers in segment order
    pub(crate) fn into_blocks(self) -> BTreeMap<u32, Vec<u8>> {
        self.blocks
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::segment::SegmentFlags;

    fn table() -> SegmentTable {
        let mut table = SegmentTable::new();
        table.create(8, SegmentFlags::HEADER, 8).unwrap();
        table.create(4, SegmentFlags::DATA, 4).unwrap();
        table
    }

    #[test]
    fn test_add_block() {
        let segments = table();
        let mut registry = RawBlockRegistry::new();
        registry
            .add(&segments, RawDataBlock::new(1, vec![1, 2, 3, 4]))
            .unwrap();
        assert!(registry.contains(1));
        assert!(!registry.contains(0));
        assert_eq!(registry.get(1), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn test_size_mismatch() {
        let segments = table();
        let mut registry = RawBlockRegistry::new();
        let err = registry
            .add(&segments, RawDataBlock::new(0, vec![0; 7]))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::SizeMismatch {
                segment: 0,
                expected: 8,
                actual: 7
            }
        ));

        let lying = RawDataBlock {
            segment_index: 0,
            size: 8,
            data: vec![0; 3],
        };
        assert!(matches!(
            registry.add(&segments, lying),
            Err(BuildError::SizeMismatch { actual: 3, .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_block() {
        let segments = table();
        let mut registry = RawBlockRegistry::new();
        registry
            .add(&segments, RawDataBlock::new(1, vec![0; 4]))
            .unwrap();
        assert!(matches!(
            registry.add(&segments, RawDataBlock::new(1, vec![0; 4])),
            Err(BuildError::DuplicateBlock(1))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_segment() {
        let segments = table();
        let mut registry = RawBlockRegistry::new();
        assert!(matches!(
            registry.add(&segments, RawDataBlock::new(5, vec![0; 4])),
            Err(BuildError::UnknownSegment(5))
        ));
    }
}
