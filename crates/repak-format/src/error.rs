//! Error types for pak assembly and serialization

use crate::hash::Guid;
use thiserror::Error;

/// Errors raised while assembling or serializing a pak
///
/// Every variant is a consistency violation: the build cannot continue
/// without producing a corrupt container.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Segment requested with a zero size
    #[error("Invalid segment: size must be greater than zero")]
    InvalidSegment,

    /// Segment alignment is not a power of two
    #[error("Invalid segment alignment {0}: must be a power of two")]
    InvalidAlignment(u32),

    /// Segment table is full
    #[error("Too many segments: the container holds at most {max}")]
    TooManySegments {
        /// Maximum segment count
        max: usize,
    },

    /// Segment index does not name a created segment
    #[error("Unknown segment index {0}")]
    UnknownSegment(u32),

    /// Raw data block size differs from the declared segment size
    #[error("Raw data size mismatch for segment {segment}: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Segment index
        segment: u32,
        /// Declared segment size
        expected: u64,
        /// Supplied buffer size
        actual: u64,
    },

    /// A raw data block was registered twice for one segment
    #[error("Duplicate raw data block for segment {0}")]
    DuplicateBlock(u32),

    /// Two assets hash to the same GUID
    #[error("Duplicate asset GUID {guid}: already used by asset {existing}")]
    DuplicateGuid {
        /// Colliding GUID
        guid: Guid,
        /// Index of the asset already holding the GUID
        existing: u32,
    },

    /// A relation edge still points at an asset that was never added
    #[error("Asset {dependent} depends on {guid}, which is not part of this pak")]
    DanglingDependency {
        /// Index of the dependent asset
        dependent: u32,
        /// GUID that never resolved
        guid: Guid,
    },

    /// Segment has no raw data block
    #[error("Segment {0} has no raw data block")]
    MissingData(u32),

    /// Pointer placeholder names a segment or offset that does not exist
    #[error(
        "Pointer at segment {segment} offset {offset:#x} targets segment {target_segment} offset {target_offset:#x}, which does not exist"
    )]
    DanglingPointer {
        /// Segment holding the pointer slot
        segment: u32,
        /// Offset of the pointer slot
        offset: u32,
        /// Placeholder target segment
        target_segment: u32,
        /// Placeholder target offset
        target_offset: u32,
    },

    /// Descriptor slot does not fit inside its segment
    #[error("Descriptor at segment {segment} offset {offset:#x} is out of bounds")]
    DescriptorOutOfBounds {
        /// Segment index
        segment: u32,
        /// Slot offset
        offset: u32,
    },

    /// Descriptor slot is not 8-byte aligned
    #[error("Descriptor at segment {segment} offset {offset:#x} is misaligned")]
    MisalignedDescriptor {
        /// Segment index
        segment: u32,
        /// Slot offset
        offset: u32,
    },

    /// One slot was registered more than once
    #[error("Descriptor at segment {segment} offset {offset:#x} is registered more than once")]
    DuplicateDescriptor {
        /// Segment index
        segment: u32,
        /// Slot offset
        offset: u32,
    },

    /// Asset references a segment outside its page range
    #[error("Asset {asset} references segment {segment} but its page end is {page_end}")]
    AssetPageOutOfRange {
        /// Asset index
        asset: u32,
        /// Referenced segment
        segment: u32,
        /// Declared page end
        page_end: u16,
    },

    /// Outgoing relations of an asset are not one contiguous run
    #[error("Relations of asset {asset} are not contiguous (stray edge {edge})")]
    NonContiguousRelations {
        /// Asset index
        asset: u32,
        /// First edge breaking the run
        edge: u32,
    },

    /// Relation edge names a dependent that cannot be the next asset
    #[error("Relation for asset {dependent} added while the next asset index is {next}")]
    InvalidDependent {
        /// Dependent index supplied by the caller
        dependent: u32,
        /// Index the next appended asset will receive
        next: u32,
    },

    /// Write through a segment buffer would overrun it
    #[error("Write of {len} bytes at offset {offset:#x} overruns segment {segment} of size {size}")]
    WriteOutOfBounds {
        /// Segment index
        segment: u32,
        /// Write offset
        offset: u64,
        /// Write length
        len: usize,
        /// Segment size
        size: u64,
    },

    /// Several inconsistencies found by the validation pass
    #[error("Pak validation failed with {} errors", .0.len())]
    Validation(Vec<BuildError>),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `BinRW` writing error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl BuildError {
    /// Iterate over the individual errors, flattening `Validation`
    pub fn errors(&self) -> Box<dyn Iterator<Item = &BuildError> + '_> {
        match self {
            Self::Validation(errors) => Box::new(errors.iter().flat_map(BuildError::errors)),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Collapse a list of errors into one result
    pub(crate) fn from_list(mut errors: Vec<BuildError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Validation(errors)),
        }
    }
}

/// Type alias for pak assembly results
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_list() {
        assert!(BuildError::from_list(Vec::new()).is_ok());

        let single = BuildError::from_list(vec![BuildError::MissingData(3)]);
        assert!(matches!(single, Err(BuildError::MissingData(3))));

        let many = BuildError::from_list(vec![
            BuildError::MissingData(1),
            BuildError::UnknownSegment(9),
        ])
        .expect_err("two errors should fail");
        assert_eq!(many.errors().count(), 2);
        assert_eq!(many.to_string(), "Pak validation failed with 2 errors");
    }

    #[test]
    fn test_messages() {
        let err = BuildError::DanglingDependency {
            dependent: 2,
            guid: Guid(0xAB),
        };
        assert_eq!(
            err.to_string(),
            "Asset 2 depends on 0x00000000000000AB, which is not part of this pak"
        );
    }
}
