//! On-disk records of the pak container
//!
//! All multi-byte fields are little-endian. Layout:
//! ```text
//! PakHeader                      56 bytes
//! SegmentRecord * segment_count  24 bytes each
//! AssetRecord * asset_count      56 bytes each
//! PageDescriptor * descriptors    8 bytes each (pointer slots)
//! PageDescriptor * guid_refs      8 bytes each (GUID slots)
//! u32 * relation_count            dependent asset index per edge
//! pages                          each segment at its aligned file offset
//! ```

use crate::asset::AssetEntry;
use binrw::BinWrite;

/// Container magic, "RPak" read as a little-endian `u32`
pub const RPAK_MAGIC: u32 = 0x6B61_5052;

/// Default container version
pub const RPAK_VERSION: u16 = 7;

/// Size of [`PakHeader`] in bytes
pub const HEADER_SIZE: u64 = 56;

/// Size of [`SegmentRecord`] in bytes
pub const SEGMENT_RECORD_SIZE: u64 = 24;

/// Size of [`AssetRecord`] in bytes
pub const ASSET_RECORD_SIZE: u64 = 56;

/// Size of one descriptor entry in bytes
pub const DESCRIPTOR_SIZE: u64 = 8;

/// Size of one relation entry in bytes
pub const RELATION_SIZE: u64 = 4;

/// Index value meaning "none"
pub const NO_INDEX: u32 = u32::MAX;

/// Fixed file header
#[derive(Debug, Clone, PartialEq, Eq, BinWrite)]
#[bw(little)]
pub struct PakHeader {
    /// Magic signature, always [`RPAK_MAGIC`]
    pub magic: u32,
    /// Container version
    pub version: u16,
    /// Container flags
    pub flags: u16,
    /// Creation time as a Windows FILETIME
    pub created_time: u64,
    /// Total file size in bytes
    pub file_size: u64,
    /// File offset where the page region starts
    pub data_offset: u64,
    /// Number of segment records
    pub segment_count: u32,
    /// Number of asset records
    pub asset_count: u32,
    /// Number of pointer descriptors
    pub descriptor_count: u32,
    /// Number of GUID descriptors
    pub guid_descriptor_count: u32,
    /// Number of relation entries
    pub relation_count: u32,
    /// Always zero
    pub reserved: u32,
}

/// Segment directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinWrite)]
#[bw(little)]
pub struct SegmentRecord {
    /// Segment category flags
    pub flags: u32,
    /// Alignment of the file placement
    pub alignment: u32,
    /// Segment size in bytes
    pub size: u64,
    /// Absolute file offset of the segment's first byte
    pub file_offset: u64,
}

/// Asset directory record
#[derive(Debug, Clone, PartialEq, Eq, BinWrite)]
#[bw(little)]
pub struct AssetRecord {
    /// Asset GUID
    pub guid: u64,
    /// Header segment index
    pub header_segment: u32,
    /// Header offset inside its segment
    pub header_offset: u32,
    /// Data segment index
    pub data_segment: u32,
    /// Data offset inside its segment
    pub data_offset: u32,
    /// Highest used segment index plus one
    pub page_end: u16,
    /// Loader hint
    pub use_hint: u16,
    /// First inbound relation, [`NO_INDEX`] if none
    pub relations_start: u32,
    /// Inbound relation count
    pub relations_count: u32,
    /// First outgoing relation, [`NO_INDEX`] if none
    pub uses_start: u32,
    /// Outgoing relation count
    pub uses_count: u32,
    /// Header size in bytes
    pub header_size: u32,
    /// Asset format version
    pub version: u32,
    /// Asset type tag
    pub kind: [u8; 4],
}

impl From<&AssetEntry> for AssetRecord {
    fn from(entry: &AssetEntry) -> Self {
        Self {
            guid: entry.guid.value(),
            header_segment: entry.header.segment,
            header_offset: entry.header.offset,
            data_segment: entry.data.segment,
            data_offset: entry.data.offset,
            page_end: entry.page_end,
            use_hint: entry.use_hint,
            relations_start: entry.relations_start.unwrap_or(NO_INDEX),
            relations_count: entry.relations_count,
            uses_start: entry.uses_start.unwrap_or(NO_INDEX),
            uses_count: entry.uses_count,
            header_size: entry.header_size,
            version: entry.version,
            kind: entry.kind.fourcc(),
        }
    }
}
