//! Asset directory
//!
//! Entries live in an arena addressed by stable index. An appended entry
//! stays mutable until the pak is sealed, because later encoders bump the
//! inbound relation counters of the assets they depend on.

use crate::buffer::PagePtr;
use crate::error::{BuildError, Result};
use crate::hash::Guid;
use std::collections::HashMap;
use std::fmt;

/// Four-character asset type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetKind(pub [u8; 4]);

impl AssetKind {
    /// Material
    pub const MATERIAL: Self = Self(*b"matl");
    /// Texture
    pub const TEXTURE: Self = Self(*b"txtr");

    /// Tag bytes as stored in the directory
    pub const fn fourcc(self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag: String = self
            .0
            .iter()
            .take_while(|b| **b != 0)
            .map(|b| char::from(*b))
            .collect();
        write!(f, "{tag}")
    }
}

/// Directory record of one compiled asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Path hash of the asset
    pub guid: Guid,
    /// Start of the asset header
    pub header: PagePtr,
    /// Size of the asset header in bytes
    pub header_size: u32,
    /// Start of the asset data
    pub data: PagePtr,
    /// Asset format version
    pub version: u32,
    /// Asset type tag
    pub kind: AssetKind,
    /// Highest segment index used by the asset, plus one
    pub page_end: u16,
    /// Loader hint
    pub use_hint: u16,
    /// First relation edge pointing at this asset
    pub relations_start: Option<u32>,
    /// Number of relation edges pointing at this asset
    pub relations_count: u32,
    /// First relation edge declared by this asset
    pub uses_start: Option<u32>,
    /// Number of relation edges declared by this asset
    pub uses_count: u32,
}

impl AssetEntry {
    /// Create an entry whose page range covers its header and data segments
    pub fn new(
        guid: Guid,
        kind: AssetKind,
        header: PagePtr,
        header_size: u32,
        data: PagePtr,
        version: u32,
    ) -> Self {
        let highest = header.segment.max(data.segment);
        Self {
            guid,
            header,
            header_size,
            data,
            version,
            kind,
            page_end: u16::try_from(highest.saturating_add(1)).unwrap_or(u16::MAX),
            use_hint: 0,
            relations_start: None,
            relations_count: 0,
            uses_start: None,
            uses_count: 0,
        }
    }

    /// Record one more inbound edge
    pub fn add_inbound(&mut self, edge: u32) {
        if self.relations_start.is_none() {
            self.relations_start = Some(edge);
        }
        self.relations_count += 1;
    }

    /// Check the page range against the segment count
    fn check_pages(&self, asset: u32, segment_count: usize) -> Option<BuildError> {
        let page_end = u32::from(self.page_end);
        let out_of_range = |segment: u32| BuildError::AssetPageOutOfRange {
            asset,
            segment,
            page_end: self.page_end,
        };

        if page_end as usize > segment_count {
            return Some(out_of_range(page_end.saturating_sub(1)));
        }
        [self.header.segment, self.data.segment]
            .into_iter()
            .find(|segment| *segment >= page_end)
            .map(out_of_range)
    }
}

/// Ordered arena of asset entries
#[derive(Debug, Default)]
pub struct AssetDirectory {
    entries: Vec<AssetEntry>,
    by_guid: HashMap<Guid, u32>,
}

impl AssetDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its index
    ///
    /// # Errors
    /// `DuplicateGuid` if an entry with the same GUID exists
    pub fn push(&mut self, entry: AssetEntry) -> Result<u32> {
        let index = self.entries.len() as u32;
        if let Some(&existing) = self.by_guid.get(&entry.guid) {
            return Err(BuildError::DuplicateGuid {
                guid: entry.guid,
                existing,
            });
        }
        self.by_guid.insert(entry.guid, index);
        self.entries.push(entry);
        Ok(index)
    }

    /// Index of the asset with `guid`
    pub fn index_of(&self, guid: Guid) -> Option<u32> {
        self.by_guid.get(&guid).copied()
    }

    /// Entry with `guid`
    pub fn by_guid(&self, guid: Guid) -> Option<&AssetEntry> {
        self.index_of(guid).and_then(|index| self.get(index))
    }

    /// Mutable entry with `guid`
    pub fn by_guid_mut(&mut self, guid: Guid) -> Option<&mut AssetEntry> {
        let index = self.index_of(guid)?;
        self.get_mut(index)
    }

    /// Entry by index
    pub fn get(&self, index: u32) -> Option<&AssetEntry> {
        self.entries.get(index as usize)
    }

    /// Mutable entry by index
    pub fn get_mut(&mut self, index: u32) -> Option<&mut AssetEntry> {
        self.entries.get_mut(index as usize)
    }

    /// Entries in append order
    pub fn iter(&self) -> impl Iterator<Item = &AssetEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the directory is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every entry's page range
    pub fn validate(&self, segment_count: usize) -> Vec<BuildError> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.check_pages(index as u32, segment_count))
            .collect()
    }

    /// Release the entries
    pub(crate) fn into_entries(self) -> Vec<AssetEntry> {
        self.entries
    }
}
