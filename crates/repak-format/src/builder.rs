//! Build context for one pak
//!
//! [`PakBuilder`] owns every piece of mutable build state. Encoders receive
//! it by `&mut` and call into it strictly in sequence; [`PakBuilder::seal`]
//! consumes it, so nothing can be registered once the layout is frozen.

use crate::asset::{AssetDirectory, AssetEntry};
use crate::buffer::{PagePtr, SLOT_SIZE, SegmentBuffer};
use crate::error::{BuildError, Result};
use crate::hash::Guid;
use crate::raw_block::{RawBlockRegistry, RawDataBlock};
use crate::relation::{RelationGraph, RelationTarget};
use crate::relocation::RelocationRegistry;
use crate::segment::{SegmentFlags, SegmentInfo, SegmentTable};
use crate::serializer::SealedPak;
use crate::serializer::header::RPAK_VERSION;
use tracing::{debug, error};

/// Header-level settings of a pak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PakSettings {
    /// Container version
    pub version: u16,
    /// Container flags
    pub flags: u16,
    /// Creation time (FILETIME); zero keeps builds reproducible
    pub created_time: u64,
}

impl Default for PakSettings {
    fn default() -> Self {
        Self {
            version: RPAK_VERSION,
            flags: 0,
            created_time: 0,
        }
    }
}

/// Open pak accepting segments, data, descriptors, relations and assets
#[derive(Debug, Default)]
pub struct PakBuilder {
    settings: PakSettings,
    segments: SegmentTable,
    raw_blocks: RawBlockRegistry,
    relocations: RelocationRegistry,
    relations: RelationGraph,
    assets: AssetDirectory,
}

impl PakBuilder {
    /// Start an empty pak
    pub fn new(settings: PakSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Settings the pak was started with
    pub fn settings(&self) -> &PakSettings {
        &self.settings
    }

    /// Reserve a new segment
    ///
    /// # Errors
    /// `InvalidSegment`, `InvalidAlignment` or `TooManySegments`
    pub fn create_segment(
        &mut self,
        size: u64,
        flags: SegmentFlags,
        alignment: u32,
    ) -> Result<SegmentInfo> {
        self.segments.create(size, flags, alignment)
    }

    /// Reserve a new segment and return a zeroed buffer for it
    pub fn create_buffer(
        &mut self,
        size: u64,
        flags: SegmentFlags,
        alignment: u32,
    ) -> Result<SegmentBuffer> {
        self.create_segment(size, flags, alignment)
            .map(SegmentBuffer::new)
    }

    /// Hand over the bytes of one segment
    ///
    /// # Errors
    /// `UnknownSegment`, `SizeMismatch` or `DuplicateBlock`
    pub fn add_raw_data_block(&mut self, block: RawDataBlock) -> Result<()> {
        self.raw_blocks.add(&self.segments, block)
    }

    /// Finish a buffer and hand its bytes over
    pub fn add_buffer(&mut self, buffer: SegmentBuffer) -> Result<()> {
        self.add_raw_data_block(buffer.into_block())
    }

    /// Record a pointer slot; checked when the pak is sealed
    pub fn register_descriptor(&mut self, segment: u32, offset: u32) {
        self.relocations.register_descriptor(segment, offset);
    }

    /// Record a GUID slot; checked when the pak is sealed
    pub fn register_guid_descriptor(&mut self, segment: u32, offset: u32) {
        self.relocations.register_guid_descriptor(segment, offset);
    }

    /// Write a pending pointer into `buffer` and register its slot
    pub fn write_pointer(
        &mut self,
        buffer: &mut SegmentBuffer,
        offset: u32,
        target: PagePtr,
    ) -> Result<()> {
        buffer.write_placeholder(offset as usize, target)?;
        self.register_descriptor(buffer.index(), offset);
        Ok(())
    }

    /// Write an asset GUID into `buffer` and register its slot
    pub fn write_guid_ref(
        &mut self,
        buffer: &mut SegmentBuffer,
        offset: u32,
        guid: Guid,
    ) -> Result<()> {
        buffer.write_u64(offset as usize, guid.value())?;
        self.register_guid_descriptor(buffer.index(), offset);
        Ok(())
    }

    /// Append `count` edges resolved by the runtime loader
    ///
    /// Returns the index of the first appended edge.
    pub fn add_file_relation(&mut self, dependent: u32, count: u32) -> u32 {
        self.relations.add_file_relation(dependent, count)
    }

    /// Append one edge from `dependent` to the in-pak asset `guid`
    ///
    /// The edge resolves now if the asset exists, otherwise once an entry
    /// with that GUID is appended.
    ///
    /// # Errors
    /// `InvalidDependent` if `dependent` is not the index the next appended
    /// asset will receive
    pub fn add_asset_relation(&mut self, dependent: u32, guid: Guid) -> Result<u32> {
        let next = self.next_asset_index();
        if dependent != next {
            return Err(BuildError::InvalidDependent { dependent, next });
        }

        match self.assets.index_of(guid) {
            Some(target) => {
                let edge = self.relations.push(dependent, RelationTarget::Asset(target));
                if let Some(entry) = self.assets.get_mut(target) {
                    entry.add_inbound(edge);
                }
                Ok(edge)
            }
            None => {
                debug!("Asset {} holds forward reference to {}", dependent, guid);
                Ok(self.relations.push(dependent, RelationTarget::Pending(guid)))
            }
        }
    }

    /// Entry already appended with `guid`
    pub fn asset_by_guid(&self, guid: Guid) -> Option<&AssetEntry> {
        self.assets.by_guid(guid)
    }

    /// Mutable entry already appended with `guid`
    pub fn asset_by_guid_mut(&mut self, guid: Guid) -> Option<&mut AssetEntry> {
        self.assets.by_guid_mut(guid)
    }

    /// Index the next appended asset will receive
    pub fn next_asset_index(&self) -> u32 {
        self.assets.len() as u32
    }

    /// Append a finished asset entry, returning its index
    ///
    /// The entry's outgoing span is derived from the edges appended for its
    /// index, and pending edges waiting for its GUID are resolved.
    ///
    /// # Errors
    /// `DuplicateGuid` or `NonContiguousRelations`
    pub fn add_asset_entry(&mut self, mut entry: AssetEntry) -> Result<u32> {
        let index = self.next_asset_index();
        let (start, count) = self
            .relations
            .trailing_span(index)
            .map_err(|edge| BuildError::NonContiguousRelations { asset: index, edge })?;
        entry.uses_start = (count > 0).then_some(start);
        entry.uses_count = count;

        let guid = entry.guid;
        let kind = entry.kind;
        self.assets.push(entry)?;

        let resolved = self.relations.resolve(guid, index);
        if let Some(entry) = self.assets.get_mut(index) {
            for edge in &resolved {
                entry.add_inbound(*edge);
            }
        }

        debug!(
            "Added asset {} ({}) as {} with {} relations, {} forward references resolved",
            guid,
            kind,
            index,
            count,
            resolved.len()
        );
        Ok(index)
    }

    /// Number of segments created so far
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of assets appended so far
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Validate every registration and freeze the layout
    ///
    /// # Errors
    /// The single inconsistency found, or `Validation` with all of them
    pub fn seal(self) -> Result<SealedPak> {
        let errors = self.validate();
        for err in &errors {
            error!("{}", err);
        }
        BuildError::from_list(errors)?;

        Ok(SealedPak::new(
            self.settings,
            self.segments,
            self.raw_blocks,
            self.relocations,
            self.relations,
            self.assets,
        ))
    }

    /// Collect every inconsistency of the open pak
    pub fn validate(&self) -> Vec<BuildError> {
        let mut errors = Vec::new();

        errors.extend(
            self.relations
                .unresolved()
                .filter_map(|(_, edge)| match edge.target {
                    RelationTarget::Pending(guid) => Some(BuildError::DanglingDependency {
                        dependent: edge.dependent,
                        guid,
                    }),
                    _ => None,
                }),
        );

        errors.extend(
            self.segments
                .iter()
                .filter(|segment| !self.raw_blocks.contains(segment.index))
                .map(|segment| BuildError::MissingData(segment.index)),
        );

        errors.extend(self.relocations.validate(&self.segments));
        errors.extend(self.dangling_pointers());
        errors.extend(self.assets.validate(self.segments.len()));
        errors
    }

    /// Pointer slots whose placeholder names a location outside the pak
    fn dangling_pointers(&self) -> Vec<BuildError> {
        self.relocations
            .pointers()
            .iter()
            .filter_map(|desc| {
                let bytes = self.raw_blocks.get(desc.segment)?;
                let start = desc.offset as usize;
                let slot: [u8; SLOT_SIZE] = bytes.get(start..start + SLOT_SIZE)?.try_into().ok()?;
                let target = PagePtr::from_bytes(slot);

                let exists = self
                    .segments
                    .get(target.segment)
                    .is_some_and(|segment| u64::from(target.offset) <= segment.size);
                (!exists).then_some(BuildError::DanglingPointer {
                    segment: desc.segment,
                    offset: desc.offset,
                    target_segment: target.segment,
                    target_offset: target.offset,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::asset::AssetKind;

    fn entry(path: &str, header: u32) -> AssetEntry {
        AssetEntry::new(
            Guid::from_path(path),
            AssetKind::TEXTURE,
            PagePtr::new(header, 0),
            8,
            PagePtr::new(header, 0),
            8,
        )
    }

    fn single_segment(builder: &mut PakBuilder) -> u32 {
        let buffer = builder
            .create_buffer(16, SegmentFlags::HEADER, 8)
            .unwrap();
        let index = buffer.index();
        builder.add_buffer(buffer).unwrap();
        index
    }

    #[test]
    fn test_settings_default() {
        let settings = PakSettings::default();
        assert_eq!(settings.version, 7);
        assert_eq!(settings.created_time, 0);
    }

    #[test]
    fn test_backward_reference_bumps_inbound() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let seg = single_segment(&mut builder);
        let b = entry("b", seg);
        let b_guid = b.guid;
        assert_eq!(builder.add_asset_entry(b).unwrap(), 0);

        let edge = builder.add_asset_relation(1, b_guid).unwrap();
        assert_eq!(edge, 0);
        let a = entry("a", seg);
        assert_eq!(builder.add_asset_entry(a).unwrap(), 1);

        let b = builder.asset_by_guid(b_guid).unwrap();
        assert_eq!(b.relations_start, Some(0));
        assert_eq!(b.relations_count, 1);
        let a = builder.asset_by_guid(Guid::from_path("a")).unwrap();
        assert_eq!(a.uses_start, Some(0));
        assert_eq!(a.uses_count, 1);
    }

    #[test]
    fn test_forward_reference_resolves_on_append() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let seg = single_segment(&mut builder);
        let b_guid = Guid::from_path("b");

        builder.add_asset_relation(0, b_guid).unwrap();
        builder.add_asset_entry(entry("a", seg)).unwrap();
        assert!(builder.asset_by_guid(b_guid).is_none());

        builder.add_asset_entry(entry("b", seg)).unwrap();
        let b = builder.asset_by_guid(b_guid).unwrap();
        assert_eq!(b.relations_count, 1);
        assert_eq!(b.relations_start, Some(0));
        assert!(builder.validate().is_empty());
    }

    #[test]
    fn test_relation_for_wrong_dependent() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let err = builder.add_asset_relation(3, Guid(1)).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidDependent {
                dependent: 3,
                next: 0
            }
        ));
    }

    #[test]
    fn test_non_contiguous_relations() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let seg = single_segment(&mut builder);
        builder.add_file_relation(0, 1);
        builder.add_file_relation(1, 1);
        builder.add_file_relation(0, 1);
        let err = builder
            .add_asset_entry(entry("a", seg))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::NonContiguousRelations { asset: 0, edge: 0 }
        ));
        assert_eq!(builder.asset_count(), 0);
    }

    #[test]
    fn test_dangling_dependency_at_seal() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let seg = single_segment(&mut builder);
        builder.add_asset_relation(0, Guid(0xAB)).unwrap();
        builder.add_asset_entry(entry("a", seg)).unwrap();

        let err = builder.seal().unwrap_err();
        assert!(matches!(
            err,
            BuildError::DanglingDependency {
                dependent: 0,
                guid: Guid(0xAB)
            }
        ));
    }

    #[test]
    fn test_missing_data_at_seal() {
        let mut builder = PakBuilder::new(PakSettings::default());
        builder.create_segment(8, SegmentFlags::DATA, 8).unwrap();
        let err = builder.seal().unwrap_err();
        assert!(matches!(err, BuildError::MissingData(0)));
    }

    #[test]
    fn test_dangling_pointer_at_seal() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let mut buffer = builder.create_buffer(16, SegmentFlags::HEADER, 8).unwrap();
        builder
            .write_pointer(&mut buffer, 0, PagePtr::new(0, 8))
            .unwrap();
        builder
            .write_pointer(&mut buffer, 8, PagePtr::new(5, 0))
            .unwrap();
        builder.add_buffer(buffer).unwrap();

        let errors = builder.validate();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            BuildError::DanglingPointer {
                segment: 0,
                offset: 8,
                target_segment: 5,
                target_offset: 0
            }
        ));
    }

    #[test]
    fn test_all_errors_collected() {
        let mut builder = PakBuilder::new(PakSettings::default());
        builder.create_segment(8, SegmentFlags::DATA, 8).unwrap();
        builder.register_descriptor(0, 3);
        builder.add_asset_relation(0, Guid(7)).unwrap();

        let err = builder.seal().unwrap_err();
        assert!(matches!(err, BuildError::Validation(_)));
        assert_eq!(err.errors().count(), 3);
    }

    #[test]
    fn test_guid_ref_writes_value() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let mut buffer = builder.create_buffer(8, SegmentFlags::DATA, 8).unwrap();
        builder
            .write_guid_ref(&mut buffer, 0, Guid(0x1122_3344_5566_7788))
            .unwrap();
        assert_eq!(
            buffer.as_slice(),
            &0x1122_3344_5566_7788u64.to_le_bytes()
        );
        builder.add_buffer(buffer).unwrap();
        assert!(builder.validate().is_empty());
    }
}
