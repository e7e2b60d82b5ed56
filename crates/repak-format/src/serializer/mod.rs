//! Page layout, pointer patching and container output
//!
//! A [`SealedPak`] is produced only by [`PakBuilder::seal`] after the
//! validation pass, so every registration it holds is consistent. Writing
//! consumes it.
//!
//! [`PakBuilder::seal`]: crate::builder::PakBuilder::seal

pub mod header;

use crate::asset::AssetDirectory;
use crate::buffer::{PagePtr, SLOT_SIZE, align_up};
use crate::builder::PakSettings;
use crate::error::{BuildError, Result};
use crate::raw_block::RawBlockRegistry;
use crate::relation::RelationGraph;
use crate::relocation::{PageDescriptor, RelocationRegistry};
use crate::segment::SegmentTable;
use binrw::BinWrite;
use binrw::io::{Cursor, Seek, Write};
use header::{
    ASSET_RECORD_SIZE, AssetRecord, DESCRIPTOR_SIZE, HEADER_SIZE, PakHeader,
    RELATION_SIZE, RPAK_MAGIC, SEGMENT_RECORD_SIZE, SegmentRecord,
};
use tracing::{debug, info};

/// Validated pak with its final page layout
#[derive(Debug)]
pub struct SealedPak {
    header: PakHeader,
    segments: Vec<SegmentRecord>,
    assets: Vec<AssetRecord>,
    pointers: Vec<PageDescriptor>,
    guids: Vec<PageDescriptor>,
    relations: Vec<u32>,
    pages: Vec<Vec<u8>>,
}

impl SealedPak {
    pub(crate) fn new(
        settings: PakSettings,
        segments: SegmentTable,
        raw_blocks: RawBlockRegistry,
        relocations: RelocationRegistry,
        relations: RelationGraph,
        assets: AssetDirectory,
    ) -> Self {
        let (pointers, guids) = relocations.into_parts();
        let assets: Vec<AssetRecord> = assets.into_entries().iter().map(AssetRecord::from).collect();
        // Each entry names the asset that owns the edge, whatever the target.
        let relations: Vec<u32> = relations.edges().iter().map(|edge| edge.dependent).collect();

        let data_offset = HEADER_SIZE
            + segments.len() as u64 * SEGMENT_RECORD_SIZE
            + assets.len() as u64 * ASSET_RECORD_SIZE
            + (pointers.len() + guids.len()) as u64 * DESCRIPTOR_SIZE
            + relations.len() as u64 * RELATION_SIZE;

        let mut cursor = data_offset;
        let records: Vec<SegmentRecord> = segments
            .iter()
            .map(|segment| {
                let file_offset = align_up(cursor, u64::from(segment.alignment));
                cursor = file_offset + segment.size;
                debug!(
                    "Placed segment {} ({}) at {:#x}, {} bytes",
                    segment.index, segment.flags, file_offset, segment.size
                );
                SegmentRecord {
                    flags: segment.flags.value,
                    alignment: segment.alignment,
                    size: segment.size,
                    file_offset,
                }
            })
            .collect();

        let mut blocks = raw_blocks.into_blocks();
        let pages = segments
            .iter()
            .map(|segment| blocks.remove(&segment.index).unwrap_or_default())
            .collect();

        let header = PakHeader {
            magic: RPAK_MAGIC,
            version: settings.version,
            flags: settings.flags,
            created_time: settings.created_time,
            file_size: cursor,
            data_offset,
            segment_count: records.len() as u32,
            asset_count: assets.len() as u32,
            descriptor_count: pointers.len() as u32,
            guid_descriptor_count: guids.len() as u32,
            relation_count: relations.len() as u32,
            reserved: 0,
        };

        info!(
            "Sealed pak: {} segments, {} assets, {} pointers, {} guid refs, {} relations, {} bytes",
            header.segment_count,
            header.asset_count,
            header.descriptor_count,
            header.guid_descriptor_count,
            header.relation_count,
            header.file_size
        );

        Self {
            header,
            segments: records,
            assets,
            pointers,
            guids,
            relations,
            pages,
        }
    }

    /// File header that will be written
    pub fn header(&self) -> &PakHeader {
        &self.header
    }

    /// Segment directory with final file offsets
    pub fn segments(&self) -> &[SegmentRecord] {
        &self.segments
    }

    /// Asset directory records
    pub fn assets(&self) -> &[AssetRecord] {
        &self.assets
    }

    /// Relation array, one dependency index per edge
    pub fn relations(&self) -> &[u32] {
        &self.relations
    }

    /// Final file offset of a segment
    pub fn segment_offset(&self, segment: u32) -> Option<u64> {
        self.segments
            .get(segment as usize)
            .map(|record| record.file_offset)
    }

    /// Total size of the container in bytes
    pub fn file_size(&self) -> u64 {
        self.header.file_size
    }

    /// Rewrite every pointer placeholder to its final file offset
    fn patch_pointers(&mut self) -> Result<()> {
        for desc in &self.pointers {
            let dangling = |target: PagePtr| BuildError::DanglingPointer {
                segment: desc.segment,
                offset: desc.offset,
                target_segment: target.segment,
                target_offset: target.offset,
            };
            let out_of_bounds = BuildError::DescriptorOutOfBounds {
                segment: desc.segment,
                offset: desc.offset,
            };

            let start = desc.offset as usize;
            let slot = self
                .pages
                .get_mut(desc.segment as usize)
                .and_then(|page| page.get_mut(start..start + SLOT_SIZE))
                .ok_or(out_of_bounds)?;

            let mut placeholder = [0u8; SLOT_SIZE];
            placeholder.copy_from_slice(slot);
            let target = PagePtr::from_bytes(placeholder);

            let base = self
                .segments
                .get(target.segment as usize)
                .map(|record| record.file_offset)
                .ok_or_else(|| dangling(target))?;
            slot.copy_from_slice(&(base + u64::from(target.offset)).to_le_bytes());
        }
        Ok(())
    }

    /// Write the complete container
    ///
    /// # Errors
    /// I/O failures of `writer`
    pub fn write_to<W: Write + Seek>(mut self, writer: &mut W) -> Result<()> {
        self.patch_pointers()?;

        self.header.write(writer)?;
        self.segments.write_le(writer)?;
        self.assets.write_le(writer)?;
        self.pointers.write_le(writer)?;
        self.guids.write_le(writer)?;
        self.relations.write_le(writer)?;

        let mut position = self.header.data_offset;
        for (record, page) in self.segments.iter().zip(&self.pages) {
            let padding = record.file_offset - position;
            writer.write_all(&vec![0u8; padding as usize])?;
            writer.write_all(page)?;
            position = record.file_offset + page.len() as u64;
        }

        writer.flush()?;
        Ok(())
    }

    /// Produce the container bytes
    pub fn serialize(self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.header.file_size as usize);
        self.write_to(&mut Cursor::new(&mut bytes))?;
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use crate::builder::{PakBuilder, PakSettings};
    use crate::buffer::PagePtr;
    use crate::segment::SegmentFlags;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_pak() {
        let sealed = PakBuilder::new(PakSettings::default()).seal().unwrap();
        assert_eq!(sealed.file_size(), 56);
        let bytes = sealed.serialize().unwrap();
        assert_eq!(bytes.len(), 56);
        assert_eq!(&bytes[0..4], b"RPak");
        assert_eq!(&bytes[0x10..0x18], &56u64.to_le_bytes());
    }

    #[test]
    fn test_alignment_is_per_segment() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let first = builder.create_buffer(10, SegmentFlags::DATA, 64).unwrap();
        let second = builder.create_buffer(4, SegmentFlags::DATA, 16).unwrap();
        builder.add_buffer(first).unwrap();
        builder.add_buffer(second).unwrap();
        let sealed = builder.seal().unwrap();

        // 56 + 2 * 24 = 104, aligned to 64 -> 128; 128 + 10 = 138 -> 144
        assert_eq!(sealed.segment_offset(0), Some(128));
        assert_eq!(sealed.segment_offset(1), Some(144));
        assert_eq!(sealed.file_size(), 148);
    }

    #[test]
    fn test_pointer_patched_to_file_offset() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let mut header = builder.create_buffer(8, SegmentFlags::HEADER, 8).unwrap();
        let mut data = builder.create_buffer(32, SegmentFlags::DATA, 16).unwrap();
        data.write_cstr(4, "hi").unwrap();
        builder
            .write_pointer(&mut header, 0, PagePtr::new(data.index(), 4))
            .unwrap();
        builder.add_buffer(header).unwrap();
        builder.add_buffer(data).unwrap();

        let sealed = builder.seal().unwrap();
        let header_at = sealed.segment_offset(0).unwrap() as usize;
        let data_at = sealed.segment_offset(1).unwrap();
        let bytes = sealed.serialize().unwrap();

        let patched = u64::from_le_bytes(bytes[header_at..header_at + 8].try_into().unwrap());
        assert_eq!(patched, data_at + 4);
        assert_eq!(&bytes[patched as usize..patched as usize + 3], b"hi\0");
    }

    #[test]
    fn test_guid_slots_untouched() {
        let mut builder = PakBuilder::new(PakSettings::default());
        let mut data = builder.create_buffer(8, SegmentFlags::DATA, 8).unwrap();
        builder
            .write_guid_ref(&mut data, 0, crate::hash::Guid(0xDEAD_BEEF))
            .unwrap();
        builder.add_buffer(data).unwrap();

        let sealed = builder.seal().unwrap();
        let at = sealed.segment_offset(0).unwrap() as usize;
        let bytes = sealed.serialize().unwrap();
        assert_eq!(&bytes[at..at + 8], &0xDEAD_BEEFu64.to_le_bytes());

        // header + one segment record, then the GUID descriptor table
        let table = 56 + 24;
        assert_eq!(&bytes[table..table + 8], &[0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[0x2C..0x30], &1u32.to_le_bytes());
    }
}
