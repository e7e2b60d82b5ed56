//! Relocation bookkeeping
//!
//! Two lists of slot locations are kept:
//! - **pointer descriptors** mark 8-byte slots holding a [`PagePtr`]
//!   placeholder that the serializer rewrites to a file offset
//! - **GUID descriptors** mark 8-byte slots holding an asset GUID that the
//!   runtime loader resolves; the serializer lists them but never rewrites
//!
//! Registration does no validation because the target buffers may not exist
//! yet. [`RelocationRegistry::validate`] runs during sealing.
//!
//! [`PagePtr`]: crate::buffer::PagePtr

use crate::buffer::SLOT_SIZE;
use crate::error::BuildError;
use crate::segment::SegmentTable;
use binrw::BinWrite;
use std::collections::HashSet;

/// Location of a relocatable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BinWrite)]
#[bw(little)]
pub struct PageDescriptor {
    /// Segment holding the slot
    pub segment: u32,
    /// Byte offset of the slot inside the segment
    pub offset: u32,
}

impl PageDescriptor {
    /// Create a descriptor
    pub const fn new(segment: u32, offset: u32) -> Self {
        Self { segment, offset }
    }
}

/// Pointer and GUID descriptor lists, in registration order
#[derive(Debug, Default)]
pub struct RelocationRegistry {
    pointers: Vec<PageDescriptor>,
    guids: Vec<PageDescriptor>,
}

impl RelocationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pointer slot
    pub fn register_descriptor(&mut self, segment: u32, offset: u32) {
        self.pointers.push(PageDescriptor::new(segment, offset));
    }

    /// Record a GUID slot
    pub fn register_guid_descriptor(&mut self, segment: u32, offset: u32) {
        self.guids.push(PageDescriptor::new(segment, offset));
    }

    /// Pointer descriptors
    pub fn pointers(&self) -> &[PageDescriptor] {
        &self.pointers
    }

    /// GUID descriptors
    pub fn guids(&self) -> &[PageDescriptor] {
        &self.guids
    }

    /// Check every slot against the frozen segment table
    ///
    /// Reports slots outside their segment, slots not on an 8-byte boundary,
    /// and slots registered more than once across both lists. With every slot
    /// 8 bytes wide and 8-aligned, two distinct slots can never overlap.
    pub fn validate(&self, segments: &SegmentTable) -> Vec<BuildError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for desc in self.pointers.iter().chain(self.guids.iter()) {
            let fits = segments.get(desc.segment).is_some_and(|segment| {
                u64::from(desc.offset) + SLOT_SIZE as u64 <= segment.size
            });
            if !fits {
                errors.push(BuildError::DescriptorOutOfBounds {
                    segment: desc.segment,
                    offset: desc.offset,
                });
            } else if desc.offset as usize % SLOT_SIZE != 0 {
                errors.push(BuildError::MisalignedDescriptor {
                    segment: desc.segment,
                    offset: desc.offset,
                });
            }

            if !seen.insert(*desc) {
                errors.push(BuildError::DuplicateDescriptor {
                    segment: desc.segment,
                    offset: desc.offset,
                });
            }
        }

        errors
    }

    /// Release both lists
    pub(crate) fn into_parts(self) -> (Vec<PageDescriptor>, Vec<PageDescriptor>) {
        (self.pointers, self.guids)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::segment::SegmentFlags;
    use binrw::io::Cursor;

    fn segments() -> SegmentTable {
        let mut table = SegmentTable::new();
        table.create(16, SegmentFlags::HEADER, 8).unwrap();
        table
    }

    #[test]
    fn test_registration_order() {
        let mut registry = RelocationRegistry::new();
        registry.register_descriptor(0, 8);
        registry.register_guid_descriptor(0, 0);
        registry.register_descriptor(0, 0);
        assert_eq!(
            registry.pointers(),
            &[PageDescriptor::new(0, 8), PageDescriptor::new(0, 0)]
        );
        assert_eq!(registry.guids(), &[PageDescriptor::new(0, 0)]);
    }

    #[test]
    fn test_registration_does_not_validate() {
        let mut registry = RelocationRegistry::new();
        registry.register_descriptor(42, 1000);
        assert_eq!(registry.pointers().len(), 1);
    }

    #[test]
    fn test_validate_bounds() {
        let mut registry = RelocationRegistry::new();
        registry.register_descriptor(0, 8);
        registry.register_descriptor(0, 12);
        registry.register_guid_descriptor(3, 0);

        let errors = registry.validate(&segments());
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors[0],
            BuildError::DescriptorOutOfBounds {
                segment: 0,
                offset: 12
            }
        ));
        assert!(matches!(
            errors[1],
            BuildError::DescriptorOutOfBounds {
                segment: 3,
                offset: 0
            }
        ));
    }

    #[test]
    fn test_validate_alignment() {
        let mut registry = RelocationRegistry::new();
        registry.register_guid_descriptor(0, 4);
        registry.register_guid_descriptor(0, 8);
        let errors = registry.validate(&segments());
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            BuildError::MisalignedDescriptor {
                segment: 0,
                offset: 4
            }
        ));
    }

    #[test]
    fn test_half_overlapping_slots_rejected() {
        let mut registry = RelocationRegistry::new();
        registry.register_descriptor(0, 0);
        registry.register_guid_descriptor(0, 4);
        let errors = registry.validate(&segments());
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            BuildError::MisalignedDescriptor {
                segment: 0,
                offset: 4
            }
        ));
    }

    #[test]
    fn test_validate_duplicates_across_lists() {
        let mut registry = RelocationRegistry::new();
        registry.register_descriptor(0, 0);
        registry.register_guid_descriptor(0, 0);
        let errors = registry.validate(&segments());
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            BuildError::DuplicateDescriptor {
                segment: 0,
                offset: 0
            }
        ));
    }

    #[test]
    fn test_descriptor_layout() {
        let mut buffer = Vec::new();
        PageDescriptor::new(0x0102, 0x30)
            .write(&mut Cursor::new(&mut buffer))
            .expect("Operation should succeed");
        assert_eq!(buffer, vec![0x02, 0x01, 0, 0, 0x30, 0, 0, 0]);
    }
}
