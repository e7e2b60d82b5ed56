//! Assembly engine for RPak asset containers
//!
//! This crate turns per-asset byte buffers into one RPak file. Encoders
//! reserve segments, fill them, mark relocatable slots and declare
//! dependencies; the serializer lays the segments out, patches every
//! pointer and writes the container.
//!
//! # Components
//!
//! - **Hashing**: [`hash_path`] and [`Guid`], the path hash used as the asset key
//! - **Segments**: [`SegmentTable`] allocation and [`SegmentBuffer`] checked writes
//! - **Relocations**: pointer and GUID descriptor lists
//! - **Relations**: dependency edges with forward-reference resolution
//! - **Directory**: [`AssetEntry`] arena addressed by index or GUID
//! - **Serializer**: [`SealedPak`] layout, patching and output
//!
//! # Lifecycle
//!
//! [`PakBuilder`] is the open pak. [`PakBuilder::seal`] validates every
//! registration and returns a [`SealedPak`], which can only be written.
//!
//! # Examples
//!
//! ```
//! use repak_format::{AssetEntry, AssetKind, Guid, PakBuilder, PakSettings, SegmentFlags};
//!
//! let mut builder = PakBuilder::new(PakSettings::default());
//!
//! let mut header = builder.create_buffer(16, SegmentFlags::HEADER, 8)?;
//! let mut data = builder.create_buffer(8, SegmentFlags::DATA, 16)?;
//! let name = data.ptr(0);
//! data.write_cstr(0, "logo")?;
//! builder.write_pointer(&mut header, 0, name)?;
//!
//! let entry = AssetEntry::new(
//!     Guid::from_path("texture/logo.rpak"),
//!     AssetKind::TEXTURE,
//!     header.ptr(0),
//!     16,
//!     data.ptr(0),
//!     8,
//! );
//! builder.add_buffer(header)?;
//! builder.add_buffer(data)?;
//! builder.add_asset_entry(entry)?;
//!
//! let bytes = builder.seal()?.serialize()?;
//! assert_eq!(&bytes[..4], b"RPak");
//! # Ok::<(), repak_format::BuildError>(())
//! ```

#![warn(missing_docs)]

pub mod asset;
pub mod buffer;
pub mod builder;
pub mod error;
pub mod hash;
pub mod raw_block;
pub mod relation;
pub mod relocation;
pub mod segment;
pub mod serializer;

pub use asset::{AssetDirectory, AssetEntry, AssetKind};
pub use buffer::{PagePtr, SegmentBuffer, align_up};
pub use builder::{PakBuilder, PakSettings};
pub use error::{BuildError, Result};
pub use hash::{Guid, hash_path};
pub use raw_block::{RawBlockRegistry, RawDataBlock};
pub use relation::{RelationEdge, RelationGraph, RelationTarget};
pub use relocation::{PageDescriptor, RelocationRegistry};
pub use segment::{MAX_SEGMENTS, Segment, SegmentFlags, SegmentInfo, SegmentTable};
pub use serializer::SealedPak;
pub use serializer::header::{AssetRecord, PakHeader, SegmentRecord};
