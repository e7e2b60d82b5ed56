//! Texture (`txtr`) encoder.
//!
//! Header layout (0x20 bytes):
//! ```text
//! 0x00 u64  asset GUID
//! 0x08 ptr  name
//! 0x10 u16  width
//! 0x12 u16  height
//! 0x14 u16  depth (1)
//! 0x16 u16  pixel format
//! 0x18 u32  pixel data size
//! 0x1C u8   mip count
//! 0x1D u8   array size (1)
//! ```
//! Pixel data is copied verbatim into a client-only segment.

use super::{AssetEncoder, DEFAULT_USE_HINT, EncodeContext};
use crate::error::{AssetResult, ConfigError};
use crate::manifest::AssetDescriptor;
use repak_format::{
    AssetEntry, AssetKind, Guid, PagePtr, PakBuilder, RawDataBlock, SegmentFlags,
};
use tracing::debug;

/// Texture format version
pub const TEXTURE_VERSION: u32 = 8;

/// Size of the texture header record
pub const TEXTURE_HEADER_SIZE: u32 = 0x20;

/// Extension of raw pixel files
pub const RAW_EXTENSION: &str = "raw";

/// Validated texture with its pixel data loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDefinition {
    /// Asset path from the manifest
    pub path: String,
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Pixel format identifier
    pub format: u16,
    /// Number of mip levels in `pixels`
    pub mips: u8,
    /// Raw pixel bytes
    pub pixels: Vec<u8>,
}

impl TextureDefinition {
    /// Asset GUID
    pub fn guid(&self) -> Guid {
        Guid::from_path(&format!("{}.rpak", self.path))
    }
}

/// Encoder for textures
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureEncoder;

impl AssetEncoder for TextureEncoder {
    type Definition = TextureDefinition;

    const KIND: AssetKind = AssetKind::TEXTURE;

    fn parse(descriptor: &AssetDescriptor, ctx: &EncodeContext) -> AssetResult<TextureDefinition> {
        let asset = descriptor.path()?;
        let width: u16 = descriptor.required_uint("width")?;
        let height: u16 = descriptor.required_uint("height")?;
        if width == 0 || height == 0 {
            return Err(ConfigError::invalid(asset, "width", "dimensions must be non-zero").into());
        }
        let format = descriptor.uint_field("format")?.unwrap_or(0);
        let mips = descriptor.uint_field("mips")?.unwrap_or(1);
        if mips == 0 {
            return Err(ConfigError::invalid(asset, "mips", "must be at least 1").into());
        }

        let file = match descriptor.str_field("file")? {
            Some(file) => ctx.input_path(file),
            None => ctx.input_path(&format!("{asset}.{RAW_EXTENSION}")),
        };
        let pixels = ctx.read(&file)?;
        if pixels.is_empty() {
            let reason = format!("{} is empty", file.display());
            return Err(ConfigError::invalid(asset, "file", reason).into());
        }
        if u32::try_from(pixels.len()).is_err() {
            return Err(ConfigError::invalid(asset, "file", "pixel data exceeds 4 GiB").into());
        }

        Ok(TextureDefinition {
            path: asset.to_string(),
            width,
            height,
            format,
            mips,
            pixels,
        })
    }

    fn emit(definition: &TextureDefinition, builder: &mut PakBuilder) -> AssetResult<u32> {
        let guid = definition.guid();

        let mut header =
            builder.create_buffer(u64::from(TEXTURE_HEADER_SIZE), SegmentFlags::HEADER, 8)?;
        let mut name =
            builder.create_buffer(definition.path.len() as u64 + 1, SegmentFlags::DATA, 8)?;
        let pixels = builder.create_segment(
            definition.pixels.len() as u64,
            SegmentFlags::DATA | SegmentFlags::CLIENT_ONLY,
            16,
        )?;

        name.write_cstr(0, &definition.path)?;
        header.write_u64(0x00, guid.value())?;
        builder.write_pointer(&mut header, 0x08, name.ptr(0))?;
        header.write_u16(0x10, definition.width)?;
        header.write_u16(0x12, definition.height)?;
        header.write_u16(0x14, 1)?;
        header.write_u16(0x16, definition.format)?;
        header.write_u32(0x18, definition.pixels.len() as u32)?;
        header.write_u8(0x1C, definition.mips)?;
        header.write_u8(0x1D, 1)?;

        let mut entry = AssetEntry::new(
            guid,
            Self::KIND,
            header.ptr(0),
            TEXTURE_HEADER_SIZE,
            PagePtr::new(pixels.index, 0),
            TEXTURE_VERSION,
        );
        entry.use_hint = DEFAULT_USE_HINT;

        builder.add_buffer(header)?;
        builder.add_buffer(name)?;
        builder.add_raw_data_block(RawDataBlock::new(pixels.index, definition.pixels.clone()))?;
        let index = builder.add_asset_entry(entry)?;

        debug!(
            "Encoded texture '{}' as {}: {}x{}, {} bytes",
            definition.path,
            guid,
            definition.width,
            definition.height,
            definition.pixels.len()
        );
        Ok(index)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use repak_format::PakSettings;
    use serde_json::json;

    fn descriptor(fields: serde_json::Value) -> AssetDescriptor {
        AssetDescriptor::new(
            "txtr",
            "texture/crate_col",
            fields.as_object().cloned().unwrap(),
        )
    }

    fn assets() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("texture")).unwrap();
        std::fs::write(dir.path().join("texture/crate_col.raw"), [7u8; 48]).unwrap();
        dir
    }

    #[test]
    fn test_parse_reads_default_file() {
        let dir = assets();
        let definition = TextureEncoder::parse(
            &descriptor(json!({ "width": 4, "height": 4 })),
            &EncodeContext::new(dir.path()),
        )
        .unwrap();
        assert_eq!(definition.pixels.len(), 48);
        assert_eq!(definition.mips, 1);
        assert_eq!(definition.format, 0);
        assert_eq!(definition.guid(), Guid::from_path("texture/crate_col.rpak"));
    }

    #[test]
    fn test_missing_dimensions() {
        let dir = assets();
        let err = TextureEncoder::parse(
            &descriptor(json!({ "width": 4 })),
            &EncodeContext::new(dir.path()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AssetError::Config(ConfigError::MissingField { ref field, .. }) if field == "height"
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TextureEncoder::parse(
            &descriptor(json!({ "width": 4, "height": 4 })),
            &EncodeContext::new(dir.path()),
        )
        .unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn test_emit() {
        let definition = TextureDefinition {
            path: "texture/a".to_string(),
            width: 2,
            height: 2,
            format: 3,
            mips: 1,
            pixels: vec![1, 2, 3, 4],
        };
        let mut builder = PakBuilder::new(PakSettings::default());
        assert_eq!(TextureEncoder::emit(&definition, &mut builder).unwrap(), 0);

        let entry = builder.asset_by_guid(definition.guid()).unwrap();
        assert_eq!(entry.page_end, 3);
        assert_eq!(entry.data.segment, 2);
        assert_eq!(entry.kind, AssetKind::TEXTURE);
        assert_eq!(entry.uses_count, 0);

        let sealed = builder.seal().unwrap();
        assert_eq!(sealed.segments()[2].flags, 0x5);
        let pixels_at = sealed.segment_offset(2).unwrap() as usize;
        let bytes = sealed.serialize().unwrap();
        assert_eq!(&bytes[pixels_at..pixels_at + 4], &[1, 2, 3, 4]);
    }
}
