//! Per-type asset encoders.
//!
//! Every encoder works in two phases. [`AssetEncoder::parse`] turns a
//! manifest entry into a validated definition without touching the pak, so
//! a rejected asset leaves no partial state behind. [`AssetEncoder::emit`]
//! then writes the definition into the [`PakBuilder`]; failures there are
//! consistency errors and abort the build.

pub mod material;
pub mod texture;

use crate::error::{AssetError, AssetResult, ConfigError};
use crate::manifest::AssetDescriptor;
use repak_format::{AssetKind, PakBuilder};
use std::fmt;
use std::path::{Path, PathBuf};

pub use material::{MaterialDefinition, MaterialEncoder, MaterialType};
pub use texture::{TextureDefinition, TextureEncoder};

/// Loader hint stored in every compiled asset entry
pub const DEFAULT_USE_HINT: u16 = 8;

/// Inputs shared by every encoder of one build
#[derive(Debug, Clone)]
pub struct EncodeContext {
    /// Directory holding asset input files
    pub assets_dir: PathBuf,
}

impl EncodeContext {
    /// Create a context rooted at `assets_dir`
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    /// Resolve an input file against the assets directory
    pub fn input_path(&self, relative: &str) -> PathBuf {
        self.assets_dir.join(relative)
    }

    /// Read an input file
    pub fn read(&self, path: &Path) -> AssetResult<Vec<u8>> {
        std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Encoder for one asset type
pub trait AssetEncoder {
    /// Validated asset description
    type Definition;

    /// Type tag written to the asset directory
    const KIND: AssetKind;

    /// Validate a manifest entry
    ///
    /// # Errors
    ///
    /// `ConfigError` for bad manifest input, `Io` for unreadable input files.
    fn parse(descriptor: &AssetDescriptor, ctx: &EncodeContext) -> AssetResult<Self::Definition>;

    /// Write the asset into the pak, returning its directory index
    ///
    /// # Errors
    ///
    /// Any engine `BuildError`.
    fn emit(definition: &Self::Definition, builder: &mut PakBuilder) -> AssetResult<u32>;
}

/// Closed set of supported asset types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    /// Material (`matl`)
    Material,
    /// Texture (`txtr`)
    Texture,
}

impl AssetType {
    /// Every supported type
    pub const ALL: [Self; 2] = [Self::Material, Self::Texture];

    /// Look up a manifest `$type` tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Manifest tag of this type
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Material => "matl",
            Self::Texture => "txtr",
        }
    }

    /// Directory type tag of this type
    pub const fn kind(self) -> AssetKind {
        match self {
            Self::Material => MaterialEncoder::KIND,
            Self::Texture => TextureEncoder::KIND,
        }
    }

    /// Resolve the type of a manifest entry
    pub fn of(descriptor: &AssetDescriptor) -> AssetResult<Self> {
        let tag = descriptor.kind()?;
        Self::from_tag(tag).ok_or_else(|| {
            AssetError::Config(ConfigError::UnknownType {
                asset: descriptor.label().to_string(),
                kind: tag.to_string(),
            })
        })
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parse and emit one manifest entry
///
/// Parsing completes before the builder is touched.
pub fn encode(
    descriptor: &AssetDescriptor,
    ctx: &EncodeContext,
    builder: &mut PakBuilder,
) -> AssetResult<u32> {
    match AssetType::of(descriptor)? {
        AssetType::Material => encode_with::<MaterialEncoder>(descriptor, ctx, builder),
        AssetType::Texture => encode_with::<TextureEncoder>(descriptor, ctx, builder),
    }
}

fn encode_with<E: AssetEncoder>(
    descriptor: &AssetDescriptor,
    ctx: &EncodeContext,
    builder: &mut PakBuilder,
) -> AssetResult<u32> {
    let definition = E::parse(descriptor, ctx)?;
    E::emit(&definition, builder)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_type_tags() {
        assert_eq!(AssetType::from_tag("matl"), Some(AssetType::Material));
        assert_eq!(AssetType::from_tag("txtr"), Some(AssetType::Texture));
        assert_eq!(AssetType::from_tag("rui"), None);
        assert_eq!(AssetType::Material.kind(), AssetKind::MATERIAL);
        assert_eq!(AssetType::Texture.to_string(), "txtr");
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let descriptor = AssetDescriptor::new("shdr", "shader/a", Map::new());
        let err = AssetType::of(&descriptor).unwrap_err();
        assert!(matches!(
            err,
            AssetError::Config(ConfigError::UnknownType { ref kind, .. }) if kind == "shdr"
        ));
    }
}
