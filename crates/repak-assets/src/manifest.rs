//! Build manifest (map file) reader.
//!
//! A manifest is a JSON document naming the pak and listing its assets in
//! the order they are compiled:
//!
//! ```json
//! {
//!     "name": "common",
//!     "assetsDir": "assets",
//!     "outputDir": "build",
//!     "version": 7,
//!     "files": [
//!         { "$type": "txtr", "path": "texture/crate_col", "width": 256, "height": 256 },
//!         { "$type": "matl", "path": "crate", "textures": ["texture/crate_col"] }
//!     ]
//! }
//! ```
//!
//! Relative directories resolve against the manifest's own directory.

use crate::error::{ConfigError, ConfigResult, PipelineError, PipelineResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Default output directory, relative to the manifest
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// File extension of produced paks
pub const PAK_EXTENSION: &str = "rpak";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    name: String,
    assets_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    version: Option<u16>,
    #[serde(default)]
    files: Vec<AssetDescriptor>,
}

/// Parsed manifest with resolved directories
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Pak name, the output file stem
    pub name: String,
    /// Directory holding asset input files
    pub assets_dir: PathBuf,
    /// Directory receiving the pak
    pub output_dir: PathBuf,
    /// Container version requested by the manifest
    pub version: Option<u16>,
    /// Assets in declaration order
    pub files: Vec<AssetDescriptor>,
}

impl Manifest {
    /// Read and parse a manifest file
    ///
    /// # Errors
    ///
    /// Returns `ManifestRead` if the file cannot be read and
    /// `ManifestParse` if it is not a valid manifest.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base)
    }

    /// Parse manifest text, resolving directories against `base`
    pub fn parse(text: &str, base: &Path) -> PipelineResult<Self> {
        let raw: RawManifest = serde_json::from_str(text)?;
        if raw.name.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "manifest name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            name: raw.name,
            assets_dir: resolve(base, raw.assets_dir.as_deref().unwrap_or_else(|| Path::new(""))),
            output_dir: resolve(
                base,
                raw.output_dir
                    .as_deref()
                    .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR)),
            ),
            version: raw.version,
            files: raw.files,
        })
    }

    /// Destination file inside `output_dir`
    pub fn output_file(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.{PAK_EXTENSION}", self.name))
    }

    /// Destination file inside the manifest's output directory
    pub fn output_path(&self) -> PathBuf {
        self.output_file(&self.output_dir)
    }
}

fn resolve(base: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}

/// One asset entry of the manifest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetDescriptor {
    #[serde(rename = "$type", default)]
    kind: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl AssetDescriptor {
    /// Build a descriptor from parts
    pub fn new(kind: &str, path: &str, fields: Map<String, Value>) -> Self {
        Self {
            kind: Some(kind.to_string()),
            path: Some(path.to_string()),
            fields,
        }
    }

    /// Name used in messages: the path, or a placeholder when absent
    pub fn label(&self) -> &str {
        self.path.as_deref().unwrap_or("<unnamed>")
    }

    /// Asset type tag (`$type`)
    pub fn kind(&self) -> ConfigResult<&str> {
        self.kind
            .as_deref()
            .ok_or_else(|| ConfigError::missing(self.label(), "$type"))
    }

    /// Asset path
    pub fn path(&self) -> ConfigResult<&str> {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => Ok(path),
            Some(_) => Err(ConfigError::invalid(self.label(), "path", "must not be empty")),
            None => Err(ConfigError::missing(self.label(), "path")),
        }
    }

    /// Check if a field is present
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Optional string field
    pub fn str_field(&self, field: &str) -> ConfigResult<Option<&str>> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(other) => Err(self.wrong_type(field, "a string", other)),
        }
    }

    /// Optional unsigned integer field that must fit `T`
    pub fn uint_field<T: TryFrom<u64>>(&self, field: &str) -> ConfigResult<Option<T>> {
        let Some(value) = self.fields.get(field) else {
            return Ok(None);
        };
        let number = value
            .as_u64()
            .ok_or_else(|| self.wrong_type(field, "an unsigned integer", value))?;
        T::try_from(number).map(Some).map_err(|_| {
            ConfigError::invalid(
                self.label(),
                field,
                format!("{number} is out of range"),
            )
        })
    }

    /// Required unsigned integer field
    pub fn required_uint<T: TryFrom<u64>>(&self, field: &str) -> ConfigResult<T> {
        self.uint_field(field)?
            .ok_or_else(|| ConfigError::missing(self.label(), field))
    }

    /// Optional array of strings
    pub fn string_array(&self, field: &str) -> ConfigResult<Option<Vec<String>>> {
        let Some(value) = self.fields.get(field) else {
            return Ok(None);
        };
        let Value::Array(items) = value else {
            return Err(self.wrong_type(field, "an array of strings", value));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.clone()),
                other => Err(self.wrong_type(field, "an array of strings", other)),
            })
            .collect::<ConfigResult<Vec<_>>>()
            .map(Some)
    }

    fn wrong_type(&self, field: &str, expected: &str, found: &Value) -> ConfigError {
        ConfigError::invalid(self.label(), field, format!("expected {expected}, found {found}"))
    }
}
