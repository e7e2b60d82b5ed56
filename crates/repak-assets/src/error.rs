//! Error types for manifest reading, asset encoding and pak output.
//!
//! Errors are split by how the build reacts to them:
//! - [`ConfigError`] rejects one asset; the pipeline skips it and continues
//! - [`AssetError`] wraps a config error or a fatal engine or I/O failure
//! - [`PipelineError`] aborts the whole build

use repak_format::BuildError;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed or missing manifest input for one asset.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required field is absent
    #[error("Asset '{asset}': missing required field '{field}'")]
    MissingField {
        /// Asset path or position used in messages
        asset: String,
        /// Field name
        field: String,
    },

    /// Field is present but unusable
    #[error("Asset '{asset}': invalid field '{field}': {reason}")]
    InvalidField {
        /// Asset path or position used in messages
        asset: String,
        /// Field name
        field: String,
        /// Reason for rejection
        reason: String,
    },

    /// `$type` names no known encoder
    #[error("Asset '{asset}': unknown asset type '{kind}'")]
    UnknownType {
        /// Asset path or position used in messages
        asset: String,
        /// Type tag found in the manifest
        kind: String,
    },

    /// Material declares no texture slots
    #[error("Asset '{asset}': material has no textures")]
    NoTextures {
        /// Asset path
        asset: String,
    },

    /// Material definition file does not parse
    #[error("Asset '{asset}': invalid definition file {path}: {source}")]
    Definition {
        /// Asset path
        asset: String,
        /// Definition file
        path: PathBuf,
        /// Parser failure
        #[source]
        source: KeyValuesError,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidField`]
    pub fn invalid(asset: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            asset: asset.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ConfigError::MissingField`]
    pub fn missing(asset: &str, field: &str) -> Self {
        Self::MissingField {
            asset: asset.to_string(),
            field: field.to_string(),
        }
    }
}

/// KeyValues syntax errors, with 1-based line numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyValuesError {
    /// Quoted string never closed
    #[error("Unterminated string starting on line {line}")]
    UnterminatedString {
        /// Line of the opening quote
        line: usize,
    },

    /// Block still open at end of input
    #[error("Block opened on line {line} is never closed")]
    UnclosedBlock {
        /// Line of the opening brace
        line: usize,
    },

    /// Closing brace without an open block
    #[error("Unexpected '}}' on line {line}")]
    UnexpectedClose {
        /// Line of the brace
        line: usize,
    },

    /// Block opened without a key naming it
    #[error("Block on line {line} has no key")]
    MissingKey {
        /// Line of the opening brace
        line: usize,
    },

    /// Key not followed by a value or block
    #[error("Key '{key}' on line {line} has no value")]
    MissingValue {
        /// Dangling key
        key: String,
        /// Line of the key
        line: usize,
    },
}

/// Failure while encoding one asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Bad manifest input, the asset is skipped
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Engine consistency failure
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Input file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Fatal build failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Manifest file could not be read
    #[error("Failed to read manifest {path}: {source}")]
    ManifestRead {
        /// Manifest path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid JSON of the expected shape
    #[error("Invalid manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// Command-line or environment configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Asset failed with a non-recoverable error
    #[error("Asset '{asset}' failed: {source}")]
    Asset {
        /// Asset path
        asset: String,
        /// Encoder failure
        #[source]
        source: AssetError,
    },

    /// Pak validation or serialization failed
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Output could not be written
    #[error("Failed to write {path}: {source}")]
    Output {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for per-asset parsing
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias for encoders
pub type AssetResult<T> = std::result::Result<T, AssetError>;

/// Result alias for the build pipeline
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_messages() {
        let err = ConfigError::missing("texture/a", "width");
        assert_eq!(
            err.to_string(),
            "Asset 'texture/a': missing required field 'width'"
        );

        let err = ConfigError::invalid("texture/a", "height", "must be positive");
        assert_eq!(
            err.to_string(),
            "Asset 'texture/a': invalid field 'height': must be positive"
        );
    }

    #[test]
    fn test_asset_error_is_transparent() {
        let err = AssetError::from(ConfigError::NoTextures {
            asset: "m".to_string(),
        });
        assert_eq!(err.to_string(), "Asset 'm': material has no textures");
    }

    #[test]
    fn test_keyvalues_messages() {
        assert_eq!(
            KeyValuesError::UnexpectedClose { line: 3 }.to_string(),
            "Unexpected '}' on line 3"
        );
    }
}
