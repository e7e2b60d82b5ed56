//! Command-line configuration.
//!
//! Settings come from CLI arguments, then environment variables
//! (`REPAK_OUTPUT_DIR`, `REPAK_CREATED_TIME`, `REPAK_PAK_VERSION`), then the
//! manifest. A value given here overrides the manifest's.
//!
//! # Example
//!
//! ```no_run
//! use repak_assets::BuildConfig;
//!
//! let config = BuildConfig::from_args();
//! config.validate().expect("Invalid configuration");
//! println!("Building {}", config.manifest.display());
//! ```

use crate::error::{PipelineError, PipelineResult};
use crate::manifest::Manifest;
use clap::Parser;
use repak_format::PakSettings;
use std::path::PathBuf;

/// Build configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "repak",
    about = "Compile an asset manifest into an RPak container",
    version
)]
pub struct BuildConfig {
    /// Path to the JSON manifest
    pub manifest: PathBuf,

    /// Output directory (overrides the manifest's `outputDir`)
    #[arg(long, env = "REPAK_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Creation time stored in the header (FILETIME)
    #[arg(long, env = "REPAK_CREATED_TIME")]
    pub created_time: Option<u64>,

    /// Container version (overrides the manifest's `version`)
    #[arg(long, env = "REPAK_PAK_VERSION")]
    pub pak_version: Option<u16>,

    /// Log filter, e.g. `debug` or `repak_format=trace` (defaults to `RUST_LOG`, then `info`)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl BuildConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if:
    /// - The manifest file doesn't exist
    /// - The container version is zero
    /// - The log filter is empty
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.manifest.is_file() {
            return Err(PipelineError::InvalidConfig(format!(
                "manifest not found: {}",
                self.manifest.display()
            )));
        }

        if self.pak_version == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "pak version must be non-zero".to_string(),
            ));
        }

        if self
            .log_level
            .as_deref()
            .is_some_and(|level| level.trim().is_empty())
        {
            return Err(PipelineError::InvalidConfig(
                "log level must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Container settings for `manifest`, with CLI values taking precedence
    pub fn settings(&self, manifest: &Manifest) -> PipelineResult<PakSettings> {
        let defaults = PakSettings::default();
        let version = self
            .pak_version
            .or(manifest.version)
            .unwrap_or(defaults.version);
        if version == 0 {
            return Err(PipelineError::InvalidConfig(
                "pak version must be non-zero".to_string(),
            ));
        }

        Ok(PakSettings {
            version,
            created_time: self.created_time.unwrap_or(defaults.created_time),
            ..defaults
        })
    }

    /// Destination file for `manifest`
    pub fn output_path(&self, manifest: &Manifest) -> PathBuf {
        match &self.output_dir {
            Some(dir) => manifest.output_file(dir),
            None => manifest.output_path(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    fn manifest(version: Option<u16>) -> Manifest {
        let text = match version {
            Some(version) => format!(r#"{{ "name": "common", "version": {version} }}"#),
            None => r#"{ "name": "common" }"#.to_string(),
        };
        Manifest::parse(&text, Path::new("/maps")).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = BuildConfig::try_parse_from(["repak", "map.json"]).unwrap();
        let settings = config.settings(&manifest(None)).unwrap();
        assert_eq!(settings, PakSettings::default());
        assert_eq!(
            config.output_path(&manifest(None)),
            PathBuf::from("/maps/build/common.rpak")
        );
    }

    #[test]
    fn test_cli_overrides_manifest() {
        let config = BuildConfig::try_parse_from([
            "repak",
            "map.json",
            "--pak-version",
            "8",
            "--created-time",
            "1234",
            "--output-dir",
            "/out",
        ])
        .unwrap();
        let settings = config.settings(&manifest(Some(9))).unwrap();
        assert_eq!(settings.version, 8);
        assert_eq!(settings.created_time, 1234);
        assert_eq!(
            config.output_path(&manifest(None)),
            PathBuf::from("/out/common.rpak")
        );
    }

    #[test]
    fn test_manifest_version_used() {
        let config = BuildConfig::try_parse_from(["repak", "map.json"]).unwrap();
        assert_eq!(config.settings(&manifest(Some(9))).unwrap().version, 9);
        assert!(config.settings(&manifest(Some(0))).is_err());
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        std::fs::write(&path, r#"{ "name": "common" }"#).unwrap();
        let path = path.to_str().unwrap();

        let config = BuildConfig::try_parse_from(["repak", path]).unwrap();
        assert!(config.validate().is_ok());

        let config = BuildConfig::try_parse_from(["repak", path, "--pak-version", "0"]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));

        let config = BuildConfig::try_parse_from(["repak", "missing.json"]).unwrap();
        assert!(config.validate().is_err());
    }
}
