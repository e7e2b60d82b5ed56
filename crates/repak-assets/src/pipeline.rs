//! Build pipeline: manifest in, pak bytes out.
//!
//! Assets are encoded strictly in manifest order. An asset rejected for bad
//! input is logged, recorded in the [`BuildReport`] and skipped; any other
//! failure aborts the build before anything is written.

use crate::config::BuildConfig;
use crate::encoders::{self, EncodeContext};
use crate::error::{AssetError, PipelineError, PipelineResult};
use crate::manifest::Manifest;
use crate::output::write_atomic;
use repak_format::{PakBuilder, PakSettings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Asset left out of the pak because of bad input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAsset {
    /// Asset path, or a placeholder when the entry has none
    pub asset: String,
    /// Rejection message
    pub reason: String,
}

/// Outcome of one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Pak name from the manifest
    pub name: String,
    /// Number of assets written
    pub assets: usize,
    /// Assets rejected during encoding, in manifest order
    pub skipped: Vec<SkippedAsset>,
    /// Size of the pak in bytes
    pub size: u64,
    /// Destination file, once written
    pub output: Option<PathBuf>,
}

/// Serialized pak with its report
#[derive(Debug, Clone)]
pub struct BuiltPak {
    /// Complete container bytes
    pub bytes: Vec<u8>,
    /// Build summary
    pub report: BuildReport,
}

/// Encode every manifest entry and serialize the pak in memory
///
/// # Errors
///
/// Returns `Asset` for I/O or engine failures while encoding and `Build`
/// if the finished pak fails validation.
pub fn build_pak(manifest: &Manifest, settings: PakSettings) -> PipelineResult<BuiltPak> {
    let ctx = EncodeContext::new(&manifest.assets_dir);
    let mut builder = PakBuilder::new(settings);
    let mut skipped = Vec::new();

    debug!(
        "Building '{}' from {} manifest entries",
        manifest.name,
        manifest.files.len()
    );

    for descriptor in &manifest.files {
        match encoders::encode(descriptor, &ctx, &mut builder) {
            Ok(index) => debug!("Asset '{}' stored at index {}", descriptor.label(), index),
            Err(AssetError::Config(err)) => {
                warn!("Skipping asset: {}", err);
                skipped.push(SkippedAsset {
                    asset: descriptor.label().to_string(),
                    reason: err.to_string(),
                });
            }
            Err(source) => {
                return Err(PipelineError::Asset {
                    asset: descriptor.label().to_string(),
                    source,
                });
            }
        }
    }

    let assets = builder.asset_count();
    let bytes = builder.seal()?.serialize()?;

    Ok(BuiltPak {
        report: BuildReport {
            name: manifest.name.clone(),
            assets,
            skipped,
            size: bytes.len() as u64,
            output: None,
        },
        bytes,
    })
}

/// Build the pak and write it atomically to `path`
///
/// Nothing is written unless the whole build succeeds.
pub fn write_pak(
    manifest: &Manifest,
    settings: PakSettings,
    path: &Path,
) -> PipelineResult<BuildReport> {
    let BuiltPak { bytes, mut report } = build_pak(manifest, settings)?;
    write_atomic(path, &bytes)?;
    report.output = Some(path.to_path_buf());

    info!(
        "Wrote {} ({} assets, {} skipped, {} bytes)",
        path.display(),
        report.assets,
        report.skipped.len(),
        report.size
    );
    Ok(report)
}

/// Load the configured manifest, apply overrides and build
pub fn run(config: &BuildConfig) -> PipelineResult<BuildReport> {
    let manifest = Manifest::load(&config.manifest)?;
    let settings = config.settings(&manifest)?;
    let path = config.output_path(&manifest);
    write_pak(&manifest, settings, &path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manifest(dir: &Path, files: &str) -> Manifest {
        let text = format!(r#"{{ "name": "common", "files": {files} }}"#);
        Manifest::parse(&text, dir).unwrap()
    }

    #[test]
    fn test_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let built = build_pak(&manifest(dir.path(), "[]"), PakSettings::default()).unwrap();
        assert_eq!(built.report.assets, 0);
        assert_eq!(built.report.size, 56);
        assert_eq!(&built.bytes[..4], b"RPak");
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let built = build_pak(
            &manifest(dir.path(), r#"[{ "$type": "rui", "path": "ui/menu" }]"#),
            PakSettings::default(),
        )
        .unwrap();
        assert_eq!(built.report.assets, 0);
        assert_eq!(built.report.skipped.len(), 1);
        assert_eq!(built.report.skipped[0].asset, "ui/menu");
        assert!(built.report.skipped[0].reason.contains("unknown asset type 'rui'"));
    }

    #[test]
    fn test_missing_input_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_pak(
            &manifest(
                dir.path(),
                r#"[{ "$type": "txtr", "path": "texture/a", "width": 4, "height": 4 }]"#,
            ),
            PakSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Asset { ref asset, source: AssetError::Io { .. } } if asset == "texture/a"
        ));
    }

    #[test]
    fn test_write_pak_records_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build/common.rpak");
        let report = write_pak(&manifest(dir.path(), "[]"), PakSettings::default(), &path).unwrap();
        assert_eq!(report.output.as_deref(), Some(path.as_path()));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), report.size);
    }
}
