//! Atomic output writing.
//!
//! The pak is written to a temporary file in the destination directory and
//! renamed over the destination only once every byte is on disk, so a
//! failed build never leaves a partial pak behind.

use crate::error::{PipelineError, PipelineResult};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Write `bytes` to `path` through a temporary file
///
/// # Errors
///
/// Returns `Output` if the directory cannot be created or the file cannot
/// be written or renamed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PipelineResult<()> {
    let output_error = |source: std::io::Error| PipelineError::Output {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(output_error)?;

    let mut file = NamedTempFile::new_in(dir).map_err(output_error)?;
    file.write_all(bytes).map_err(output_error)?;
    file.as_file().sync_all().map_err(output_error)?;
    debug!("Wrote {} bytes to {}", bytes.len(), file.path().display());

    file.persist(path).map_err(|err| output_error(err.error))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build/nested/common.rpak");
        write_atomic(&path, b"RPak").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"RPak");
    }

    #[test]
    fn test_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("common.rpak");
        std::fs::write(&path, b"old contents").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = write_atomic(&blocker.join("common.rpak"), b"RPak").unwrap_err();
        assert!(matches!(err, PipelineError::Output { .. }));
    }
}
