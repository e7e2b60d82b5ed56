//! RPak builder binary entry point.
//!
//! This is a thin wrapper around the repak-assets library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Validates configuration
//! 4. Builds and writes the pak
//!
//! For library usage, see the repak-assets crate documentation.

use anyhow::{Context, Result};
use repak_assets::BuildConfig;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse configuration from CLI args
    let config = BuildConfig::from_args();

    // Initialize tracing subscriber for logging
    let filter = match config.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Building pak from {}", config.manifest.display());

    // Validate configuration
    config.validate()?;

    let report = repak_assets::run(&config)?;
    for skipped in &report.skipped {
        tracing::warn!("Skipped '{}': {}", skipped.asset, skipped.reason);
    }
    tracing::info!(
        "Built '{}': {} assets, {} skipped, {} bytes",
        report.name,
        report.assets,
        report.skipped.len(),
        report.size
    );

    Ok(())
}
