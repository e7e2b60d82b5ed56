//! Asset layer and command-line builder for RPak containers
//!
//! This crate reads a JSON build manifest, encodes each listed asset into
//! a [`repak_format::PakBuilder`] and writes the finished pak.
//!
//! # Components
//!
//! - **Manifest**: [`Manifest`] and [`AssetDescriptor`] typed field access
//! - **KeyValues**: [`KeyValues`] parser for legacy material definitions
//! - **Encoders**: material and texture encoders behind [`AssetEncoder`]
//! - **Pipeline**: [`build_pak`] with skip-on-bad-input semantics
//! - **Output**: [`write_atomic`] temp-file-and-rename writes
//!
//! # Examples
//!
//! ```no_run
//! use repak_assets::{Manifest, build_pak};
//! use repak_format::PakSettings;
//! use std::path::Path;
//!
//! let manifest = Manifest::load(Path::new("maps/common.json"))?;
//! let built = build_pak(&manifest, PakSettings::default())?;
//! for skipped in &built.report.skipped {
//!     println!("skipped {}: {}", skipped.asset, skipped.reason);
//! }
//! # Ok::<(), repak_assets::PipelineError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod encoders;
pub mod error;
pub mod keyvalues;
pub mod manifest;
pub mod output;
pub mod pipeline;

pub use config::BuildConfig;
pub use encoders::{
    AssetEncoder, AssetType, EncodeContext, MaterialDefinition, MaterialEncoder, MaterialType,
    TextureDefinition, TextureEncoder, encode,
};
pub use error::{
    AssetError, AssetResult, ConfigError, ConfigResult, KeyValuesError, PipelineError,
    PipelineResult,
};
pub use keyvalues::KeyValues;
pub use manifest::{AssetDescriptor, Manifest};
pub use output::write_atomic;
pub use pipeline::{BuildReport, BuiltPak, SkippedAsset, build_pak, run, write_pak};
