//! CLI argument definitions

use camino::Utf8PathBuf;
use clap::Parser;

/// Generate disk image test fixtures from a manifest
///
/// Each image in the manifest is produced by running its `generated_by`
/// commands inside the output directory, followed by an optional
/// postprocessing step. A manifest listing the images that were generated
/// is written to `manifest.yaml` in the output directory.
#[derive(Debug, Parser, PartialEq, Eq)]
#[clap(name = "imagegen", version)]
pub struct GenerateOpts {
    /// Path to the manifest describing the images
    pub manifest: Utf8PathBuf,

    /// Output directory for generated images
    #[clap(long, default_value = "images")]
    pub output: Utf8PathBuf,

    /// Only generate this named image
    #[clap(long)]
    pub only: Option<String>,

    /// Enable debug logging
    #[clap(long)]
    pub debug: bool,
}
