//! # imagegen
//!
//! Generates disk image test fixtures from a declarative manifest.
//!
//! Each image is produced by a sequence of shell commands run inside the
//! output directory, optionally followed by a binary postprocessing step
//! such as [`vmdk::footerify`]. The images that were produced are recorded
//! in a new manifest alongside them.

pub mod cli;
pub mod generate;
pub mod manifest;
pub mod postprocess;
pub mod template;
pub mod vmdk;

use anyhow::Result;

// Re-export the CLI interface
pub use cli::GenerateOpts;

/// Generate the images selected by `opts`.
pub fn run(opts: &GenerateOpts) -> Result<()> {
    generate::run(opts)
}
