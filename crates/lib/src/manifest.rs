//! Image manifests: the input describing how to build each image, and the
//! output listing what was built.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};

use anyhow::{Context, Result};
use camino::Utf8Path;
use fn_error_context::context;
use serde::{Deserialize, Serialize};

use crate::postprocess::Postprocessor;

/// Name of the manifest written into the output directory.
pub const OUTPUT_MANIFEST: &str = "manifest.yaml";

/// A set of image definitions.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Images in the order they should be generated.
    #[serde(default)]
    pub images: Vec<Image>,
}

/// One image definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Unique name, also the file stem of the image.
    pub name: String,

    /// Image format, also the file extension. Only needed for images that
    /// are generated here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Set once the image is generated; see [`Image::derived_filename`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Shell commands run in order inside the output directory. Null entries
    /// are placeholders and skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<Vec<Option<String>>>,

    /// Applied to the image file after all commands have run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postprocess: Option<Postprocessor>,

    /// Shell command that must succeed for this image to be generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_check: Option<String>,

    /// Anything else, carried through to the output manifest untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Image {
    /// `<name>.<format>`
    pub fn derived_filename(&self) -> Result<String> {
        let Some(ext) = self.format.as_deref() else {
            anyhow::bail!("Image {} has no format", self.name);
        };
        Ok(format!("{}.{ext}", self.name))
    }
}

impl Manifest {
    /// Parse a manifest from a YAML file.
    #[context("Loading manifest {path}")]
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let f = File::open(path).map(BufReader::new)?;
        let r = serde_yaml::from_reader(f).context("Parsing YAML")?;
        Ok(r)
    }

    /// Write this manifest as YAML to `<dir>/manifest.yaml`, replacing any
    /// previous one atomically.
    #[context("Writing manifest to {dir}")]
    pub fn write_to_dir(&self, dir: &Utf8Path) -> Result<()> {
        let tmpfile = tempfile::Builder::new()
            .prefix(".manifest")
            .suffix(".yaml")
            .tempfile_in(dir)?;
        let mut w = BufWriter::new(tmpfile);
        serde_yaml::to_writer(&mut w, self)?;
        let tmpfile = w.into_inner().map_err(|e| e.into_error())?;
        tmpfile.as_file().sync_all()?;
        tmpfile.persist(dir.join(OUTPUT_MANIFEST))?;
        Ok(())
    }
}
