//! Steps applied to an image file after its generation commands have run.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// A named postprocessing step, as referenced by the `postprocess` key of a
/// manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Postprocessor {
    /// Convert a monolithic sparse VMDK to carry a footer.
    #[serde(rename = "footerify_vmdk")]
    FooterifyVmdk,
}

impl Postprocessor {
    /// The name used in manifests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FooterifyVmdk => "footerify_vmdk",
        }
    }

    /// Run this step on the image at `path`.
    pub fn apply(&self, path: &Utf8Path) -> Result<()> {
        tracing::info!("Running postprocessor {} on {}", self.name(), path);
        match self {
            Self::FooterifyVmdk => crate::vmdk::footerify_file(path.as_std_path())
                .with_context(|| format!("Converting {path} to footer layout")),
        }
    }
}

impl std::fmt::Display for Postprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
