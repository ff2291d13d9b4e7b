//! Generate images by running their manifest commands

use std::process::Command;

use anyhow::{Context, Result};
use camino::Utf8Path;
use fn_error_context::context;
use imagegen_utils::CommandRunExt;

use crate::cli::GenerateOpts;
use crate::manifest::{Image, Manifest};
use crate::template;

/// Generate every image selected by `opts` and write the output manifest.
pub fn run(opts: &GenerateOpts) -> Result<()> {
    std::fs::create_dir_all(&opts.output)
        .with_context(|| format!("Creating output directory {}", opts.output))?;

    let manifest = Manifest::load(&opts.manifest)?;
    let generated = generate(manifest, &opts.output, opts.only.as_deref())?;

    generated.write_to_dir(&opts.output)?;
    tracing::info!(
        "Generated {} image(s) into {}",
        generated.images.len(),
        opts.output
    );
    Ok(())
}

/// Generate the images of `manifest` into `output_dir`, returning a manifest
/// of those that were produced. When `only` is set, every other image is
/// skipped. A failing command aborts the whole run.
pub fn generate(
    manifest: Manifest,
    output_dir: &Utf8Path,
    only: Option<&str>,
) -> Result<Manifest> {
    let mut generated = Manifest::default();

    for mut image in manifest.images {
        if only.is_some_and(|only| only != image.name) {
            continue;
        }
        if let Some(check) = image.support_check.as_deref() {
            if !is_supported(check)? {
                tracing::warn!("Unable to generate image {}", image.name);
                continue;
            }
        }
        if image.generated_by.is_some() {
            generate_one(&mut image, output_dir)
                .with_context(|| format!("Generating image {}", image.name))?;
            generated.images.push(image);
        } else {
            tracing::error!("Unknown source for image {}", image.name);
        }
    }

    Ok(generated)
}

/// Run a support check; a zero exit status means the image can be generated.
#[context("Running support check {check:?}")]
pub fn is_supported(check: &str) -> Result<bool> {
    let status = Command::new("sh")
        .args(["-c", check])
        .log_debug()
        .status()?;
    Ok(status.success())
}

/// Run the commands of a single image and its postprocessor, recording the
/// derived file name on `image`. An image with an empty command list has
/// nothing to postprocess.
pub fn generate_one(image: &mut Image, output_dir: &Utf8Path) -> Result<()> {
    let filename = image.derived_filename()?;
    image.filename = Some(filename.clone());

    let vars = [("name", image.name.as_str()), ("filename", filename.as_str())];
    let steps = image.generated_by.as_deref().unwrap_or_default();
    let total = steps.len();

    for (i, step) in steps.iter().enumerate() {
        let Some(cmd) = step.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let cmd = template::expand(cmd, &vars)
            .with_context(|| format!("Expanding command {cmd:?}"))?;
        tracing::info!(
            "Generating {} step {}/{} with {:?}",
            image.name,
            i + 1,
            total,
            cmd
        );

        let r = Command::new("sh")
            .args(["-c", cmd.as_str()])
            .current_dir(output_dir)
            .log_debug()
            .output_combined()?;
        if !r.status.success() {
            tracing::error!(
                "Command {:?} failed with {}: {}",
                cmd,
                r.code(),
                r.output_lossy()
            );
            anyhow::bail!("Command {cmd:?} failed with {}", r.code());
        }
        tracing::debug!("Command {:?} returned {}", cmd, r.output_lossy());
    }

    if let Some(postprocess) = image.postprocess.filter(|_| !steps.is_empty()) {
        postprocess.apply(&output_dir.join(&filename))?;
    }

    Ok(())
}
