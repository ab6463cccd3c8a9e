//! Image conversion via ImageMagick.

use std::path::PathBuf;

use async_trait::async_trait;

use morphd_core::{Category, Error, Result};

use crate::capability::{Capability, ConversionOutcome, ConvertRequest};
use crate::command::ToolCommand;
use crate::tools;

const INPUTS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"];
const OUTPUTS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "pdf"];

/// Resamples images by delegating to ImageMagick.
pub struct ImageCapability {
    magick: Option<PathBuf>,
}

impl ImageCapability {
    pub fn new(magick: Option<PathBuf>) -> Self {
        Self { magick }
    }

    /// Prefer the IM7 `magick` entry point, fall back to the IM6 `convert`.
    fn resolve_tool(&self) -> Result<PathBuf> {
        tools::get_tool_path("magick", self.magick.as_deref())
            .or_else(|_| tools::require_tool("convert"))
    }
}

#[async_trait]
impl Capability for ImageCapability {
    fn category(&self) -> Category {
        Category::Image
    }

    fn supported_inputs(&self) -> &'static [&'static str] {
        INPUTS
    }

    fn supported_outputs(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome> {
        let magick = self.resolve_tool()?;
        let output = req.single_output_path();

        req.report_progress(10);

        let mut cmd = ToolCommand::new(magick);
        cmd.arg(req.input.display().to_string());
        if let Some(quality) = req.options.image_quality {
            cmd.arg("-quality").arg(quality.min(100).to_string());
        }
        cmd.arg(output.display().to_string());
        cmd.execute().await?;

        if !output.exists() {
            return Err(Error::engine(
                "magick",
                format!("expected output {} was not produced", output.display()),
            ));
        }

        Ok(ConversionOutcome::Single(output))
    }
}
