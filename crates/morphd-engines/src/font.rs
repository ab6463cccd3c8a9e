//! Font conversion via FontForge.

use std::path::PathBuf;

use async_trait::async_trait;

use morphd_core::{Category, Error, Result};

use crate::capability::{Capability, ConversionOutcome, ConvertRequest};
use crate::command::ToolCommand;
use crate::tools;

const INPUTS: &[&str] = &["ttf", "otf", "woff", "woff2"];
const OUTPUTS: &[&str] = &["ttf", "otf", "woff", "woff2"];

/// Reformats fonts by delegating to FontForge's scripting mode.
pub struct FontCapability {
    fontforge: Option<PathBuf>,
}

impl FontCapability {
    pub fn new(fontforge: Option<PathBuf>) -> Self {
        Self { fontforge }
    }
}

#[async_trait]
impl Capability for FontCapability {
    fn category(&self) -> Category {
        Category::Font
    }

    fn supported_inputs(&self) -> &'static [&'static str] {
        INPUTS
    }

    fn supported_outputs(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome> {
        let fontforge = tools::get_tool_path("fontforge", self.fontforge.as_deref())?;
        let output = req.single_output_path();

        req.report_progress(10);

        ToolCommand::new(fontforge)
            .arg("-lang=ff")
            .arg("-c")
            .arg("Open($1); Generate($2)")
            .arg(req.input.display().to_string())
            .arg(output.display().to_string())
            .execute()
            .await?;

        if !output.exists() {
            return Err(Error::engine(
                "fontforge",
                format!("expected output {} was not produced", output.display()),
            ));
        }

        Ok(ConversionOutcome::Single(output))
    }
}
