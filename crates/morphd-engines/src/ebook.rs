//! Ebook conversion via Calibre.

use std::path::PathBuf;

use async_trait::async_trait;

use morphd_core::{Category, Error, Result};

use crate::capability::{Capability, ConversionOutcome, ConvertRequest};
use crate::command::ToolCommand;
use crate::tools;

const INPUTS: &[&str] = &["epub", "mobi", "azw3", "fb2", "lit", "htmlz"];
const OUTPUTS: &[&str] = &["epub", "mobi", "azw3", "pdf", "txt"];

/// Repackages ebooks by delegating to Calibre's ebook-convert.
pub struct EbookCapability {
    ebook_convert: Option<PathBuf>,
}

impl EbookCapability {
    pub fn new(ebook_convert: Option<PathBuf>) -> Self {
        Self { ebook_convert }
    }
}

#[async_trait]
impl Capability for EbookCapability {
    fn category(&self) -> Category {
        Category::Ebook
    }

    fn supported_inputs(&self) -> &'static [&'static str] {
        INPUTS
    }

    fn supported_outputs(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome> {
        let ebook_convert = tools::get_tool_path("ebook-convert", self.ebook_convert.as_deref())?;
        let output = req.single_output_path();

        req.report_progress(10);

        ToolCommand::new(ebook_convert)
            .arg(req.input.display().to_string())
            .arg(output.display().to_string())
            .execute()
            .await?;

        if !output.exists() {
            return Err(Error::engine(
                "ebook-convert",
                format!("expected output {} was not produced", output.display()),
            ));
        }

        Ok(ConversionOutcome::Single(output))
    }
}
