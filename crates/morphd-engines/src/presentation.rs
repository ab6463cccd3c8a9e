//! Presentation conversion via LibreOffice.

use std::path::PathBuf;

use async_trait::async_trait;

use morphd_core::{Category, Result};

use crate::capability::{Capability, ConversionOutcome, ConvertRequest};
use crate::office;
use crate::tools;

const INPUTS: &[&str] = &["ppt", "pptx", "odp"];
const OUTPUTS: &[&str] = &["pdf", "pptx", "odp"];

/// Converts slide decks by delegating to LibreOffice Impress.
pub struct PresentationCapability {
    soffice: Option<PathBuf>,
}

impl PresentationCapability {
    pub fn new(soffice: Option<PathBuf>) -> Self {
        Self { soffice }
    }
}

#[async_trait]
impl Capability for PresentationCapability {
    fn category(&self) -> Category {
        Category::Presentation
    }

    fn supported_inputs(&self) -> &'static [&'static str] {
        INPUTS
    }

    fn supported_outputs(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome> {
        let soffice = tools::get_tool_path("soffice", self.soffice.as_deref())?;

        req.report_progress(10);

        let produced = office::soffice_convert(
            soffice,
            &req.input,
            &req.output_format,
            &req.output_dir,
        )
        .await?;
        let output = office::place_output(produced, &req.single_output_path()).await?;

        Ok(ConversionOutcome::Single(output))
    }
}
