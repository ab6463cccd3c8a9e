//! Document conversion: LibreOffice for office formats, the in-process page
//! algebra for PDF page operations, pdftoppm for page rasterization.

use std::path::PathBuf;

use async_trait::async_trait;

use morphd_core::{Category, Error, Result};

use crate::capability::{Capability, ConversionOutcome, ConvertRequest};
use crate::office;
use crate::pages::{self, RasterizeJob};
use crate::registry::file_extension;
use crate::tools;

const INPUTS: &[&str] = &[
    "pdf", "doc", "docx", "odt", "rtf", "txt", "html", "xls", "xlsx", "ods", "csv",
];
const OUTPUTS: &[&str] = &["pdf", "docx", "odt", "txt", "html", "png", "jpg", "jpeg"];

/// Default fan-out width for per-page rasterization.
const DEFAULT_PAGE_CONCURRENCY: usize = 4;
/// Default render resolution.
const DEFAULT_RASTER_DPI: u32 = 150;

/// Converts documents. Office formats go through LibreOffice; PDF page
/// operations (page_range, split, merge) run in-process; page images go
/// through pdftoppm.
///
/// Recognized options: `page_range`, `split`, `merge`, `pdf_to_images`,
/// `image_format`, `concurrency`, `output_basename`, `compress`, `cleanup`.
/// `compress` is accepted for compatibility; PDF rewrites always recompress
/// streams.
pub struct DocumentCapability {
    soffice: Option<PathBuf>,
    pdftoppm: Option<PathBuf>,
}

impl DocumentCapability {
    pub fn new(soffice: Option<PathBuf>, pdftoppm: Option<PathBuf>) -> Self {
        Self { soffice, pdftoppm }
    }

    fn wants_pdf_pipeline(req: &ConvertRequest) -> bool {
        matches!(req.output_format.as_str(), "png" | "jpg" | "jpeg")
            || req.options.pdf_to_images
            || req.options.page_range.is_some()
            || !req.options.split.is_empty()
            || !req.options.merge.is_empty()
    }

    async fn convert_pdf(
        &self,
        req: &ConvertRequest,
        pdf_path: PathBuf,
    ) -> Result<ConversionOutcome> {
        let format = req.output_format.as_str();
        let image_output =
            matches!(format, "png" | "jpg" | "jpeg") || req.options.pdf_to_images;

        if image_output {
            let renderer = tools::get_tool_path("pdftoppm", self.pdftoppm.as_deref())?;
            let image_format = req.options.image_format.clone().unwrap_or_else(|| {
                if matches!(format, "png" | "jpg" | "jpeg") {
                    format.to_string()
                } else {
                    "png".to_string()
                }
            });

            let paths = pages::rasterize_pages(RasterizeJob {
                source: pdf_path,
                renderer,
                image_format,
                dpi: DEFAULT_RASTER_DPI,
                concurrency: req.options.concurrency.unwrap_or(DEFAULT_PAGE_CONCURRENCY),
                output_dir: req.output_dir.clone(),
                basename: req.output_basename(),
                work_dir: req.work_dir.clone(),
                progress: req.progress.clone(),
            })
            .await?;
            return Ok(ConversionOutcome::Many(paths));
        }

        if format == "pdf" {
            return self.pdf_page_ops(req, pdf_path).await;
        }

        // pdf -> office/text formats: optionally subset first, then let
        // LibreOffice do the format conversion.
        let soffice = tools::get_tool_path("soffice", self.soffice.as_deref())?;
        let mut temp_subset: Option<PathBuf> = None;
        let source = if req.options.page_range.is_some() {
            let subset_path = req
                .work_dir
                .join(format!("{}_selection.pdf", req.output_basename()));
            let spec = req.options.page_range.clone().unwrap_or_default();
            let input = pdf_path.clone();
            let target = subset_path.clone();
            tokio::task::spawn_blocking(move || -> Result<()> {
                let doc = pages::load_document(&input)?;
                let selected =
                    pages::parse_page_range(&spec, Some(pages::page_count(&doc)));
                let mut out = pages::subset(&doc, &selected)?;
                pages::save_document(&mut out, &target)
            })
            .await
            .map_err(|e| Error::internal(format!("subset task panicked: {e}")))??;
            temp_subset = Some(subset_path.clone());
            subset_path
        } else {
            pdf_path
        };

        req.report_progress(50);

        let result = office::soffice_convert(soffice, &source, format, &req.output_dir).await;
        if let Some(temp) = temp_subset {
            let _ = tokio::fs::remove_file(&temp).await;
        }
        let output = office::place_output(result?, &req.single_output_path()).await?;
        Ok(ConversionOutcome::Single(output))
    }

    /// Pure-lopdf pdf -> pdf path: merge, split, or page selection.
    async fn pdf_page_ops(
        &self,
        req: &ConvertRequest,
        pdf_path: PathBuf,
    ) -> Result<ConversionOutcome> {
        let options = req.options.clone();
        let output_dir = req.output_dir.clone();
        let basename = req.output_basename();
        let progress = req.progress.clone();

        tokio::task::spawn_blocking(move || -> Result<ConversionOutcome> {
            let doc = pages::load_document(&pdf_path)?;

            if !options.merge.is_empty() {
                let mut docs = vec![doc];
                for path in &options.merge {
                    docs.push(pages::load_document(path)?);
                }
                let mut merged = pages::merge(&docs)?;
                if let Some(ref spec) = options.page_range {
                    let selected =
                        pages::parse_page_range(spec, Some(pages::page_count(&merged)));
                    merged = pages::subset(&merged, &selected)?;
                }
                let out = output_dir.join(format!("{basename}.pdf"));
                pages::save_document(&mut merged, &out)?;
                return Ok(ConversionOutcome::Single(out));
            }

            if !options.split.is_empty() {
                let parts = pages::split(&doc, &options.split)?;
                let total = parts.len();
                let mut outs = Vec::with_capacity(total);
                for (index, mut part) in parts.into_iter().enumerate() {
                    let out = output_dir.join(format!("{basename}_part-{}.pdf", index + 1));
                    pages::save_document(&mut part, &out)?;
                    if let Some(ref progress) = progress {
                        progress.send((((index + 1) * 100) / total) as u8);
                    }
                    outs.push(out);
                }
                return Ok(ConversionOutcome::Many(outs));
            }

            // Plain pdf -> pdf: page selection, or a rewrite (which also
            // recompresses streams) when no range was given.
            let selected = pages::parse_page_range(
                options.page_range.as_deref().unwrap_or(""),
                Some(pages::page_count(&doc)),
            );
            let mut out_doc = pages::subset(&doc, &selected)?;
            let out = output_dir.join(format!("{basename}.pdf"));
            pages::save_document(&mut out_doc, &out)?;
            Ok(ConversionOutcome::Single(out))
        })
        .await
        .map_err(|e| Error::internal(format!("page-ops task panicked: {e}")))?
    }
}

#[async_trait]
impl Capability for DocumentCapability {
    fn category(&self) -> Category {
        Category::Document
    }

    fn supported_inputs(&self) -> &'static [&'static str] {
        INPUTS
    }

    fn supported_outputs(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome> {
        let input_ext = file_extension(&req.input)
            .ok_or_else(|| Error::document("input file has no extension"))?;

        req.report_progress(5);

        let outcome = if input_ext == "pdf" {
            self.convert_pdf(req, req.input.clone()).await?
        } else if Self::wants_pdf_pipeline(req) {
            // Office source with page-level work requested: render to an
            // intermediate PDF first.
            let soffice = tools::get_tool_path("soffice", self.soffice.as_deref())?;
            let intermediate =
                office::soffice_convert(soffice, &req.input, "pdf", &req.work_dir).await?;
            req.report_progress(40);
            let result = self.convert_pdf(req, intermediate.clone()).await;
            let _ = tokio::fs::remove_file(&intermediate).await;
            result?
        } else {
            let soffice = tools::get_tool_path("soffice", self.soffice.as_deref())?;
            let produced = office::soffice_convert(
                soffice,
                &req.input,
                &req.output_format,
                &req.output_dir,
            )
            .await?;
            ConversionOutcome::Single(
                office::place_output(produced, &req.single_output_path()).await?,
            )
        };

        if req.options.cleanup {
            if let Err(e) = tokio::fs::remove_file(&req.input).await {
                tracing::warn!("Failed to remove input {}: {}", req.input.display(), e);
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ConvertOptions;

    fn request_with(options: ConvertOptions, format: &str) -> ConvertRequest {
        ConvertRequest {
            input: PathBuf::from("/in/report.docx"),
            output_format: format.to_string(),
            output_dir: PathBuf::from("/out"),
            work_dir: PathBuf::from("/work"),
            options,
            progress: None,
        }
    }

    #[test]
    fn plain_office_conversion_skips_pdf_pipeline() {
        let req = request_with(ConvertOptions::default(), "pdf");
        assert!(!DocumentCapability::wants_pdf_pipeline(&req));
    }

    #[test]
    fn page_options_force_pdf_pipeline() {
        let mut options = ConvertOptions::default();
        options.page_range = Some("1-3".into());
        assert!(DocumentCapability::wants_pdf_pipeline(&request_with(
            options, "pdf"
        )));

        let mut options = ConvertOptions::default();
        options.split = vec!["1-5".into()];
        assert!(DocumentCapability::wants_pdf_pipeline(&request_with(
            options, "pdf"
        )));

        let options = ConvertOptions::default();
        assert!(DocumentCapability::wants_pdf_pipeline(&request_with(
            options, "png"
        )));
    }
}
