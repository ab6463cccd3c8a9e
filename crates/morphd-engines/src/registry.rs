//! Capability registry and category dispatch.
//!
//! Capabilities are registered once at startup, in a fixed priority order,
//! and the registry is read-only afterwards. Dispatch is purely
//! extension-based: the first capability whose input set contains the
//! file's lowercase extension wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use morphd_core::{Category, Error, Result};

use crate::archive::ArchiveCapability;
use crate::audio::AudioCapability;
use crate::capability::Capability;
use crate::document::DocumentCapability;
use crate::ebook::EbookCapability;
use crate::font::FontCapability;
use crate::image::ImageCapability;
use crate::presentation::PresentationCapability;

/// Lowercase extension of a path, if any.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Configured engine binary overrides; `None` means PATH lookup.
#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
    pub ffmpeg: Option<PathBuf>,
    pub soffice: Option<PathBuf>,
    pub pdftoppm: Option<PathBuf>,
    pub magick: Option<PathBuf>,
    pub sevenzip: Option<PathBuf>,
    pub fontforge: Option<PathBuf>,
    pub ebook_convert: Option<PathBuf>,
}

/// Supported formats of one category, for capability enumeration.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryFormats {
    pub category: Category,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Process-wide set of converter capabilities.
pub struct CapabilityRegistry {
    capabilities: Vec<Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    /// Register all capabilities in dispatch priority order: document,
    /// image, audio, archive, presentation, font, ebook.
    pub fn new(tools: ToolOverrides) -> Self {
        Self::with_capabilities(vec![
            Arc::new(DocumentCapability::new(
                tools.soffice.clone(),
                tools.pdftoppm,
            )),
            Arc::new(ImageCapability::new(tools.magick)),
            Arc::new(AudioCapability::new(tools.ffmpeg)),
            Arc::new(ArchiveCapability::new(tools.sevenzip)),
            Arc::new(PresentationCapability::new(tools.soffice)),
            Arc::new(FontCapability::new(tools.fontforge)),
            Arc::new(EbookCapability::new(tools.ebook_convert)),
        ])
    }

    /// Build a registry from an explicit capability list. The list order is
    /// the dispatch priority order.
    pub fn with_capabilities(capabilities: Vec<Arc<dyn Capability>>) -> Self {
        Self { capabilities }
    }

    /// Map a file to a category by extension. First match in registration
    /// order wins; unknown extensions yield `None`.
    pub fn detect_category(&self, path: &Path) -> Option<Category> {
        let ext = file_extension(path)?;
        self.capabilities
            .iter()
            .find(|cap| cap.supported_inputs().contains(&ext.as_str()))
            .map(|cap| cap.category())
    }

    /// The capability serving a category.
    pub fn capability_for(&self, category: Category) -> Option<Arc<dyn Capability>> {
        self.capabilities
            .iter()
            .find(|cap| cap.category() == category)
            .cloned()
    }

    /// Validate a submission: the input must map to a category and the
    /// category must be able to produce the requested output format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`]; the caller must surface this at
    /// submission time and never create a job.
    pub fn validate(&self, input: &Path, output_format: &str) -> Result<Category> {
        let ext = file_extension(input).ok_or_else(|| {
            Error::validation(format!(
                "cannot detect format of {}: missing extension",
                input.display()
            ))
        })?;

        let category = self.detect_category(input).ok_or_else(|| {
            Error::validation(format!("unsupported input format '{ext}'"))
        })?;

        let capability = self
            .capability_for(category)
            .ok_or_else(|| Error::internal(format!("no capability for {category}")))?;

        let format = output_format.to_lowercase();
        if format.is_empty() {
            return Err(Error::validation("output format is required"));
        }
        if !capability.supported_outputs().contains(&format.as_str()) {
            return Err(Error::validation(format!(
                "{category} conversion cannot produce '{format}'"
            )));
        }

        Ok(category)
    }

    /// Per-category input/output extension sets.
    pub fn formats(&self) -> Vec<CategoryFormats> {
        self.capabilities
            .iter()
            .map(|cap| CategoryFormats {
                category: cap.category(),
                inputs: cap
                    .supported_inputs()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                outputs: cap
                    .supported_outputs()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::new(ToolOverrides::default())
    }

    #[test]
    fn detection_is_case_insensitive() {
        let reg = registry();
        assert_eq!(
            reg.detect_category(Path::new("/tmp/Report.PDF")),
            Some(Category::Document)
        );
        assert_eq!(
            reg.detect_category(Path::new("/tmp/song.MP3")),
            Some(Category::Audio)
        );
    }

    #[test]
    fn unknown_extension_yields_none() {
        let reg = registry();
        assert_eq!(reg.detect_category(Path::new("/tmp/blob.xyz")), None);
        assert_eq!(reg.detect_category(Path::new("/tmp/noext")), None);
    }

    #[test]
    fn each_category_is_dispatchable() {
        let reg = registry();
        for &category in Category::all() {
            assert!(reg.capability_for(category).is_some(), "{category} missing");
        }
    }

    #[test]
    fn validate_rejects_unknown_input() {
        let reg = registry();
        let err = reg.validate(Path::new("/tmp/blob.xyz"), "pdf").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn validate_rejects_unsupported_output() {
        let reg = registry();
        let err = reg.validate(Path::new("/tmp/a.mp3"), "pdf").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn validate_accepts_and_normalizes_case() {
        let reg = registry();
        let category = reg.validate(Path::new("/tmp/a.DOCX"), "PDF").unwrap();
        assert_eq!(category, Category::Document);
    }

    #[test]
    fn formats_cover_all_categories() {
        let reg = registry();
        let formats = reg.formats();
        assert_eq!(formats.len(), Category::all().len());
        let doc = formats
            .iter()
            .find(|f| f.category == Category::Document)
            .unwrap();
        assert!(doc.inputs.contains(&"pdf".to_string()));
        assert!(doc.outputs.contains(&"png".to_string()));
    }
}
