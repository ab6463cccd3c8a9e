//! The converter capability contract.
//!
//! A capability is a stateless binding to one external conversion engine:
//! it names the extensions it accepts and produces, and performs a single
//! conversion. Capabilities are registered once at startup and treated as
//! read-only for the process lifetime.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use morphd_core::{Category, Result};

/// Typed options for a conversion request.
///
/// Each capability reads the fields relevant to it and ignores the rest by
/// contract. Unknown keys in submitted JSON are likewise ignored (serde
/// default behaviour; the struct does not deny unknown fields).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvertOptions {
    /// Page selection spec, e.g. `"1-3,5,8"`. Document capability only.
    /// Empty/absent means all pages.
    #[serde(default)]
    pub page_range: Option<String>,

    /// Split the document into one output per range spec. Document
    /// capability only; ranges resolving to no pages produce no output.
    #[serde(default)]
    pub split: Vec<String>,

    /// Additional documents to append after the primary input, in order.
    /// Document capability only.
    #[serde(default)]
    pub merge: Vec<PathBuf>,

    /// Render each page to an image instead of converting the container.
    /// Document capability only.
    #[serde(default)]
    pub pdf_to_images: bool,

    /// Image format for page rendering (default `png`).
    #[serde(default)]
    pub image_format: Option<String>,

    /// Bounded fan-out width for per-page work (default from config).
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Basename for generated outputs (default: input file stem).
    #[serde(default)]
    pub output_basename: Option<String>,

    /// Audio bitrate, e.g. `"192k"`. Audio capability only.
    #[serde(default)]
    pub audio_bitrate: Option<String>,

    /// Image quality 1-100. Image capability only.
    #[serde(default)]
    pub image_quality: Option<u8>,

    /// Archive compression level 0-9. Archive capability only.
    #[serde(default)]
    pub compression_level: Option<u8>,

    /// Accepted for compatibility; PDF rewrites always recompress streams.
    #[serde(default)]
    pub compress: bool,

    /// Delete the input artifact after a successful conversion. Document
    /// capability only.
    #[serde(default)]
    pub cleanup: bool,
}

/// Lossy progress reporter handed to capabilities.
///
/// Percentages are 0-100. Sending never fails: once the receiving side is
/// gone (job finalized or cancelled) updates are silently dropped, so
/// capabilities never need to handle a disconnected observer.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<u8>,
}

impl ProgressSender {
    /// Report progress. Values above 100 are clamped.
    pub fn send(&self, percent: u8) {
        let _ = self.tx.send(percent.min(100));
    }
}

/// Create a progress channel: the sender goes into a [`ConvertRequest`],
/// the receiver is drained by the job registry.
pub fn progress_channel() -> (ProgressSender, mpsc::UnboundedReceiver<u8>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, rx)
}

/// A single conversion request.
#[derive(Debug)]
pub struct ConvertRequest {
    /// Input artifact.
    pub input: PathBuf,
    /// Target format as a lowercase extension, e.g. `"pdf"`.
    pub output_format: String,
    /// Directory the capability writes its outputs into.
    pub output_dir: PathBuf,
    /// Scratch space for intermediate artifacts.
    pub work_dir: PathBuf,
    /// Capability-specific options.
    pub options: ConvertOptions,
    /// Optional progress reporter. Capabilities that cannot report
    /// granular progress may send coarse milestones or nothing at all.
    pub progress: Option<ProgressSender>,
}

impl ConvertRequest {
    /// Basename for generated outputs: the explicit option if set,
    /// otherwise the input file stem.
    pub fn output_basename(&self) -> String {
        if let Some(ref base) = self.options.output_basename {
            return base.clone();
        }
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string())
    }

    /// Path for a single-output conversion: `{output_dir}/{basename}.{ext}`.
    pub fn single_output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_basename(), self.output_format))
    }

    /// Report progress if a sender is attached.
    pub fn report_progress(&self, percent: u8) {
        if let Some(ref progress) = self.progress {
            progress.send(percent);
        }
    }
}

/// Result of a conversion: one output artifact, or several (page images,
/// split documents).
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    Single(PathBuf),
    Many(Vec<PathBuf>),
}

impl ConversionOutcome {
    /// Flatten into a path list.
    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            ConversionOutcome::Single(path) => vec![path],
            ConversionOutcome::Many(paths) => paths,
        }
    }

    /// Number of produced artifacts.
    pub fn len(&self) -> usize {
        match self {
            ConversionOutcome::Single(_) => 1,
            ConversionOutcome::Many(paths) => paths.len(),
        }
    }

    /// True when no artifact was produced (empty `Many`).
    pub fn is_empty(&self) -> bool {
        matches!(self, ConversionOutcome::Many(paths) if paths.is_empty())
    }
}

/// Contract every format engine binding satisfies. The orchestration core
/// depends only on this trait, never on a specific engine.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The format domain this capability serves.
    fn category(&self) -> Category;

    /// Accepted input extensions, lowercase.
    fn supported_inputs(&self) -> &'static [&'static str];

    /// Producible output extensions, lowercase.
    fn supported_outputs(&self) -> &'static [&'static str];

    /// Perform one conversion. Failures carry the engine's message.
    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome>;
}
