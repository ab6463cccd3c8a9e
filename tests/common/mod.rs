//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires a job registry and runner against a
//! stub capability operating on real temp files, plus helpers for building
//! PDF fixtures with lopdf.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use morphd::config::{Config, ConversionConfig};
use morphd::jobs::{JobRegistry, JobRunner};
use morphd::server::AppContext;
use morphd_core::{Category, Error, Result};
use morphd_engines::{
    Capability, CapabilityRegistry, ConversionOutcome, ConvertRequest,
};

/// How the stub capability behaves.
#[derive(Debug, Clone)]
pub enum StubMode {
    /// Copy the input to the output after reporting progress milestones.
    Succeed,
    /// Fail with the given engine message.
    Fail(String),
    /// Sleep before succeeding, leaving a window to cancel.
    Slow(Duration),
}

/// A capability that claims `.txt` documents and converts by copying,
/// so lifecycle tests exercise the full pipeline without external engines.
pub struct StubCapability {
    pub mode: StubMode,
}

#[async_trait]
impl Capability for StubCapability {
    fn category(&self) -> Category {
        Category::Document
    }

    fn supported_inputs(&self) -> &'static [&'static str] {
        &["txt"]
    }

    fn supported_outputs(&self) -> &'static [&'static str] {
        &["txt", "out"]
    }

    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome> {
        match &self.mode {
            StubMode::Fail(message) => {
                return Err(Error::engine("stub", message.clone()));
            }
            StubMode::Slow(delay) => {
                req.report_progress(10);
                tokio::time::sleep(*delay).await;
            }
            StubMode::Succeed => {}
        }

        for milestone in [25u8, 50, 75] {
            req.report_progress(milestone);
        }

        let output = req.single_output_path();
        tokio::fs::copy(&req.input, &output)
            .await
            .map_err(Error::Io)?;
        Ok(ConversionOutcome::Single(output))
    }
}

/// Test harness wrapping a registry + runner + capability registry over
/// temp directories.
pub struct TestHarness {
    pub registry: Arc<JobRegistry>,
    pub runner: Arc<JobRunner>,
    pub capabilities: Arc<CapabilityRegistry>,
    pub config: Arc<Config>,
    pub input_dir: TempDir,
    _output_dir: TempDir,
    _work_dir: TempDir,
}

impl TestHarness {
    /// Harness with a successful stub capability.
    pub fn new() -> Self {
        Self::with_capability(Arc::new(StubCapability {
            mode: StubMode::Succeed,
        }))
    }

    /// Harness with a stub in a specific mode.
    pub fn with_stub(mode: StubMode) -> Self {
        Self::with_capability(Arc::new(StubCapability { mode }))
    }

    /// Harness with the real capability set (lopdf paths work without
    /// external engines).
    pub fn with_real_capabilities() -> Self {
        Self::build(CapabilityRegistry::new(Default::default()))
    }

    pub fn with_capability(capability: Arc<dyn Capability>) -> Self {
        Self::build(CapabilityRegistry::with_capabilities(vec![capability]))
    }

    fn build(capabilities: CapabilityRegistry) -> Self {
        let input_dir = TempDir::new().expect("input tempdir");
        let output_dir = TempDir::new().expect("output tempdir");
        let work_dir = TempDir::new().expect("work tempdir");

        let mut config = Config::default();
        config.conversion = ConversionConfig {
            output_dir: output_dir.path().to_path_buf(),
            work_dir: work_dir.path().to_path_buf(),
            max_concurrent_jobs: 2,
        };

        let capabilities = Arc::new(capabilities);
        let registry = JobRegistry::new();
        let runner = JobRunner::new(
            Arc::clone(&registry),
            Arc::clone(&capabilities),
            &config.conversion,
        );

        Self {
            registry,
            runner,
            capabilities,
            config: Arc::new(config),
            input_dir,
            _output_dir: output_dir,
            _work_dir: work_dir,
        }
    }

    /// Full HTTP context for router-level tests.
    pub fn app_context(&self) -> AppContext {
        AppContext {
            registry: Arc::clone(&self.registry),
            runner: Arc::clone(&self.runner),
            capabilities: Arc::clone(&self.capabilities),
            config: Arc::clone(&self.config),
        }
    }

    /// Write a text input file into the harness input dir.
    pub fn write_input(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.input_dir.path().join(name);
        std::fs::write(&path, contents).expect("write input");
        path
    }

    /// Write an n-page PDF fixture into the harness input dir.
    pub fn write_pdf(&self, name: &str, pages: u32) -> PathBuf {
        let path = self.input_dir.path().join(name);
        let mut doc = build_pdf("fixture", pages);
        doc.save(&path).expect("save fixture pdf");
        path
    }
}

/// Build an in-memory PDF whose page `n` shows `"{label} page {n}"`.
pub fn build_pdf(label: &str, pages: u32) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("{label} page {n}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Page count of a PDF on disk.
pub fn pdf_page_count(path: &Path) -> u32 {
    Document::load(path).expect("load pdf").get_pages().len() as u32
}
