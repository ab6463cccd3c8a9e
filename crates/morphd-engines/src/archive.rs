//! Archive conversion via 7-Zip: extract to a staging directory, repack in
//! the target format.

use std::path::PathBuf;

use async_trait::async_trait;

use morphd_core::{Category, Error, Result};

use crate::capability::{Capability, ConversionOutcome, ConvertRequest};
use crate::command::ToolCommand;
use crate::tools;

const INPUTS: &[&str] = &["zip", "7z", "tar", "gz", "tgz", "bz2", "rar"];
const OUTPUTS: &[&str] = &["zip", "7z", "tar"];

/// Repacks archives by delegating to 7z.
pub struct ArchiveCapability {
    sevenzip: Option<PathBuf>,
}

impl ArchiveCapability {
    pub fn new(sevenzip: Option<PathBuf>) -> Self {
        Self { sevenzip }
    }
}

#[async_trait]
impl Capability for ArchiveCapability {
    fn category(&self) -> Category {
        Category::Archive
    }

    fn supported_inputs(&self) -> &'static [&'static str] {
        INPUTS
    }

    fn supported_outputs(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome> {
        let sevenzip = tools::get_tool_path("7z", self.sevenzip.as_deref())?;

        let staging = tempfile::Builder::new()
            .prefix("morphd-archive-")
            .tempdir_in(&req.work_dir)
            .map_err(Error::Io)?;

        req.report_progress(10);

        ToolCommand::new(sevenzip.clone())
            .arg("x")
            .arg("-y")
            .arg(format!("-o{}", staging.path().display()))
            .arg(req.input.display().to_string())
            .execute()
            .await?;

        // Compressed tarballs (.tgz, .tar.gz, .tar.bz2) unwrap in two steps:
        // the first extraction yields a lone inner .tar.
        if let Some(inner_tar) = lone_tar_member(staging.path()).await? {
            let inner_staging = tempfile::Builder::new()
                .prefix("morphd-archive-inner-")
                .tempdir_in(&req.work_dir)
                .map_err(Error::Io)?;

            ToolCommand::new(sevenzip.clone())
                .arg("x")
                .arg("-y")
                .arg(format!("-o{}", inner_staging.path().display()))
                .arg(inner_tar.display().to_string())
                .execute()
                .await?;

            return self.repack(&sevenzip, req, inner_staging).await;
        }

        self.repack(&sevenzip, req, staging).await
    }
}

impl ArchiveCapability {
    async fn repack(
        &self,
        sevenzip: &PathBuf,
        req: &ConvertRequest,
        staging: tempfile::TempDir,
    ) -> Result<ConversionOutcome> {
        let output = req.single_output_path();
        let archive_type = match req.output_format.as_str() {
            "zip" => "zip",
            "7z" => "7z",
            "tar" => "tar",
            other => {
                return Err(Error::validation(format!(
                    "unsupported archive output format '{other}'"
                )))
            }
        };

        req.report_progress(60);

        let mut cmd = ToolCommand::new(sevenzip.clone());
        cmd.arg("a").arg(format!("-t{archive_type}"));
        if let Some(level) = req.options.compression_level {
            cmd.arg(format!("-mx{}", level.min(9)));
        }
        cmd.arg(output.display().to_string())
            .arg(".")
            .current_dir(staging.path());
        cmd.execute().await?;

        if !output.exists() {
            return Err(Error::engine(
                "7z",
                format!("expected output {} was not produced", output.display()),
            ));
        }

        Ok(ConversionOutcome::Single(output))
    }
}

/// If the directory contains exactly one entry and it is a .tar file,
/// return its path.
async fn lone_tar_member(dir: &std::path::Path) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(Error::Io)?;
    let mut only: Option<PathBuf> = None;
    let mut count = 0usize;

    while let Some(entry) = entries.next_entry().await.map_err(Error::Io)? {
        count += 1;
        if count > 1 {
            return Ok(None);
        }
        only = Some(entry.path());
    }

    Ok(only.filter(|p| {
        p.extension()
            .map(|e| e.eq_ignore_ascii_case("tar"))
            .unwrap_or(false)
    }))
}
