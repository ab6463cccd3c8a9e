//! Concurrent page rasterization.
//!
//! Each page is copied into its own single-page temp document and handed to
//! the external renderer (pdftoppm). Workers own distinct temp files, so no
//! locking is needed; fan-out width is bounded by the worker pool.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use morphd_core::{run_bounded, Error, Result};

use super::ops;
use crate::capability::ProgressSender;
use crate::command::ToolCommand;

/// A page-rasterization request.
#[derive(Debug)]
pub struct RasterizeJob {
    /// Source PDF.
    pub source: PathBuf,
    /// Resolved renderer binary (pdftoppm).
    pub renderer: PathBuf,
    /// Requested image format: `png`, `jpg`, or `jpeg`.
    pub image_format: String,
    /// Render resolution.
    pub dpi: u32,
    /// Bounded fan-out width.
    pub concurrency: usize,
    /// Directory receiving the final `{basename}_page-{n}.{ext}` files.
    pub output_dir: PathBuf,
    /// Basename for the canonical output names.
    pub basename: String,
    /// Scratch space for single-page temp documents.
    pub work_dir: PathBuf,
    /// Per-page completion progress, if anyone is listening.
    pub progress: Option<ProgressSender>,
}

/// Render every page of `job.source` to an image.
///
/// Returned paths follow source page order regardless of completion order.
/// Temp artifacts live in a staging directory that is removed on success
/// and on failure; on failure any already-moved page images are removed
/// too, so a failed run leaves nothing behind.
pub async fn rasterize_pages(job: RasterizeJob) -> Result<Vec<PathBuf>> {
    let (format_flag, rendered_ext) = match job.image_format.to_lowercase().as_str() {
        "png" => ("-png", "png"),
        "jpg" | "jpeg" => ("-jpeg", "jpg"),
        other => {
            return Err(Error::validation(format!(
                "unsupported page image format '{other}' (expected png or jpg)"
            )))
        }
    };
    let final_ext = job.image_format.to_lowercase();

    let source = job.source.clone();
    let doc = tokio::task::spawn_blocking(move || ops::load_document(&source))
        .await
        .map_err(|e| Error::internal(format!("load task panicked: {e}")))??;

    let total = ops::page_count(&doc);
    if total == 0 {
        return Err(Error::document("document has no pages to rasterize"));
    }

    let staging = tempfile::Builder::new()
        .prefix("morphd-raster-")
        .tempdir_in(&job.work_dir)
        .map_err(Error::Io)?;

    let doc = Arc::new(doc);
    let staging_path = staging.path().to_path_buf();
    let renderer = job.renderer.clone();
    let output_dir = job.output_dir.clone();
    let basename = job.basename.clone();
    let progress = job.progress.clone();
    let dpi = job.dpi;
    let completed = Arc::new(AtomicUsize::new(0));

    let result = run_bounded(
        (1..=total).collect(),
        job.concurrency,
        move |page: u32| {
            let doc = Arc::clone(&doc);
            let staging_path = staging_path.clone();
            let renderer = renderer.clone();
            let output_dir = output_dir.clone();
            let basename = basename.clone();
            let progress = progress.clone();
            let completed = Arc::clone(&completed);
            let final_ext = final_ext.clone();

            async move {
                let single_page = staging_path.join(format!("{basename}_page-{page}.pdf"));
                let render_prefix = staging_path.join(format!("{basename}_page-{page}"));

                let single_page_for_write = single_page.clone();
                tokio::task::spawn_blocking(move || -> Result<()> {
                    let mut doc = ops::subset(&doc, &[page])?;
                    ops::save_document(&mut doc, &single_page_for_write)
                })
                .await
                .map_err(|e| Error::internal(format!("page task panicked: {e}")))??;

                ToolCommand::new(renderer)
                    .arg(format_flag)
                    .arg("-r")
                    .arg(dpi.to_string())
                    .arg("-singlefile")
                    .arg(single_page.display().to_string())
                    .arg(render_prefix.display().to_string())
                    .execute()
                    .await?;

                let rendered = render_prefix.with_extension(rendered_ext);
                if !rendered.exists() {
                    return Err(Error::engine(
                        "pdftoppm",
                        format!("expected output {} was not produced", rendered.display()),
                    ));
                }

                let final_path = output_dir.join(format!("{basename}_page-{page}.{final_ext}"));
                move_file(&rendered, &final_path).await?;
                let _ = tokio::fs::remove_file(&single_page).await;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(ref progress) = progress {
                    progress.send((done * 100 / total as usize) as u8);
                }

                Ok(final_path)
            }
        },
    )
    .await;

    match result {
        Ok(paths) => Ok(paths),
        Err(e) => {
            // Remove page images that made it out before the failure.
            for page in 1..=total {
                let path = job
                    .output_dir
                    .join(format!("{}_page-{page}.{}", job.basename, job.image_format.to_lowercase()));
                if tokio::fs::remove_file(&path).await.is_ok() {
                    tracing::debug!("Removed partial page image {}", path.display());
                }
            }
            Err(e)
        }
    }
}

/// Rename, falling back to copy+remove for cross-device moves.
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await.map_err(Error::Io)?;
    let _ = tokio::fs::remove_file(from).await;
    Ok(())
}
