//! Shared LibreOffice invocation used by the document and presentation
//! capabilities.

use std::path::{Path, PathBuf};

use morphd_core::{Error, Result};

use crate::command::ToolCommand;

/// Convert `input` to `format` with `soffice --headless --convert-to`,
/// returning the produced file.
///
/// LibreOffice always names its output after the input stem, so the result
/// lands at `{outdir}/{input_stem}.{format}`; callers rename if they want a
/// different basename.
pub(crate) async fn soffice_convert(
    soffice: PathBuf,
    input: &Path,
    format: &str,
    outdir: &Path,
) -> Result<PathBuf> {
    ToolCommand::new(soffice)
        .arg("--headless")
        .arg("--convert-to")
        .arg(format)
        .arg("--outdir")
        .arg(outdir.display().to_string())
        .arg(input.display().to_string())
        .execute()
        .await?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let produced = outdir.join(format!("{stem}.{format}"));

    if !produced.exists() {
        return Err(Error::engine(
            "soffice",
            format!("expected output {} was not produced", produced.display()),
        ));
    }

    Ok(produced)
}

/// Move the produced file to `target` when the requested basename differs
/// from what LibreOffice chose.
pub(crate) async fn place_output(produced: PathBuf, target: &Path) -> Result<PathBuf> {
    if produced == target {
        return Ok(produced);
    }
    if tokio::fs::rename(&produced, target).await.is_err() {
        tokio::fs::copy(&produced, target).await.map_err(Error::Io)?;
        let _ = tokio::fs::remove_file(&produced).await;
    }
    Ok(target.to_path_buf())
}
