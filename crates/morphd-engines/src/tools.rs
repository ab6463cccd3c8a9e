//! External engine detection and path resolution.

use std::path::PathBuf;
use std::process::Command;

use morphd_core::{Error, Result};

/// Information about an external engine binary.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use morphd_engines::check_tool;
///
/// let info = check_tool("ffmpeg");
/// if info.available {
///     println!("ffmpeg version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_with_arg(name, "--version")
}

/// Check if a tool is available using a custom version argument.
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    let result = Command::new(name).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            // Some tools (pdftoppm) print the version banner to stderr.
            let banner = if output.stdout.is_empty() {
                output.stderr.clone()
            } else {
                output.stdout.clone()
            };
            let version = String::from_utf8_lossy(&banner)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = which::which(name).ok();

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check all engines morphd can delegate to.
///
/// Returns information about ffmpeg, LibreOffice, pdftoppm, ImageMagick,
/// 7z, FontForge, and Calibre's ebook-convert.
pub fn check_tools() -> Vec<ToolInfo> {
    vec![
        check_tool_with_arg("ffmpeg", "-version"),
        check_tool("soffice"),
        check_tool_with_arg("pdftoppm", "-v"),
        check_tool("magick"),
        check_tool_with_arg("7z", "i"),
        check_tool("fontforge"),
        check_tool("ebook-convert"),
    ]
}

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an [`Error::Engine`] if the tool is not found on PATH.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::engine(name, "not found on PATH"))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&std::path::Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    require_tool(name)
}
