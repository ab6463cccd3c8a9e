use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use morphd_engines::ToolOverrides;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Directory receiving finished artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Scratch space for intermediate artifacts.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Global bound on concurrently running conversions; also the batch
    /// fan-out width.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/tmp/morphd/output")
}
fn default_work_dir() -> PathBuf {
    PathBuf::from("/tmp/morphd/work")
}
fn default_max_concurrent_jobs() -> usize {
    2
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            work_dir: default_work_dir(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

/// Engine binary overrides. Anything left unset is resolved from PATH at
/// conversion time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,
    #[serde(default)]
    pub soffice: Option<PathBuf>,
    #[serde(default)]
    pub pdftoppm: Option<PathBuf>,
    #[serde(default)]
    pub magick: Option<PathBuf>,
    #[serde(default)]
    pub sevenzip: Option<PathBuf>,
    #[serde(default)]
    pub fontforge: Option<PathBuf>,
    #[serde(default)]
    pub ebook_convert: Option<PathBuf>,
}

impl ToolsConfig {
    pub fn overrides(&self) -> ToolOverrides {
        ToolOverrides {
            ffmpeg: self.ffmpeg.clone(),
            soffice: self.soffice.clone(),
            pdftoppm: self.pdftoppm.clone(),
            magick: self.magick.clone(),
            sevenzip: self.sevenzip.clone(),
            fontforge: self.fontforge.clone(),
            ebook_convert: self.ebook_convert.clone(),
        }
    }
}
