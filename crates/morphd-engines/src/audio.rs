//! Audio conversion via ffmpeg.

use std::path::PathBuf;

use async_trait::async_trait;

use morphd_core::{Category, Error, Result};

use crate::capability::{Capability, ConversionOutcome, ConvertRequest};
use crate::command::ToolCommand;
use crate::tools;

const INPUTS: &[&str] = &[
    "mp3", "wav", "flac", "ogg", "oga", "aac", "m4a", "wma", "opus", "aiff",
];
const OUTPUTS: &[&str] = &["mp3", "wav", "flac", "ogg", "aac", "m4a", "opus"];

/// Transcodes audio files by delegating to ffmpeg.
pub struct AudioCapability {
    ffmpeg: Option<PathBuf>,
}

impl AudioCapability {
    pub fn new(ffmpeg: Option<PathBuf>) -> Self {
        Self { ffmpeg }
    }
}

#[async_trait]
impl Capability for AudioCapability {
    fn category(&self) -> Category {
        Category::Audio
    }

    fn supported_inputs(&self) -> &'static [&'static str] {
        INPUTS
    }

    fn supported_outputs(&self) -> &'static [&'static str] {
        OUTPUTS
    }

    async fn convert(&self, req: &ConvertRequest) -> Result<ConversionOutcome> {
        let ffmpeg = tools::get_tool_path("ffmpeg", self.ffmpeg.as_deref())?;
        let output = req.single_output_path();

        // ffmpeg gives no percentage without parsing its progress stream;
        // report a coarse start milestone and let completion imply 100.
        req.report_progress(10);

        let mut cmd = ToolCommand::new(ffmpeg);
        cmd.arg("-y").arg("-i").arg(req.input.display().to_string());
        if let Some(ref bitrate) = req.options.audio_bitrate {
            cmd.arg("-b:a").arg(bitrate);
        }
        cmd.arg(output.display().to_string());
        cmd.execute().await?;

        if !output.exists() {
            return Err(Error::engine(
                "ffmpeg",
                format!("expected output {} was not produced", output.display()),
            ));
        }

        Ok(ConversionOutcome::Single(output))
    }
}
