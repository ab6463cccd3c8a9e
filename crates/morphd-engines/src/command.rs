//! Builder for executing external engine commands with timeout support.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Command;

use morphd_core::{Error, Result};

/// Default engine timeout: 10 minutes. Conversions of large inputs are
/// slow; the timeout exists to reap wedged engines, not to police normal
/// work.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Output captured from an engine execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external engine invocations.
///
/// # Example
///
/// ```no_run
/// use morphd_engines::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> morphd_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-y")
///     .arg("-i").arg("/in/audio.wav")
///     .arg("/out/audio.mp3")
///     .execute()
///     .await?;
/// println!("{}", output.stderr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            current_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the child process. Needed by engines
    /// that resolve relative outputs against the cwd (7z repacking).
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::Engine`] if spawning the process fails.
    /// - [`Error::Engine`] if the process exits with a non-zero status;
    ///   the message carries trimmed stderr, which is what job records
    ///   surface to users.
    /// - [`Error::Engine`] if the process outlives the timeout.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let program_name = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!("Running {}: {:?}", program_name, self.args);

        let child = cmd
            .spawn()
            .map_err(|e| Error::engine(&program_name, format!("failed to spawn: {e}")))?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(Error::engine(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(Error::engine(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            // Timeout expired; the future owning the child is cancelled and
            // kill_on_drop reaps the process.
            Err(_elapsed) => Err(Error::engine(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}
