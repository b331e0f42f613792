//! Content verification of downloaded files.
//!
//! A verifier is an opt-in post-transfer check. It gets the path of a finished
//! file and answers with either success or the diagnostic lines explaining why
//! the file is unplayable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Default program used by [`FfprobeVerifier`].
pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// Checks whether a local file holds playable media.
#[async_trait]
pub trait ContentVerifier: Send + Sync {
    /// Returns `Err` with diagnostic lines when the file is corrupt.
    async fn verify(&self, path: &Path) -> Result<(), Vec<String>>;
}

/// Verifies media by asking `ffprobe` for the container duration.
#[derive(Debug, Clone)]
pub struct FfprobeVerifier {
    program: PathBuf,
}

impl Default for FfprobeVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_FFPROBE)
    }
}

impl FfprobeVerifier {
    /// Uses `program` as the ffprobe executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ContentVerifier for FfprobeVerifier {
    #[instrument(skip(self), fields(program = %self.program.display()))]
    async fn verify(&self, path: &Path) -> Result<(), Vec<String>> {
        let output = Command::new(&self.program)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
            .arg(path)
            .output()
            .await
            .map_err(|e| vec![format!("could not run {}: {e}", self.program.display())])?;

        let diagnostics = diagnostic_lines(&output.stderr);
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let mut lines = vec![format!("{} exited with status {code}", self.program.display())];
            lines.extend(diagnostics);
            return Err(lines);
        }
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| vec![format!("unreadable probe output: {e}")])?;
        let duration = json
            .pointer("/format/duration")
            .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_f64().map(|f| f.to_string())));
        match duration {
            Some(duration) => {
                debug!(%duration, "media verified");
                Ok(())
            }
            None => Err(vec!["no media duration reported".to_string()]),
        }
    }
}

fn diagnostic_lines(stderr: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
