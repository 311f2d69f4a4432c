//! Audio Transcoding
//!
//! Re-encoding is delegated to an external `ffmpeg` binary that reads the
//! source from stdin and writes the result to stdout.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to run transcoder: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Transcoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Transcoder produced no output")]
    EmptyOutput,
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: Bytes) -> Result<Bytes, TranscodeError>;

    /// MIME type of the produced bytes
    fn content_type(&self) -> &str;
}

/// Leaves bytes untouched; used for pure renames and dry tooling
#[derive(Debug, Clone)]
pub struct PassthroughTranscoder {
    content_type: String,
}

impl PassthroughTranscoder {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
        }
    }
}

#[async_trait]
impl Transcoder for PassthroughTranscoder {
    async fn transcode(&self, input: Bytes) -> Result<Bytes, TranscodeError> {
        Ok(input)
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Default arguments: strip video, encode Opus at 48 kbit/s in an Ogg container
pub fn default_ffmpeg_args() -> Vec<String> {
    ["-vn", "-c:a", "libopus", "-b:a", "48k", "-f", "ogg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Pipes bytes through an `ffmpeg` process
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    args: Vec<String>,
    content_type: String,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, args: Vec<String>, content_type: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
            content_type: content_type.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: Bytes) -> Result<Bytes, TranscodeError> {
        let mut child = Command::new(&self.binary)
            .args(["-hide_banner", "-loglevel", "error", "-i", "pipe:0"])
            .args(&self.args)
            .arg("pipe:1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Feed stdin from a separate task so a full stdout pipe cannot deadlock us
        let mut stdin = child.stdin.take().ok_or_else(|| {
            TranscodeError::Spawn(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin unavailable"))
        })?;
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;

        if let Ok(Err(e)) = writer.await {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(TranscodeError::Spawn(e));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.trim().lines().collect();
            return Err(TranscodeError::Failed {
                status: output.status.to_string(),
                stderr: lines[lines.len().saturating_sub(5)..].join("\n"),
            });
        }

        if output.stdout.is_empty() {
            return Err(TranscodeError::EmptyOutput);
        }

        Ok(Bytes::from(output.stdout))
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }
}
