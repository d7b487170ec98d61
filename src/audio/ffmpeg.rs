use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, TranscriberError};

use super::{MediaFile, MediaTool, TimeRange};

/// Sample rate of the upload audio; the API resamples to 16 kHz anyway.
const SAMPLE_RATE: &str = "16000";

/// [`MediaTool`] backed by the `ffprobe` and `ffmpeg` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: String,
    ffprobe: String,
    bitrate: String,
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            bitrate: "32k".to_string(),
        }
    }
}

impl FfmpegTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Opus bitrate of transcoded audio (e.g. `32k`).
    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    /// Use binaries other than the `ffmpeg`/`ffprobe` found on `PATH`.
    pub fn with_programs(mut self, ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    /// Check that both binaries can be executed.
    pub async fn check(&self) -> Result<()> {
        check_program(&self.ffprobe, TranscriberError::Probe).await?;
        check_program(&self.ffmpeg, TranscriberError::Transcode).await?;
        debug!("{} and {} are available", self.ffmpeg, self.ffprobe);
        Ok(())
    }

    fn transcode_args(&self, input: &Path, range: Option<TimeRange>, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec!["-v".into(), "error".into(), "-y".into()];

        if let Some(range) = range {
            args.push("-ss".into());
            args.push(format!("{:.3}", range.start.as_secs_f64()));
            args.push("-t".into());
            args.push(format!("{:.3}", range.duration().as_secs_f64()));
        }

        args.push("-i".into());
        args.push(input.display().to_string());
        args.extend(
            ["-vn", "-ac", "1", "-ar", SAMPLE_RATE, "-c:a", "libopus", "-b:a"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(self.bitrate.clone());
        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe(&self, path: &Path) -> Result<MediaFile> {
        if !path.exists() {
            return Err(TranscriberError::Probe(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration,size",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscriberError::Probe(spawn_error_message(&self.ffprobe, &e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriberError::Probe(format!(
                "{} is not a readable media file: {}",
                path.display(),
                stderr.trim()
            )));
        }

        let (duration, size) = parse_probe_output(&output.stdout)?;
        debug!(
            "Probed {}: {:.2}s, {} bytes",
            path.display(),
            duration.as_secs_f64(),
            size
        );

        Ok(MediaFile {
            path: path.to_path_buf(),
            duration,
            size,
        })
    }

    async fn transcode(
        &self,
        input: &Path,
        range: Option<TimeRange>,
        output: &Path,
    ) -> Result<()> {
        let args = self.transcode_args(input, range, output);
        debug!("Running {} {}", self.ffmpeg, args.join(" "));

        let result = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscriberError::Transcode(spawn_error_message(&self.ffmpeg, &e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(TranscriberError::Transcode(format!(
                "{} exited with {}: {}",
                self.ffmpeg,
                result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

async fn check_program(program: &str, stage: fn(String) -> TranscriberError) -> Result<()> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| stage(spawn_error_message(program, &e)))?;

    if !output.status.success() {
        return Err(stage(format!("{program} -version exited with {}", output.status)));
    }
    Ok(())
}

fn spawn_error_message(program: &str, e: &std::io::Error) -> String {
    if e.kind() == ErrorKind::NotFound {
        format!("{program} not found. Please install FFmpeg and ensure it's in your PATH")
    } else {
        format!("Failed to run {program}: {e}")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

/// Parse `ffprobe -show_entries format=duration,size -of json` output.
fn parse_probe_output(stdout: &[u8]) -> Result<(Duration, u64)> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| TranscriberError::Probe(format!("Unexpected ffprobe output: {e}")))?;

    let format = parsed
        .format
        .ok_or_else(|| TranscriberError::Probe("ffprobe reported no format section".to_string()))?;

    let duration_str = format
        .duration
        .ok_or_else(|| TranscriberError::Probe("ffprobe reported no duration".to_string()))?;
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        TranscriberError::Probe(format!("Failed to parse duration '{duration_str}': {e}"))
    })?;
    let duration = Duration::try_from_secs_f64(duration_secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            TranscriberError::Probe(format!("Invalid media duration: {duration_secs}"))
        })?;

    let size_str = format
        .size
        .ok_or_else(|| TranscriberError::Probe("ffprobe reported no size".to_string()))?;
    let size: u64 = size_str.trim().parse().map_err(|e| {
        TranscriberError::Probe(format!("Failed to parse size '{size_str}': {e}"))
    })?;

    Ok((duration, size))
}
