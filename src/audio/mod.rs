pub mod chunk;
pub mod ffmpeg;
pub mod transcode;

pub use chunk::{plan_chunks, ChunkConfig, ChunkPlan, ChunkSpec};
pub use ffmpeg::FfmpegTool;
pub use transcode::{Transcoder, AUDIO_EXTENSION};

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A probed media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub duration: Duration,
    pub size: u64,
}

/// A `[start, end)` time range within a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Duration,
    pub end: Duration,
}

impl TimeRange {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Access to the external media tools.
///
/// The production implementation shells out to `ffprobe`/`ffmpeg`; tests
/// substitute a fake that reports fixed durations and writes placeholder files.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Report the duration and size of `path`.
    async fn probe(&self, path: &Path) -> Result<MediaFile>;

    /// Transcode `input` (optionally only `range`) into upload-ready mono audio at `output`.
    async fn transcode(&self, input: &Path, range: Option<TimeRange>, output: &Path)
        -> Result<()>;
}
