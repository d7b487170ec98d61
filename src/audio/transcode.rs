use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TranscriberError};

use super::{ChunkSpec, MediaFile, MediaTool};

/// Extension of upload-ready audio (Opus in Ogg).
pub const AUDIO_EXTENSION: &str = "ogg";

/// Slack allowed between a chunk's end and the probed duration, which ffprobe
/// reports with limited precision.
const END_TOLERANCE: Duration = Duration::from_millis(1);

/// Produces upload-ready audio files inside a work directory.
pub struct Transcoder<'a> {
    tool: &'a dyn MediaTool,
    work_dir: PathBuf,
}

impl<'a> Transcoder<'a> {
    pub fn new(tool: &'a dyn MediaTool, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            work_dir: work_dir.into(),
        }
    }

    /// Transcode the whole source into `<work_dir>/<stem>.ogg`.
    pub async fn convert_whole(&self, media: &MediaFile) -> Result<PathBuf> {
        let output = self
            .work_dir
            .join(format!("{}.{AUDIO_EXTENSION}", file_stem(&media.path)));

        info!("Converting {} to {}", media.path.display(), AUDIO_EXTENSION);
        self.tool.transcode(&media.path, None, &output).await?;
        ensure_created(&output)?;

        Ok(output)
    }

    /// Transcode only `[chunk.start, chunk.end)` of the source into the chunk's temp file.
    pub async fn extract_chunk(&self, media: &MediaFile, chunk: &ChunkSpec) -> Result<PathBuf> {
        if chunk.start >= chunk.end {
            return Err(TranscriberError::Transcode(format!(
                "Chunk {} has an empty range ({:.3}s..{:.3}s)",
                chunk.index,
                chunk.start.as_secs_f64(),
                chunk.end.as_secs_f64()
            )));
        }

        if chunk.end > media.duration + END_TOLERANCE {
            return Err(TranscriberError::Transcode(format!(
                "Chunk {} ends at {:.3}s, past the end of {} ({:.3}s)",
                chunk.index,
                chunk.end.as_secs_f64(),
                media.path.display(),
                media.duration.as_secs_f64()
            )));
        }

        let output = chunk.temp_path(&self.work_dir, &file_stem(&media.path), AUDIO_EXTENSION);

        debug!(
            "Extracting chunk {}: {:.2}s to {:.2}s",
            chunk.index,
            chunk.start.as_secs_f64(),
            chunk.end.as_secs_f64()
        );
        self.tool
            .transcode(&media.path, Some(chunk.range()), &output)
            .await?;
        ensure_created(&output)?;

        Ok(output)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string())
}

fn ensure_created(output: &Path) -> Result<()> {
    if output.exists() {
        Ok(())
    } else {
        Err(TranscriberError::Transcode(format!(
            "Output file {} was not created",
            output.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TimeRange;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records transcode calls and optionally skips writing the output.
    #[derive(Default)]
    struct RecordingTool {
        calls: Mutex<Vec<(PathBuf, Option<TimeRange>, PathBuf)>>,
        skip_output: bool,
    }

    #[async_trait]
    impl MediaTool for RecordingTool {
        async fn probe(&self, path: &Path) -> Result<MediaFile> {
            Err(TranscriberError::Probe(format!("unexpected probe of {}", path.display())))
        }

        async fn transcode(
            &self,
            input: &Path,
            range: Option<TimeRange>,
            output: &Path,
        ) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((input.to_path_buf(), range, output.to_path_buf()));
            if !self.skip_output {
                std::fs::write(output, b"OggS")?;
            }
            Ok(())
        }
    }

    fn media() -> MediaFile {
        MediaFile {
            path: PathBuf::from("/recordings/standup.m4a"),
            duration: Duration::from_secs(120),
            size: 60 * 1024 * 1024,
        }
    }

    fn chunk(index: usize, start: u64, end: u64) -> ChunkSpec {
        ChunkSpec {
            index,
            start: Duration::from_secs(start),
            end: Duration::from_secs(end),
        }
    }

    #[tokio::test]
    async fn test_convert_whole() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RecordingTool::default();
        let transcoder = Transcoder::new(&tool, dir.path());

        let output = transcoder.convert_whole(&media()).await.unwrap();

        assert_eq!(output, dir.path().join("standup.ogg"));
        let calls = tool.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/recordings/standup.m4a"));
        assert!(calls[0].1.is_none());
    }

    #[tokio::test]
    async fn test_extract_chunk_passes_range() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RecordingTool::default();
        let transcoder = Transcoder::new(&tool, dir.path());

        let output = transcoder
            .extract_chunk(&media(), &chunk(1, 40, 80))
            .await
            .unwrap();

        assert_eq!(output, dir.path().join("standup-chunk_001.ogg"));
        assert!(output.exists());
        let calls = tool.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            Some(TimeRange {
                start: Duration::from_secs(40),
                end: Duration::from_secs(80),
            })
        );
    }

    #[tokio::test]
    async fn test_extract_chunk_rejects_invalid_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RecordingTool::default();
        let transcoder = Transcoder::new(&tool, dir.path());

        let empty = transcoder.extract_chunk(&media(), &chunk(0, 40, 40)).await;
        assert!(matches!(empty, Err(TranscriberError::Transcode(_))));

        let past_end = transcoder.extract_chunk(&media(), &chunk(2, 80, 121)).await;
        assert!(matches!(past_end, Err(TranscriberError::Transcode(_))));

        assert!(tool.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_output_is_transcode_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RecordingTool {
            skip_output: true,
            ..Default::default()
        };
        let transcoder = Transcoder::new(&tool, dir.path());

        let err = transcoder.convert_whole(&media()).await.unwrap_err();
        assert!(matches!(err, TranscriberError::Transcode(_)));
    }
}
