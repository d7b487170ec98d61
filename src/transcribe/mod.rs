pub mod merge;
pub mod whisper;

pub use merge::merge_transcripts;
pub use whisper::{WhisperClient, WhisperModel};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    /// 1-based position within its transcript.
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    pub language: Option<String>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End time of the last segment, if any.
    pub fn last_end(&self) -> Option<Duration> {
        self.segments.last().map(|s| s.end)
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;
    fn name(&self) -> &'static str;
    fn max_file_size(&self) -> u64;
}
