use crate::audio::ChunkSpec;
use crate::error::{Result, TranscriberError};
use crate::transcribe::{Transcript, TranscriptSegment};
use std::time::Duration;
use tracing::debug;

/// Stitch per-chunk transcripts into one timeline.
///
/// Chunks are folded in order with a running offset that starts at zero. Each
/// segment is shifted by the offset and renumbered; after a chunk the offset
/// grows by the end time of that chunk's last raw segment. Chunks with no
/// segments leave the offset unchanged.
///
/// The offset follows transcribed content rather than the chunk boundaries in
/// the source, so audio the API trims from the end of a chunk (trailing
/// silence) pulls later chunks earlier.
pub fn merge_transcripts(chunks: &[(ChunkSpec, Transcript)]) -> Result<Transcript> {
    if chunks.is_empty() {
        return Err(TranscriberError::Merge(
            "No chunk transcripts to merge".to_string(),
        ));
    }

    let (merged, _) = chunks.iter().fold(
        (Transcript::default(), Duration::ZERO),
        |(mut merged, offset), (chunk, transcript)| {
            for segment in &transcript.segments {
                merged.segments.push(TranscriptSegment {
                    index: merged.segments.len() + 1,
                    start: segment.start + offset,
                    end: segment.end + offset,
                    text: segment.text.clone(),
                });
            }

            if merged.language.is_none() {
                merged.language = transcript.language.clone();
            }

            let next_offset = offset + transcript.last_end().unwrap_or(Duration::ZERO);
            debug!(
                "Chunk {}: {} segments, offset {:.3}s -> {:.3}s",
                chunk.index,
                transcript.segments.len(),
                offset.as_secs_f64(),
                next_offset.as_secs_f64()
            );

            (merged, next_offset)
        },
    );

    Ok(merged)
}
