use crate::audio::{plan_chunks, ChunkConfig, ChunkPlan, ChunkSpec, MediaFile, MediaTool, Transcoder};
use crate::config::{Config, OutputFormat};
use crate::error::{Result, TranscriberError};
use crate::subtitle::write_subtitles;
use crate::transcribe::{merge_transcripts, Transcriber, Transcript};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Configuration for the transcription pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Output format.
    pub format: OutputFormat,
    /// Chunk planning limits.
    pub chunking: ChunkConfig,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            chunking: ChunkConfig::default(),
            show_progress: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config, format: OutputFormat, show_progress: bool) -> Self {
        Self {
            format,
            chunking: ChunkConfig::from(config),
            show_progress,
        }
    }
}

/// Statistics from one transcription run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total time taken for the entire pipeline.
    pub total_time: Duration,
    /// Time spent transcoding.
    pub transcode_time: Duration,
    /// Time spent waiting on the transcription API.
    pub transcription_time: Duration,
    /// Number of audio chunks uploaded.
    pub chunks_processed: usize,
    /// Number of segments in the merged transcript.
    pub segments: usize,
    /// Duration of the source file.
    pub audio_duration: Duration,
    /// Size of the source file in bytes.
    pub source_size: u64,
    /// Provider used for transcription.
    pub provider: String,
}

/// Result of one transcription run.
#[derive(Debug)]
pub struct PipelineResult {
    /// Path to the written output file.
    pub output_path: PathBuf,
    /// The merged transcript.
    pub transcript: Transcript,
    /// Pipeline statistics.
    pub stats: PipelineStats,
}

/// Temp directory for one run's audio files, removed when dropped.
struct ScratchDir {
    dir: TempDir,
    completed: bool,
}

impl ScratchDir {
    fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("transcriber-").tempdir()?;
        debug!("Using temp directory: {:?}", dir.path());
        Ok(Self {
            dir,
            completed: false,
        })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        // TempDir removes the directory itself once this returns.
        if self.completed {
            debug!("Cleaning up temp directory: {:?}", self.dir.path());
        } else {
            warn!("Run did not complete, cleaning up temp files: {:?}", self.dir.path());
        }
    }
}

/// Derive the output path for `input`: next to it, or inside `output_dir` when given.
pub fn derive_output_path(input: &Path, format: OutputFormat, output_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let file_name = format!("{}.{}", stem.to_string_lossy(), format.extension());
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

/// Transcribe one media file into `output`.
///
/// The source is probed; if it fits within the upload limit it is converted and
/// sent whole, otherwise it is split by time into chunks that are extracted and
/// transcribed one at a time in order. Chunk transcripts are merged into one
/// timeline and written out. Temp audio is removed on every exit path, and the
/// first failure aborts the run without writing anything.
pub async fn transcribe_file(
    input: &Path,
    output: &Path,
    tool: &dyn MediaTool,
    transcriber: &dyn Transcriber,
    config: &PipelineConfig,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    if !input.exists() {
        return Err(TranscriberError::FileNotFound(input.display().to_string()));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 1: Probe and plan
    // ═══════════════════════════════════════════════════════════════════════
    info!("Probing {}", input.display());
    let media = tool.probe(input).await?;
    info!(
        "{}: {:.1}s, {:.2} MB",
        input.display(),
        media.duration.as_secs_f64(),
        media.size as f64 / (1024.0 * 1024.0)
    );

    let chunking = config.chunking.capped_at(transcriber.max_file_size());
    if chunking.max_upload_bytes < config.chunking.max_upload_bytes {
        warn!(
            "Upload limit lowered to {} bytes, the most {} accepts",
            chunking.max_upload_bytes,
            transcriber.name()
        );
    }
    let plan = plan_chunks(media.duration, media.size, &chunking)?;

    let mut scratch = ScratchDir::new()?;
    let transcoder = Transcoder::new(tool, scratch.path());

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 2: Transcode and transcribe, chunk by chunk
    // ═══════════════════════════════════════════════════════════════════════
    let (results, transcode_time, transcription_time) =
        transcribe_chunks(&media, &plan, &transcoder, transcriber, config.show_progress).await?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 3: Merge and write
    // ═══════════════════════════════════════════════════════════════════════
    let transcript = merge_transcripts(&results)?;
    write_subtitles(&transcript, output, config.format)?;
    scratch.completed = true;

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        transcode_time,
        transcription_time,
        chunks_processed: results.len(),
        segments: transcript.segments.len(),
        audio_duration: media.duration,
        source_size: media.size,
        provider: transcriber.name().to_string(),
    };

    Ok(PipelineResult {
        output_path: output.to_path_buf(),
        transcript,
        stats,
    })
}

async fn transcribe_chunks(
    media: &MediaFile,
    plan: &ChunkPlan,
    transcoder: &Transcoder<'_>,
    transcriber: &dyn Transcriber,
    show_progress: bool,
) -> Result<(Vec<(ChunkSpec, Transcript)>, Duration, Duration)> {
    let mut transcode_time = Duration::ZERO;
    let mut transcription_time = Duration::ZERO;
    let mut results = Vec::with_capacity(plan.len());

    let progress_bar = show_progress.then(|| {
        let pb = ProgressBar::new(plan.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    info!(
        "Transcribing {} chunk(s) with {}",
        plan.len(),
        transcriber.name()
    );

    for chunk in plan.iter() {
        if let Some(pb) = &progress_bar {
            pb.set_message(format!("converting chunk {}", chunk.index + 1));
        }

        let started = Instant::now();
        let audio = if plan.is_single() {
            transcoder.convert_whole(media).await?
        } else {
            transcoder.extract_chunk(media, chunk).await?
        };
        transcode_time += started.elapsed();

        if let Some(pb) = &progress_bar {
            pb.set_message(format!("transcribing chunk {}", chunk.index + 1));
        }

        let started = Instant::now();
        let transcript = transcriber.transcribe(&audio).await?;
        transcription_time += started.elapsed();

        debug!(
            "Chunk {} ({:.1}s..{:.1}s): {} segments",
            chunk.index,
            chunk.start.as_secs_f64(),
            chunk.end.as_secs_f64(),
            transcript.segments.len()
        );

        if let Err(e) = std::fs::remove_file(&audio) {
            debug!("Could not remove {}: {}", audio.display(), e);
        }

        if let Some(pb) = &progress_bar {
            pb.inc(1);
        }
        results.push((chunk.clone(), transcript));
    }

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    Ok((results, transcode_time, transcription_time))
}

/// Print a summary of a batch of runs.
pub fn print_summary(results: &[PipelineResult]) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                    Transcription Complete                     ");
    println!("═══════════════════════════════════════════════════════════════");
    for result in results {
        println!();
        println!("  Output:     {}", result.output_path.display());
        println!("  Segments:   {}", result.stats.segments);
        println!("  Provider:   {}", result.stats.provider);
        println!(
            "  Duration:   {:.1}s audio ({:.2} MB)",
            result.stats.audio_duration.as_secs_f64(),
            result.stats.source_size as f64 / (1024.0 * 1024.0)
        );
        println!(
            "  Timing:     convert {:.2}s, transcribe {:.2}s ({} chunks), total {:.2}s",
            result.stats.transcode_time.as_secs_f64(),
            result.stats.transcription_time.as_secs_f64(),
            result.stats.chunks_processed,
            result.stats.total_time.as_secs_f64()
        );
        if let Some(ref language) = result.transcript.language {
            println!("  Language:   {}", language);
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
