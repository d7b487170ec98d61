use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, TranscriberError};

use super::TimeRange;

/// Configuration for chunk planning.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum upload size accepted by the API, in bytes.
    pub max_upload_bytes: u64,

    /// Share of `max_upload_bytes` each chunk should aim for.
    ///
    /// Values below 1.0 leave headroom for bitrate variance after transcoding.
    pub fill_ratio: f64,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            fill_ratio: 1.0,
        }
    }
}

impl ChunkConfig {
    /// Lower the upload limit to `limit` when it is configured above it.
    pub fn capped_at(&self, limit: u64) -> Self {
        Self {
            max_upload_bytes: self.max_upload_bytes.min(limit),
            fill_ratio: self.fill_ratio,
        }
    }
}

impl From<&Config> for ChunkConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes(),
            fill_ratio: config.fill_ratio,
        }
    }
}

/// One time slice of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
}

impl ChunkSpec {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Temp file for this chunk inside `dir`, e.g. `lecture-chunk_002.ogg`.
    pub fn temp_path(&self, dir: &Path, stem: &str, extension: &str) -> PathBuf {
        dir.join(format!("{stem}-chunk_{:03}.{extension}", self.index))
    }
}

/// Ordered, gap-free chunks covering the whole source duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunks: Vec<ChunkSpec>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Whether the source fits in a single upload.
    pub fn is_single(&self) -> bool {
        self.chunks.len() == 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChunkSpec> {
        self.chunks.iter()
    }
}

/// Plan how to split a file of `size_bytes` and `duration` into uploads.
///
/// Files within the limit get a single chunk. Larger files are divided by time
/// into `ceil(size / (max * fill_ratio))` equal intervals; the last interval
/// absorbs any rounding remainder so it ends exactly at `duration`. Byte sizes of
/// the transcoded chunks are not checked against the limit.
pub fn plan_chunks(duration: Duration, size_bytes: u64, config: &ChunkConfig) -> Result<ChunkPlan> {
    if duration.is_zero() {
        return Err(TranscriberError::Planning(
            "Source duration must be positive".to_string(),
        ));
    }

    if config.max_upload_bytes == 0 {
        return Err(TranscriberError::Planning(
            "Maximum upload size must be positive".to_string(),
        ));
    }

    if !(config.fill_ratio > 0.0 && config.fill_ratio <= 1.0) {
        return Err(TranscriberError::Planning(format!(
            "Fill ratio must be in (0, 1], got {}",
            config.fill_ratio
        )));
    }

    if size_bytes <= config.max_upload_bytes {
        debug!(
            "{} bytes fits within {} byte limit, single chunk",
            size_bytes, config.max_upload_bytes
        );
        return Ok(ChunkPlan {
            chunks: vec![ChunkSpec {
                index: 0,
                start: Duration::ZERO,
                end: duration,
            }],
        });
    }

    let target_bytes = ((config.max_upload_bytes as f64 * config.fill_ratio) as u64).max(1);
    let count = u32::try_from(size_bytes.div_ceil(target_bytes)).map_err(|_| {
        TranscriberError::Planning(format!(
            "{size_bytes} bytes would need too many chunks of {target_bytes} bytes"
        ))
    })?;

    let step = duration / count;
    if step.is_zero() {
        return Err(TranscriberError::Planning(format!(
            "Cannot split {:?} into {count} chunks",
            duration
        )));
    }

    let chunks: Vec<ChunkSpec> = (0..count)
        .map(|i| {
            let start = step * i;
            let end = if i + 1 == count {
                duration
            } else {
                step * (i + 1)
            };
            ChunkSpec {
                index: i as usize,
                start,
                end,
            }
        })
        .collect();

    info!(
        "File size {:.2} MB over {:.2} MB limit, splitting into {} chunks of ~{:.2}s",
        size_bytes as f64 / (1024.0 * 1024.0),
        config.max_upload_bytes as f64 / (1024.0 * 1024.0),
        count,
        step.as_secs_f64()
    );

    Ok(ChunkPlan { chunks })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn limit(max_upload_bytes: u64) -> ChunkConfig {
        ChunkConfig {
            max_upload_bytes,
            ..Default::default()
        }
    }

    fn assert_covers(plan: &ChunkPlan, duration: Duration) {
        assert!(!plan.is_empty());
        assert_eq!(plan.chunks[0].start, Duration::ZERO);
        assert_eq!(plan.chunks.last().unwrap().end, duration);

        for (i, chunk) in plan.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.end > chunk.start, "chunk {i} is empty: {chunk:?}");
        }
        for pair in plan.chunks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }

        let total: Duration = plan.iter().map(ChunkSpec::duration).sum();
        assert_eq!(total, duration);
    }

    #[test]
    fn test_chunk_config_default() {
        let config = ChunkConfig::default();
        assert_eq!(config.max_upload_bytes, 25 * MB);
        assert_eq!(config.fill_ratio, 1.0);
    }

    #[test]
    fn test_small_file_single_chunk() {
        let duration = Duration::from_secs_f64(93.4);
        let plan = plan_chunks(duration, 10 * MB, &limit(25 * MB)).unwrap();

        assert!(plan.is_single());
        assert_eq!(plan.chunks[0].start, Duration::ZERO);
        assert_eq!(plan.chunks[0].end, duration);
    }

    #[test]
    fn test_exactly_at_limit_single_chunk() {
        let plan = plan_chunks(Duration::from_secs(60), 25 * MB, &limit(25 * MB)).unwrap();
        assert!(plan.is_single());
    }

    #[test]
    fn test_sixty_mb_file_splits_into_three() {
        let duration = Duration::from_secs(120);
        let plan = plan_chunks(duration, 60 * MB, &limit(25 * MB)).unwrap();

        assert_eq!(plan.len(), 3);
        for chunk in plan.iter() {
            assert_eq!(chunk.duration(), Duration::from_secs(40));
        }
        assert_covers(&plan, duration);
    }

    #[test]
    fn test_remainder_goes_to_last_chunk() {
        let duration = Duration::from_secs_f64(100.000_000_001);
        let plan = plan_chunks(duration, 70 * MB, &limit(25 * MB)).unwrap();

        assert_eq!(plan.len(), 3);
        assert_covers(&plan, duration);
        assert!(plan.chunks[2].duration() >= plan.chunks[0].duration());
    }

    #[test]
    fn test_plans_cover_duration_for_many_inputs() {
        let durations = [0.5, 1.0, 7.3, 59.99, 120.0, 3601.123, 86_399.5];
        let ratios = [1.01, 1.5, 2.0, 2.4, 3.0, 7.77, 40.0];

        for &secs in &durations {
            for &ratio in &ratios {
                let duration = Duration::from_secs_f64(secs);
                let size = (25.0 * MB as f64 * ratio) as u64;
                let plan = plan_chunks(duration, size, &limit(25 * MB)).unwrap();

                assert!(plan.len() >= 2, "{secs}s at {ratio}x should split");
                assert_eq!(plan.len() as f64, ratio.ceil());
                assert_covers(&plan, duration);
            }
        }
    }

    #[test]
    fn test_fill_ratio_adds_headroom() {
        let config = ChunkConfig {
            max_upload_bytes: 25 * MB,
            fill_ratio: 0.9,
        };

        // 48 MB needs 2 chunks at the full limit but 3 at 90% of it.
        let plan = plan_chunks(Duration::from_secs(90), 48 * MB, &config).unwrap();
        assert_eq!(plan.len(), 3);
        assert_covers(&plan, Duration::from_secs(90));

        // Files under the limit stay whole regardless of headroom.
        let plan = plan_chunks(Duration::from_secs(90), 24 * MB, &config).unwrap();
        assert!(plan.is_single());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let err = plan_chunks(Duration::ZERO, 60 * MB, &limit(25 * MB)).unwrap_err();
        assert!(matches!(err, TranscriberError::Planning(_)));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = plan_chunks(Duration::from_secs(10), 60 * MB, &limit(0)).unwrap_err();
        assert!(matches!(err, TranscriberError::Planning(_)));
    }

    #[test]
    fn test_invalid_fill_ratio_rejected() {
        let config = ChunkConfig {
            max_upload_bytes: 25 * MB,
            fill_ratio: 0.0,
        };
        let err = plan_chunks(Duration::from_secs(10), 60 * MB, &config).unwrap_err();
        assert!(matches!(err, TranscriberError::Planning(_)));
    }

    #[test]
    fn test_capped_at() {
        let config = ChunkConfig {
            max_upload_bytes: 100 * MB,
            fill_ratio: 0.9,
        };
        let capped = config.capped_at(25 * MB);
        assert_eq!(capped.max_upload_bytes, 25 * MB);
        assert_eq!(capped.fill_ratio, 0.9);

        assert_eq!(limit(10 * MB).capped_at(25 * MB).max_upload_bytes, 10 * MB);
    }

    #[test]
    fn test_chunk_temp_path() {
        let chunk = ChunkSpec {
            index: 7,
            start: Duration::ZERO,
            end: Duration::from_secs(1),
        };
        let path = chunk.temp_path(Path::new("/tmp/run"), "lecture", "ogg");
        assert_eq!(path, PathBuf::from("/tmp/run/lecture-chunk_007.ogg"));
    }
}
