pub mod srt;
pub mod text;

pub use srt::{parse_srt, SrtFormatter};
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::error::{Result, TranscriberError};
use crate::transcribe::Transcript;
use std::path::Path;
use tracing::info;

pub trait SubtitleFormatter {
    fn format(&self, transcript: &Transcript) -> String;
    fn extension(&self) -> &'static str;
}

pub fn create_formatter(format: OutputFormat) -> Box<dyn SubtitleFormatter> {
    match format {
        OutputFormat::Srt => Box::new(SrtFormatter),
        OutputFormat::Txt => Box::new(TextFormatter),
    }
}

/// Serialize `transcript` in `format` to `output`, creating parent directories.
pub fn write_subtitles(transcript: &Transcript, output: &Path, format: OutputFormat) -> Result<()> {
    let content = create_formatter(format).format(transcript);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            TranscriberError::Write(format!("Cannot create {}: {e}", parent.display()))
        })?;
    }

    std::fs::write(output, content)
        .map_err(|e| TranscriberError::Write(format!("Cannot write {}: {e}", output.display())))?;

    info!(
        "Wrote {} segments to {}",
        transcript.segments.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::TranscriptSegment;
    use std::time::Duration;

    fn sample() -> Transcript {
        Transcript {
            segments: vec![TranscriptSegment {
                index: 1,
                start: Duration::from_millis(1500),
                end: Duration::from_millis(4000),
                text: "Hello, world!".to_string(),
            }],
            language: None,
        }
    }

    #[test]
    fn test_create_formatter_factory() {
        assert_eq!(create_formatter(OutputFormat::Srt).extension(), "srt");
        assert_eq!(create_formatter(OutputFormat::Txt).extension(), "txt");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("transcriptions").join("talk.srt");

        write_subtitles(&sample(), &output, OutputFormat::Srt).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, "1\n00:00:01,500 --> 00:00:04,000\nHello, world!\n\n");
    }

    #[test]
    fn test_write_to_directory_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_subtitles(&sample(), dir.path(), OutputFormat::Srt).unwrap_err();
        assert!(matches!(err, TranscriberError::Write(_)));
    }
}
