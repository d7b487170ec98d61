// SRT subtitle format
use super::SubtitleFormatter;
use crate::error::{Result, TranscriberError};
use crate::transcribe::{Transcript, TranscriptSegment};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

pub struct SrtFormatter;

impl SubtitleFormatter for SrtFormatter {
    fn format(&self, transcript: &Transcript) -> String {
        transcript
            .segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                format!(
                    "{}\n{} --> {}\n{}\n\n",
                    i + 1,
                    format_timestamp(segment.start),
                    format_timestamp(segment.end),
                    cue_text(&segment.text)
                )
            })
            .collect()
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

/// A blank line ends a cue, so empty lines inside the text are dropped.
fn cue_text(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_timestamp(d: Duration) -> String {
    let total_millis = (d.as_nanos() + 500_000) / 1_000_000;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1_000;
    let millis = total_millis % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

fn timing_regex() -> &'static Regex {
    static TIMING: OnceLock<Regex> = OnceLock::new();
    TIMING.get_or_init(|| {
        Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2,}):(\d{2}):(\d{2}),(\d{3})$")
            .expect("Invalid regex")
    })
}

fn captured_duration(caps: &regex::Captures<'_>, first: usize) -> Duration {
    let field = |i: usize| caps[first + i].parse::<u64>().unwrap_or(0);
    Duration::from_millis(field(0) * 3_600_000 + field(1) * 60_000 + field(2) * 1_000 + field(3))
}

/// Parse SRT content back into segments.
///
/// Block numbers are not trusted; segments are renumbered in file order.
/// Multi-line cue text is joined with `\n`.
pub fn parse_srt(content: &str) -> Result<Vec<TranscriptSegment>> {
    let normalized = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut segments = Vec::new();

    for block in normalized.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let lines: Vec<&str> = block.trim_matches('\n').lines().collect();

        if lines.len() < 2 {
            return Err(TranscriberError::SubtitleParse(format!(
                "Incomplete block: {block:?}"
            )));
        }

        lines[0].trim().parse::<usize>().map_err(|_| {
            TranscriberError::SubtitleParse(format!("Bad block number: {:?}", lines[0]))
        })?;

        let caps = timing_regex().captures(lines[1].trim()).ok_or_else(|| {
            TranscriberError::SubtitleParse(format!("Bad timing line: {:?}", lines[1]))
        })?;

        segments.push(TranscriptSegment {
            index: segments.len() + 1,
            start: captured_duration(&caps, 1),
            end: captured_duration(&caps, 5),
            text: lines[2..].join("\n"),
        });
    }

    Ok(segments)
}
