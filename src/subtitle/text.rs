// Plain text transcription, one segment per line
use super::SubtitleFormatter;
use crate::transcribe::Transcript;

pub struct TextFormatter;

impl SubtitleFormatter for TextFormatter {
    fn format(&self, transcript: &Transcript) -> String {
        let mut output = String::new();
        for segment in transcript.segments.iter().filter(|s| !s.text.is_empty()) {
            output.push_str(&segment.text);
            output.push('\n');
        }
        output
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}
