use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriberError {
    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Chunk planning failed: {0}")]
    Planning(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Transcription API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Merge failed: {0}")]
    Merge(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Invalid subtitle file: {0}")]
    SubtitleParse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed transcription response: {0}")]
    Json(#[from] serde_json::Error),
}

impl TranscriberError {
    /// Whether a transcription attempt that failed with this error may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            TranscriberError::Http(e) => e.is_timeout() || e.is_connect(),
            TranscriberError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscriberError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_classified_by_status() {
        let rate_limited = TranscriberError::Api {
            status: 429,
            message: "Rate limit reached".to_string(),
        };
        let server = TranscriberError::Api {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        let unauthorized = TranscriberError::Api {
            status: 401,
            message: "Incorrect API key provided".to_string(),
        };

        assert!(rate_limited.is_transient());
        assert!(server.is_transient());
        assert!(!unauthorized.is_transient());
    }

    #[test]
    fn test_stage_errors_are_not_transient() {
        assert!(!TranscriberError::Transcode("ffmpeg exited with 1".into()).is_transient());
        assert!(!TranscriberError::Merge("no chunks".into()).is_transient());
    }

    #[test]
    fn test_messages_name_the_stage() {
        assert_eq!(
            TranscriberError::Probe("ffprobe not found".into()).to_string(),
            "Probe failed: ffprobe not found"
        );
        assert_eq!(
            TranscriberError::Api {
                status: 413,
                message: "Maximum content size limit exceeded".into()
            }
            .to_string(),
            "Transcription API error (413): Maximum content size limit exceeded"
        );
    }
}
