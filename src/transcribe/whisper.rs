use crate::error::{Result, TranscriberError};
use crate::transcribe::{Transcriber, Transcript, TranscriptSegment};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

/// OpenAI API base URL.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Maximum file size for the Whisper API (25 MB).
pub const MAX_FILE_SIZE: u64 = 25 * 1024 * 1024;

/// Retries after the first attempt, for transient failures only.
const DEFAULT_MAX_RETRIES: u32 = 1;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// Whisper model variants.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WhisperModel {
    #[default]
    Whisper1,
    Other(String),
}

impl WhisperModel {
    fn as_str(&self) -> &str {
        match self {
            WhisperModel::Whisper1 => "whisper-1",
            WhisperModel::Other(name) => name,
        }
    }
}

impl From<&str> for WhisperModel {
    fn from(name: &str) -> Self {
        match name {
            "whisper-1" => WhisperModel::Whisper1,
            other => WhisperModel::Other(other.to_string()),
        }
    }
}

/// OpenAI Whisper API client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: WhisperModel,
    language: Option<String>,
    prompt: Option<String>,
    max_retries: u32,
    base_delay: Duration,
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
            model: WhisperModel::default(),
            language: None,
            prompt: None,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }

    /// Point the client at a different API root (e.g. a proxy or mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: WhisperModel) -> Self {
        self.model = model;
        self
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Set a prompt for vocabulary hints (max 224 tokens).
    pub fn with_prompt(mut self, prompt: String) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Configure retries of transient failures; `0` fails on the first error.
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.ogg")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("ogg") => "audio/ogg",
            Some("wav") => "audio/wav",
            Some("mp3" | "mpga" | "mpeg") => "audio/mpeg",
            Some("m4a" | "mp4") => "audio/mp4",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.as_str().to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        if let Some(ref prompt) = self.prompt {
            form = form.text("prompt", prompt.clone());
        }

        Ok(form)
    }

    /// Make the API request (form is consumed, so no retries at this level).
    async fn call_api(&self, form: Form) -> Result<WhisperResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            let body = response.text().await?;
            debug!("Whisper API response: {}", truncate(&body, 500));
            let parsed: WhisperResponse = serde_json::from_str(&body).map_err(malformed)?;
            return Ok(parsed);
        }

        let error_body = response.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ApiErrorResponse>(&error_body) {
            Ok(api_error) => match api_error.error.r#type {
                Some(kind) => format!("{} ({kind})", api_error.error.message),
                None => api_error.error.message,
            },
            Err(_) if error_body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string(),
            Err(_) => truncate(error_body.trim(), 500).to_string(),
        };

        Err(TranscriberError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Transcribe with retry logic - rebuilds form on each attempt.
    async fn transcribe_with_retry(&self, audio: &Path) -> Result<WhisperResponse> {
        let mut attempt = 0;

        loop {
            let form = self.build_form(audio).await?;

            match self.call_api(form).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    attempt += 1;
                    warn!(
                        "Attempt {} failed: {}. Retrying in {}ms",
                        attempt,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Convert a Whisper API response into an ordered transcript.
fn parse_response(response: WhisperResponse) -> Result<Transcript> {
    let api_segments = response.segments.ok_or_else(|| {
        malformed("response has no segments; was verbose_json honoured?")
    })?;

    let mut segments = Vec::with_capacity(api_segments.len());
    for seg in api_segments {
        let start = seconds(seg.start)?;
        let end = seconds(seg.end)?;
        if end < start {
            return Err(malformed(format!(
                "segment ends before it starts ({} > {})",
                seg.start, seg.end
            )));
        }
        segments.push(TranscriptSegment {
            index: 0,
            start,
            end,
            text: seg.text.trim().to_string(),
        });
    }

    segments.sort_by_key(|s| s.start);
    for (i, segment) in segments.iter_mut().enumerate() {
        segment.index = i + 1;
    }

    Ok(Transcript {
        segments,
        language: response.language,
    })
}

fn malformed(message: impl std::fmt::Display) -> TranscriberError {
    TranscriberError::Transcription(format!("Malformed transcription response: {message}"))
}

fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| malformed(format!("invalid timestamp {value}")))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        debug!("Transcribing {} with Whisper", audio.display());

        let metadata = fs::metadata(audio).await.map_err(|e| {
            TranscriberError::Transcription(format!("Cannot read {}: {e}", audio.display()))
        })?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(TranscriberError::Transcription(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let response = self.transcribe_with_retry(audio).await?;
        let transcript = parse_response(response)?;

        debug!(
            "Whisper returned {} segments for {}",
            transcript.segments.len(),
            audio.display()
        );

        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    fn max_file_size(&self) -> u64 {
        MAX_FILE_SIZE
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
}
