use crate::error::{Result, TranscriberError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upload limit of the transcription API, in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Srt,
    Txt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(OutputFormat::Srt),
            "txt" | "text" => Ok(OutputFormat::Txt),
            _ => Err(format!("Unknown format: {s}. Use 'srt' or 'txt'")),
        }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Srt => "srt",
            OutputFormat::Txt => "txt",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub max_upload_mb: u64,
    pub bitrate: String,
    pub fill_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "whisper-1".to_string(),
            language: None,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            bitrate: "32k".to_string(),
            fill_ratio: 1.0,
        }
    }
}

impl Config {
    /// Load from the default config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        match Self::config_file_path() {
            Some(path) => Self::load_from(&path),
            None => {
                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Load from `path` (a missing file yields defaults), then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            TranscriberError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;

        toml::from_str(&contents)
            .map_err(|e| TranscriberError::Config(format!("{}: {e}", path.display())))
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(model) = std::env::var("TRANSCRIBER_MODEL") {
            if !model.trim().is_empty() {
                self.model = model.trim().to_string();
            }
        }
    }

    /// Persist the file-backed settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| TranscriberError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Store `api_key` in the file at `path`, leaving its other settings as written.
    ///
    /// The file is re-read so environment overrides never end up persisted.
    pub fn save_api_key(path: &Path, api_key: &str) -> Result<()> {
        let mut stored = Self::read_file(path)?;
        stored.api_key = Some(api_key.to_string());
        stored.save_to(path)
    }

    pub fn validate(&self) -> Result<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => {
                return Err(TranscriberError::Config(
                    "API key not set. Export OPENAI_API_KEY or add api_key to the config file"
                        .to_string(),
                ))
            }
        }

        if self.max_upload_mb == 0 {
            return Err(TranscriberError::Config(
                "max_upload_mb must be greater than 0".to_string(),
            ));
        }

        if !(self.fill_ratio > 0.0 && self.fill_ratio <= 1.0) {
            return Err(TranscriberError::Config(format!(
                "fill_ratio must be in (0, 1], got {}",
                self.fill_ratio
            )));
        }

        Ok(())
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("transcriber").join("config.toml"))
    }
}
