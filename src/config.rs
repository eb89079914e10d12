use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, SubgenError};

fn default_beam_size() -> u32 {
    5
}

fn default_batch_size() -> usize {
    5
}

fn default_context_window_size() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub media: MediaConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to transcriber binary (e.g., whisper-cli)
    pub binary_path: String,
    /// Model name from the registry or a path to a ggml model file
    pub model: String,
    /// Directory that downloaded models are stored in
    pub models_dir: PathBuf,
    /// Source language hint; auto-detect when absent
    pub language: Option<String>,
    /// Beam search width
    pub beam_size: u32,
    /// Number of decoding threads
    pub threads: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Target language code; the translation stage is skipped when absent
    pub target_language: Option<String>,
    /// Ollama endpoint URL
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// Bearer token sent with translation requests
    pub api_key: Option<String>,
    /// Number of segments translated per request
    pub batch_size: usize,
    /// Number of preceding segments sent as read-only context
    pub context_window_size: usize,
    /// Per-request timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Sample rate of the extracted PCM audio
    pub sample_rate: u32,
    /// Channel count of the extracted PCM audio
    pub channels: u32,
    /// Directory for temporary audio artifacts; system temp dir when absent
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
    /// Base directory that relative video paths are resolved against
    pub media_root: Option<PathBuf>,
    /// How long finished tasks stay queryable; kept forever when absent
    pub retention_secs: Option<u64>,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper-cli".to_string(),
            model: "base".to_string(),
            models_dir: PathBuf::from(".subgen/models"),
            language: None,
            beam_size: default_beam_size(),
            threads: None,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            target_language: None,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            api_key: None,
            batch_size: default_batch_size(),
            context_window_size: default_context_window_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            work_dir: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            port: 8002,
            media_root: None,
            retention_secs: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubgenError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| SubgenError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubgenError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubgenError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.translate.batch_size == 0 {
            return Err(SubgenError::Config("translate.batch_size must be at least 1".to_string()));
        }
        if let Some(lang) = &self.translate.target_language {
            if lang.trim().is_empty() {
                return Err(SubgenError::Config("translate.target_language must not be empty".to_string()));
            }
        }
        Ok(())
    }
}
