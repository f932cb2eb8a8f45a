use serde::{Deserialize, Serialize};

use crate::domain::catalog::SpeechLanguage;
use crate::domain::speech::AudioFormat;

/// Remote inference API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Network-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// When true, all network requests are blocked (default: false).
    pub local_only: bool,
    /// Domains requests may be sent to.
    pub allowed_domains: Vec<String>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            local_only: false,
            allowed_domains: Self::default_allowed_domains(),
        }
    }
}

impl PrivacyConfig {
    pub fn default_allowed_domains() -> Vec<String> {
        vec!["api.groq.com".to_string()]
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
    /// Maximum number of log files to keep.
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
            max_files: 7,
        }
    }
}

/// Audio player configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Volume of a freshly created player (0.0-1.0).
    pub default_volume: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { default_volume: 1.0 }
    }
}

/// Speech synthesis defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub language: SpeechLanguage,
    pub format: AudioFormat,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: SpeechLanguage::Arabic,
            format: AudioFormat::Wav,
        }
    }
}

/// Transcription defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub model: String,
    /// Language code (e.g., "en", "fr", "auto").
    pub language: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "whisper-large-v3-turbo".to_string(),
            language: "auto".to_string(),
        }
    }
}

/// Vision analysis defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            top_p: 0.9,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub privacy: PrivacyConfig,
    pub logging: LoggingConfig,
    pub playback: PlaybackConfig,
    pub speech: SpeechConfig,
    pub transcription: TranscriptionConfig,
    pub vision: VisionConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}
