use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::domain::DomainError;

/// Audio container extensions the transcription endpoint accepts.
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[
    "flac", "mp3", "mp4", "mpeg", "mpga", "m4a", "ogg", "wav", "webm",
];

/// Upload limit of the free tier.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// File name given to microphone recordings.
pub const RECORDING_FILE_NAME: &str = "recording.wav";

/// Audio payload headed for transcription.
///
/// The bytes are zeroed when the payload is dropped; recorded speech never
/// lingers in freed memory.
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct AudioPayload {
    file_name: String,
    bytes: Vec<u8>,
}

impl AudioPayload {
    /// Wrap an uploaded file's contents, validating extension and size.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, DomainError> {
        let payload = Self {
            file_name: file_name.into(),
            bytes,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Wrap a host microphone capture.
    pub fn recording(bytes: Vec<u8>) -> Result<Self, DomainError> {
        Self::new(RECORDING_FILE_NAME, bytes)
    }

    /// Read an audio file from disk.
    pub async fn from_file(path: &Path) -> Result<Self, DomainError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| DomainError::Validation(format!("Not a file: {}", path.display())))?;

        // Check the extension before reading a potentially large file.
        validate_extension(&file_name)?;
        let bytes = tokio::fs::read(path).await?;
        Self::new(file_name, bytes)
    }

    fn validate(&self) -> Result<(), DomainError> {
        validate_extension(&self.file_name)?;

        if self.bytes.is_empty() {
            return Err(DomainError::Validation("Audio file is empty".to_string()));
        }

        if self.bytes.len() > MAX_AUDIO_BYTES {
            return Err(DomainError::Validation(format!(
                "File size exceeds 25MB limit. Current size: {:.2}MB",
                self.bytes.len() as f64 / (1024.0 * 1024.0)
            )));
        }

        Ok(())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Content type derived from the file name.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

fn validate_extension(file_name: &str) -> Result<(), DomainError> {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());

    match extension {
        Some(ext) if SUPPORTED_AUDIO_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(DomainError::Validation(format!(
            "Unsupported file format. Supported formats: {}",
            SUPPORTED_AUDIO_EXTENSIONS.join(", ")
        ))),
    }
}

/// Options for a transcription call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeOptions {
    pub model: String,
    /// ISO 639-1 code; `None` or `"auto"` lets the service detect.
    pub language: Option<String>,
}

impl TranscribeOptions {
    /// Language to send on the wire, if any.
    pub fn wire_language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "auto")
    }
}

/// One time-aligned span of a transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub avg_logprob: Option<f64>,
    #[serde(default)]
    pub no_speech_prob: Option<f64>,
}

/// Result of a transcription call (`verbose_json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
}
