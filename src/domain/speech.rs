use serde::{Deserialize, Serialize};

use crate::domain::catalog::SpeechLanguage;
use crate::domain::config::SpeechConfig;
use crate::domain::DomainError;

/// Encoded audio container returned by speech synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }
}

/// What the user asked to have spoken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechOptions {
    pub text: String,
    pub language: SpeechLanguage,
    /// Voice id; `None` picks the language default.
    pub voice: Option<String>,
    #[serde(default)]
    pub format: AudioFormat,
}

/// Speech request as the shell sends it; unset fields take the configured
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechDraft {
    pub text: String,
    pub language: Option<SpeechLanguage>,
    pub voice: Option<String>,
    pub format: Option<AudioFormat>,
}

impl SpeechDraft {
    pub fn resolve(self, defaults: &SpeechConfig) -> SpeechOptions {
        SpeechOptions {
            text: self.text,
            language: self.language.unwrap_or(defaults.language),
            voice: self.voice,
            format: self.format.unwrap_or(defaults.format),
        }
    }
}

/// Wire body of the speech endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechRequest {
    pub model: String,
    pub voice: String,
    pub response_format: AudioFormat,
    pub input: String,
}

impl SpeechRequest {
    /// Validate options and resolve the model and voice.
    pub fn from_options(options: &SpeechOptions) -> Result<Self, DomainError> {
        if options.text.trim().is_empty() {
            return Err(DomainError::Validation(
                "Please enter some text to convert to speech".to_string(),
            ));
        }

        let voice = match options.voice.as_deref() {
            Some(v) if options.language.has_voice(v) => v.to_string(),
            Some(v) => {
                return Err(DomainError::Validation(format!(
                    "Voice '{}' is not available for {:?}",
                    v, options.language
                )))
            }
            None => options.language.default_voice().id.to_string(),
        };

        Ok(Self {
            model: options.language.tts_model().to_string(),
            voice,
            response_format: options.format,
            input: options.text.clone(),
        })
    }
}

/// Synthesized audio returned by the service.
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub audio: Vec<u8>,
    pub format: AudioFormat,
}
