//! Static model and voice catalog for the inference service.

use serde::{Deserialize, Serialize};

/// Languages supported by speech synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechLanguage {
    Arabic,
    English,
}

impl SpeechLanguage {
    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            SpeechLanguage::Arabic => "ar",
            SpeechLanguage::English => "en",
        }
    }

    /// Synthesis model serving this language.
    pub fn tts_model(&self) -> &'static str {
        match self {
            SpeechLanguage::Arabic => "playai-tts-arabic",
            SpeechLanguage::English => "playai-tts",
        }
    }

    /// Voice identifiers available for this language.
    pub fn voices(&self) -> &'static [Voice] {
        match self {
            SpeechLanguage::Arabic => ARABIC_VOICES,
            SpeechLanguage::English => ENGLISH_VOICES,
        }
    }

    pub fn default_voice(&self) -> &'static Voice {
        &self.voices()[0]
    }

    pub fn has_voice(&self, voice_id: &str) -> bool {
        self.voices().iter().any(|v| v.id == voice_id)
    }

    /// Whether text in this language is written right to left.
    pub fn is_rtl(&self) -> bool {
        matches!(self, SpeechLanguage::Arabic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub id: &'static str,
    pub name: &'static str,
}

const fn voice(id: &'static str, name: &'static str) -> Voice {
    Voice { id, name }
}

const ARABIC_VOICES: &[Voice] = &[
    voice("Nasser-PlayAI", "Nasser"),
    voice("Khalid-PlayAI", "Khalid"),
    voice("Amira-PlayAI", "Amira"),
    voice("Ahmad-PlayAI", "Ahmad"),
];

const ENGLISH_VOICES: &[Voice] = &[
    voice("Arista-PlayAI", "Arista"),
    voice("Atlas-PlayAI", "Atlas"),
    voice("Basil-PlayAI", "Basil"),
    voice("Briggs-PlayAI", "Briggs"),
    voice("Calum-PlayAI", "Calum"),
    voice("Celeste-PlayAI", "Celeste"),
    voice("Cheyenne-PlayAI", "Cheyenne"),
    voice("Chip-PlayAI", "Chip"),
    voice("Cillian-PlayAI", "Cillian"),
    voice("Deedee-PlayAI", "Deedee"),
    voice("Fritz-PlayAI", "Fritz"),
    voice("Gail-PlayAI", "Gail"),
    voice("Indigo-PlayAI", "Indigo"),
    voice("Mamaw-PlayAI", "Mamaw"),
    voice("Mason-PlayAI", "Mason"),
    voice("Mikail-PlayAI", "Mikail"),
    voice("Mitch-PlayAI", "Mitch"),
    voice("Quinn-PlayAI", "Quinn"),
    voice("Thunder-PlayAI", "Thunder"),
];

/// Speech-to-text models.
pub const TRANSCRIPTION_MODELS: &[&str] = &[
    "whisper-large-v3-turbo",
    "distil-whisper-large-v3-en",
    "whisper-large-v3",
];

/// Multimodal chat models accepting images.
pub const VISION_MODELS: &[&str] = &[
    "meta-llama/llama-4-scout-17b-16e-instruct",
    "meta-llama/llama-4-maverick-17b-128e-instruct",
];

/// Transcription language codes (ISO 639-1). `auto` lets the service detect.
pub const TRANSCRIPTION_LANGUAGES: &[&str] = &[
    "auto", "en", "ar", "es", "fr", "de", "it", "pt", "ru", "ja", "ko", "zh", "hi", "tr", "nl",
    "sv", "no", "da", "fi", "pl", "cs",
];

pub fn is_transcription_model(model: &str) -> bool {
    TRANSCRIPTION_MODELS.contains(&model)
}

pub fn is_vision_model(model: &str) -> bool {
    VISION_MODELS.contains(&model)
}
