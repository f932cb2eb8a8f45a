pub mod catalog;
pub mod config;
pub mod credential;
pub mod error;
pub mod playback;
pub mod speech;
pub mod transcription;
pub mod vision;

pub use catalog::SpeechLanguage;
pub use config::AppConfig;
pub use credential::{
    Credential, CredentialOrigin, CredentialSnapshot, CredentialStatus, SessionEvent,
};
pub use error::DomainError;
pub use playback::{
    BlobId, LoadGeneration, MediaEvent, MediaSession, PlaybackEvent, PlaybackState, SourceLocator,
};
pub use speech::{AudioFormat, SpeechDraft, SpeechOptions, SpeechRequest, SynthesizedSpeech};
pub use transcription::{AudioPayload, TranscribeOptions, TranscriptionResult};
pub use vision::{ImageInput, VisionRequest};
