use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::app::credentials::CredentialSessionManager;
use crate::app::playback::PlaybackController;
use crate::domain::catalog::{is_transcription_model, is_vision_model};
use crate::domain::config::VisionConfig;
use crate::domain::{
    AudioFormat, AudioPayload, DomainError, LoadGeneration, SourceLocator, SpeechOptions,
    SpeechRequest, TranscribeOptions, TranscriptionResult, VisionRequest,
};

/// Synthesized speech, already handed to the player.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechOutcome {
    pub source: SourceLocator,
    pub generation: LoadGeneration,
    pub format: AudioFormat,
    pub size_bytes: usize,
}

/// The speech, transcription and vision views.
///
/// Each call borrows the client read-only from the credential session and
/// fails with `NotAuthenticated` while there is none. Local validation runs
/// first so malformed input never reaches the network.
pub struct FeatureServices {
    credentials: Arc<CredentialSessionManager>,
    playback: Arc<PlaybackController>,
}

impl FeatureServices {
    pub fn new(
        credentials: Arc<CredentialSessionManager>,
        playback: Arc<PlaybackController>,
    ) -> Self {
        Self {
            credentials,
            playback,
        }
    }

    /// Synthesize speech and load the audio into the player.
    pub async fn synthesize(&self, options: &SpeechOptions) -> Result<SpeechOutcome, DomainError> {
        let request = SpeechRequest::from_options(options)?;
        let client = self.credentials.require_client()?;

        let speech = client.synthesize_speech(&request).await?;
        let size_bytes = speech.audio.len();
        let (source, generation) = self
            .playback
            .load_bytes(speech.audio, speech.format.mime_type());

        info!(source = %source, size_bytes, "Speech ready for playback");
        Ok(SpeechOutcome {
            source,
            generation,
            format: speech.format,
            size_bytes,
        })
    }

    pub async fn transcribe(
        &self,
        audio: &AudioPayload,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult, DomainError> {
        if !is_transcription_model(&options.model) {
            return Err(DomainError::Validation(format!(
                "Unsupported transcription model: {}",
                options.model
            )));
        }
        let client = self.credentials.require_client()?;
        client.transcribe(audio, options).await
    }

    pub async fn analyze_images(
        &self,
        request: &VisionRequest,
        tuning: &VisionConfig,
    ) -> Result<String, DomainError> {
        request.validate()?;
        if !is_vision_model(&request.model) {
            return Err(DomainError::Validation(format!(
                "Unsupported vision model: {}",
                request.model
            )));
        }
        let client = self.credentials.require_client()?;
        client.analyze_images(request, tuning).await
    }
}
