use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::config::VisionConfig;
use crate::domain::vision::ChatCompletion;
use crate::domain::{
    AudioPayload, Credential, DomainError, SpeechRequest, SynthesizedSpeech, TranscribeOptions,
    TranscriptionResult, VisionRequest,
};
use crate::ports::{FormPart, HttpBody, HttpClient, HttpRequest, HttpResponse};

/// Entry of the model listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

/// Authenticated handle to the inference API.
///
/// Immutable once built: consumers share it by `Arc` and issue independent
/// one-shot requests through it.
pub struct GroqClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    credential: Credential,
}

impl GroqClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str, credential: &Credential) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: credential.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DomainError> {
        let response = self
            .http
            .execute(request.bearer(self.credential.clone()))
            .await?;

        if !response.is_success() {
            return Err(DomainError::from_status(response.status, &response.text()));
        }
        Ok(response)
    }

    /// List available models. Cheap; used to check that a key is accepted.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, DomainError> {
        let response = self.send(HttpRequest::get(self.url("models"))).await?;
        let list: ModelList = response.json()?;
        debug!(count = list.data.len(), "Models listed");
        Ok(list.data)
    }

    /// Synthesize speech; returns the encoded audio.
    pub async fn synthesize_speech(
        &self,
        request: &SpeechRequest,
    ) -> Result<SynthesizedSpeech, DomainError> {
        let body = serde_json::to_value(request)?;
        let response = self
            .send(HttpRequest::post(
                self.url("audio/speech"),
                HttpBody::Json(body),
            ))
            .await?;

        if response.body.is_empty() {
            return Err(DomainError::EmptyResponse);
        }

        info!(
            model = %request.model,
            voice = %request.voice,
            bytes = response.body.len(),
            "Speech synthesized"
        );

        Ok(SynthesizedSpeech {
            audio: response.body,
            format: request.response_format,
        })
    }

    /// Transcribe audio with segment-level timestamps.
    pub async fn transcribe(
        &self,
        audio: &AudioPayload,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult, DomainError> {
        let mut parts = vec![
            FormPart::File {
                name: "file".to_string(),
                file_name: audio.file_name().to_string(),
                mime_type: audio.mime_type(),
                bytes: audio.bytes().to_vec(),
            },
            FormPart::Text {
                name: "model".to_string(),
                value: options.model.clone(),
            },
            FormPart::Text {
                name: "response_format".to_string(),
                value: "verbose_json".to_string(),
            },
            FormPart::Text {
                name: "timestamp_granularities[]".to_string(),
                value: "segment".to_string(),
            },
        ];

        if let Some(language) = options.wire_language() {
            parts.push(FormPart::Text {
                name: "language".to_string(),
                value: language.to_string(),
            });
        }

        let response = self
            .send(HttpRequest::post(
                self.url("audio/transcriptions"),
                HttpBody::Multipart(parts),
            ))
            .await?;

        let result: TranscriptionResult = response.json()?;
        info!(
            model = %options.model,
            chars = result.text.len(),
            segments = result.segments.len(),
            "Transcription completed"
        );
        Ok(result)
    }

    /// Run a multimodal chat completion over the request's images.
    pub async fn analyze_images(
        &self,
        request: &VisionRequest,
        tuning: &VisionConfig,
    ) -> Result<String, DomainError> {
        let body = request.to_wire(tuning.temperature, tuning.max_tokens, tuning.top_p);
        let response = self
            .send(HttpRequest::post(
                self.url("chat/completions"),
                HttpBody::Json(body),
            ))
            .await?;

        let completion: ChatCompletion = response.json()?;
        let text = completion.into_text()?;
        info!(
            model = %request.model,
            images = request.images.len(),
            chars = text.len(),
            "Vision analysis completed"
        );
        Ok(text)
    }
}
