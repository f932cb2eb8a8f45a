//! Boundary facade for the host shell.
//!
//! Every operation returns `Result<T, ErrorReport>`: failures leave here as
//! a message plus a stable machine code and never as a panic.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::app::{AppController, SpeechOutcome};
use crate::domain::catalog::{
    Voice, TRANSCRIPTION_LANGUAGES, TRANSCRIPTION_MODELS, VISION_MODELS,
};
use crate::domain::playback::{format_clock, truncate_title};
use crate::domain::{
    AppConfig, AudioPayload, CredentialSnapshot, DomainError, ImageInput, LoadGeneration,
    MediaEvent, MediaSession, SpeechDraft, SpeechLanguage, TranscribeOptions,
    TranscriptionResult, VisionRequest,
};

/// Longest track title the player bar shows.
const TITLE_DISPLAY_LEN: usize = 50;

/// User-facing error with diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
    /// Expandable context for diagnostics.
    pub detail: Option<String>,
    /// Whether an explicit retry may succeed.
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<DomainError> for ErrorReport {
    fn from(error: DomainError) -> Self {
        warn!(code = error.code(), error = %error, "Operation failed");
        Self {
            code: error.code(),
            message: error.to_string(),
            detail: Some(format!("{:?}", error)),
            retryable: error.is_retryable(),
            timestamp: Utc::now(),
        }
    }
}

type CommandResult<T> = Result<T, ErrorReport>;

// ==================== Config Commands ====================

pub fn get_config(controller: &AppController) -> AppConfig {
    controller.config()
}

pub fn update_config(controller: &AppController, config: AppConfig) -> CommandResult<()> {
    Ok(controller.update_config(config)?)
}

pub fn is_network_blocked(controller: &AppController) -> bool {
    controller.is_network_blocked()
}

/// Application paths information.
#[derive(Debug, Serialize)]
pub struct AppPaths {
    pub data_dir: String,
    pub logs_dir: String,
    pub downloads_dir: String,
    pub config_path: String,
}

pub fn get_paths(controller: &AppController) -> AppPaths {
    let display = |p: PathBuf| p.to_string_lossy().to_string();
    AppPaths {
        data_dir: display(controller.data_dir()),
        logs_dir: display(controller.logs_dir()),
        downloads_dir: display(controller.downloads_dir()),
        config_path: display(controller.config_path()),
    }
}

// ==================== Credential Commands ====================

/// Resolve the credential at startup. Safe to call repeatedly.
pub async fn resolve_credential(controller: &AppController) -> CredentialSnapshot {
    controller.credentials().resolve().await
}

pub async fn submit_credential(
    controller: &AppController,
    key: String,
) -> CommandResult<CredentialSnapshot> {
    Ok(controller.credentials().submit(&key).await?)
}

pub async fn clear_credential(controller: &AppController) -> CommandResult<CredentialSnapshot> {
    Ok(controller.credentials().clear().await?)
}

pub async fn retry_credential(controller: &AppController) -> CredentialSnapshot {
    controller.credentials().retry().await
}

pub async fn logout(controller: &AppController) -> CommandResult<()> {
    controller.credentials().logout().await?;
    controller.shutdown();
    Ok(())
}

pub fn dismiss_credential_prompt(controller: &AppController) {
    controller.credentials().dismiss_prompt();
}

pub fn get_credential_status(controller: &AppController) -> CredentialSnapshot {
    controller.credentials().snapshot()
}

// ==================== Playback Commands ====================

pub fn load_audio(controller: &AppController, source: String) -> CommandResult<LoadGeneration> {
    Ok(controller.playback().load(&source)?)
}

/// Forward a host media signal. Returns whether it was applied.
pub fn media_event(
    controller: &AppController,
    generation: LoadGeneration,
    event: MediaEvent,
) -> bool {
    controller.playback().handle_event(generation, event)
}

pub async fn play_audio(controller: &AppController) -> CommandResult<()> {
    Ok(controller.playback().play().await?)
}

pub fn pause_audio(controller: &AppController) -> CommandResult<()> {
    Ok(controller.playback().pause()?)
}

pub fn stop_audio(controller: &AppController) {
    controller.playback().stop();
}

pub fn seek_audio(controller: &AppController, position_secs: f64) -> CommandResult<()> {
    Ok(controller.playback().seek(position_secs)?)
}

pub fn set_volume(controller: &AppController, level: f64) -> f64 {
    controller.playback().set_volume(level)
}

/// Save the loaded audio. Defaults to the user's downloads directory.
pub async fn download_audio(
    controller: &AppController,
    title: String,
    dest_dir: Option<PathBuf>,
) -> CommandResult<String> {
    let dest_dir = dest_dir.unwrap_or_else(|| controller.downloads_dir());
    let path = controller.playback().download(&dest_dir, &title).await?;
    Ok(path.to_string_lossy().to_string())
}

/// Session snapshot plus the labels the player bar renders.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackStatus {
    #[serde(flatten)]
    pub session: MediaSession,
    pub position_label: String,
    pub duration_label: String,
    pub progress_percent: f64,
    pub can_play: bool,
    pub can_pause: bool,
    pub display_title: Option<String>,
}

impl PlaybackStatus {
    pub fn new(session: MediaSession, title: Option<&str>) -> Self {
        Self {
            position_label: format_clock(session.position_secs),
            duration_label: format_clock(session.duration_secs.unwrap_or(0.0)),
            progress_percent: session.progress_percent(),
            can_play: session.state.can_play(),
            can_pause: session.state.can_pause(),
            display_title: title.map(|t| truncate_title(t, TITLE_DISPLAY_LEN)),
            session,
        }
    }
}

pub fn get_playback_status(controller: &AppController, title: Option<String>) -> PlaybackStatus {
    PlaybackStatus::new(controller.playback().snapshot(), title.as_deref())
}

// ==================== Feature Commands ====================

/// Synthesize speech; language and format fall back to the configured
/// defaults when the draft leaves them out.
pub async fn synthesize_speech(
    controller: &AppController,
    draft: SpeechDraft,
) -> CommandResult<SpeechOutcome> {
    let options = draft.resolve(&controller.config().speech);
    Ok(controller.features().synthesize(&options).await?)
}

pub async fn transcribe_file(
    controller: &AppController,
    path: PathBuf,
    options: Option<TranscribeOptions>,
) -> CommandResult<TranscriptionResult> {
    let audio = AudioPayload::from_file(&path).await?;
    let options = options.unwrap_or_else(|| default_transcribe_options(controller));
    Ok(controller.features().transcribe(&audio, &options).await?)
}

/// Transcribe a microphone capture handed over by the host.
pub async fn transcribe_recording(
    controller: &AppController,
    bytes: Vec<u8>,
    options: Option<TranscribeOptions>,
) -> CommandResult<TranscriptionResult> {
    let audio = AudioPayload::recording(bytes)?;
    let options = options.unwrap_or_else(|| default_transcribe_options(controller));
    Ok(controller.features().transcribe(&audio, &options).await?)
}

pub async fn prepare_image_file(path: PathBuf) -> CommandResult<ImageInput> {
    Ok(ImageInput::from_file(Path::new(&path)).await?)
}

pub fn prepare_image_url(url: String) -> CommandResult<ImageInput> {
    Ok(ImageInput::from_url(&url)?)
}

/// Embed pasted clipboard image data.
pub fn prepare_image_bytes(
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
) -> CommandResult<ImageInput> {
    Ok(ImageInput::from_bytes(name, &mime_type, &bytes)?)
}

pub async fn analyze_images(
    controller: &AppController,
    request: VisionRequest,
) -> CommandResult<String> {
    let tuning = controller.config().vision;
    Ok(controller.features().analyze_images(&request, &tuning).await?)
}

fn default_transcribe_options(controller: &AppController) -> TranscribeOptions {
    let config = controller.config().transcription;
    TranscribeOptions {
        model: config.model,
        language: Some(config.language),
    }
}

// ==================== Catalog Commands ====================

#[derive(Debug, Serialize)]
pub struct LanguageVoices {
    pub language: SpeechLanguage,
    pub code: &'static str,
    pub rtl: bool,
    pub voices: &'static [Voice],
}

#[derive(Debug, Serialize)]
pub struct Catalog {
    pub speech: Vec<LanguageVoices>,
    pub transcription_models: &'static [&'static str],
    pub transcription_languages: &'static [&'static str],
    pub vision_models: &'static [&'static str],
}

pub fn get_catalog() -> Catalog {
    let speech = [SpeechLanguage::Arabic, SpeechLanguage::English]
        .into_iter()
        .map(|language| LanguageVoices {
            language,
            code: language.code(),
            rtl: language.is_rtl(),
            voices: language.voices(),
        })
        .collect();

    Catalog {
        speech,
        transcription_models: TRANSCRIPTION_MODELS,
        transcription_languages: TRANSCRIPTION_LANGUAGES,
        vision_models: VISION_MODELS,
    }
}
