use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::domain::DomainError;

/// Media playback state machine.
///
/// State transitions:
/// - Idle -> Loading (load)
/// - Loading -> Ready (metadata loaded / can play)
/// - Loading -> Errored (decode or network failure)
/// - Ready | Paused | Ended -> Playing (play, host confirmed)
/// - Playing -> Paused (pause)
/// - Playing -> Ended (end of media)
/// - any loaded state -> Errored (host error, play rejected)
/// - any -> Loading (a fresh load)
///
/// Errored is only left through a new load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No source assigned.
    Idle,
    /// Source assigned, host is fetching and parsing it.
    Loading,
    /// Decodable and positioned, not playing.
    Ready,
    /// Host is actively decoding.
    Playing,
    /// Paused by the user.
    Paused,
    /// Reached the end of the media.
    Ended,
    /// Load or playback failed.
    Errored,
}

impl PlaybackState {
    #[must_use]
    pub fn can_play(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Ended
        )
    }

    #[must_use]
    pub fn can_pause(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }

    /// States in which the host holds a decoded resource.
    #[must_use]
    pub fn is_decoded(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Ended
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
            PlaybackState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Monotonic token identifying one `load()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoadGeneration(pub u64);

/// Identifier of a transient in-process resource (object URI analogue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobId(Uuid);

impl BlobId {
    pub const SCHEME_PREFIX: &'static str = "blob:playground/";

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::SCHEME_PREFIX, self.0)
    }
}

/// Identifies a playable audio resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SourceLocator {
    /// A URI fetched by the host.
    Remote(Url),
    /// A transient local resource owned by the blob registry.
    Local(BlobId),
}

impl SourceLocator {
    /// Parse a locator from its textual form.
    ///
    /// `blob:playground/<uuid>` maps to a local resource; anything else must
    /// be an absolute URI.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::Validation(
                "Source locator must not be empty".to_string(),
            ));
        }

        if let Some(id) = raw.strip_prefix(BlobId::SCHEME_PREFIX) {
            let uuid = Uuid::parse_str(id).map_err(|e| {
                DomainError::Validation(format!("Invalid local resource reference: {}", e))
            })?;
            return Ok(SourceLocator::Local(BlobId(uuid)));
        }

        Url::parse(raw)
            .map(SourceLocator::Remote)
            .map_err(|e| DomainError::Validation(format!("Invalid source URI '{}': {}", raw, e)))
    }

    pub fn local_id(&self) -> Option<BlobId> {
        match self {
            SourceLocator::Local(id) => Some(*id),
            SourceLocator::Remote(_) => None,
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Remote(url) => write!(f, "{}", url),
            SourceLocator::Local(id) => write!(f, "{}", id),
        }
    }
}

/// Snapshot of the single audio resource owned by the playback controller.
#[derive(Debug, Clone, Serialize)]
pub struct MediaSession {
    pub source: Option<SourceLocator>,
    pub state: PlaybackState,
    pub position_secs: f64,
    /// `None` until the host reports metadata.
    pub duration_secs: Option<f64>,
    pub volume: f64,
    pub last_error: Option<String>,
    pub generation: LoadGeneration,
}

impl MediaSession {
    pub fn new(volume: f64) -> Self {
        Self {
            source: None,
            state: PlaybackState::Idle,
            position_secs: 0.0,
            duration_secs: None,
            volume: clamp_volume(volume),
            last_error: None,
            generation: LoadGeneration(0),
        }
    }

    /// Playback progress as a percentage, 0 when the duration is unknown.
    pub fn progress_percent(&self) -> f64 {
        match self.duration_secs {
            Some(d) if d > 0.0 => (self.position_secs / d * 100.0).clamp(0.0, 100.0),
            _ => 0.0,
        }
    }

    /// Clamp a host-reported position against the known duration.
    pub(crate) fn bounded_position(&self, position_secs: f64) -> f64 {
        if !position_secs.is_finite() || position_secs < 0.0 {
            return 0.0;
        }
        match self.duration_secs {
            Some(d) => position_secs.min(d),
            None => position_secs,
        }
    }
}

/// Inbound signals from the host media primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MediaEvent {
    MetadataLoaded { duration_secs: f64 },
    CanPlay,
    TimeUpdate { position_secs: f64 },
    SeekCompleted { position_secs: f64 },
    Ended,
    Error { message: String },
}

/// Events emitted by the playback controller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PlaybackEvent {
    StateChanged {
        generation: LoadGeneration,
        from: PlaybackState,
        to: PlaybackState,
    },
    Error {
        generation: LoadGeneration,
        message: String,
    },
}

/// Clamp a volume level into `[0, 1]`. NaN is treated as silence.
pub fn clamp_volume(level: f64) -> f64 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// Format seconds as `MM:SS`. Unknown or invalid times render as `00:00`.
pub fn format_clock(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "00:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Shorten a track title to `max_len` characters, keeping a short file
/// extension intact and eliding the middle with ` ... `.
pub fn truncate_title(title: &str, max_len: usize) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= max_len {
        return title.to_string();
    }

    let slice = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };

    if let Some(dot) = chars.iter().rposition(|&c| c == '.') {
        let has_extension = dot > 0 && dot + 6 > chars.len();
        if has_extension {
            let ext_len = chars.len() - dot;
            let available = max_len as isize - ext_len as isize - 5;
            if available > 10 {
                let available = available as usize;
                let start_len = (available as f64 * 0.7).ceil() as usize;
                let end_len = (available as f64 * 0.3).floor() as usize;
                return format!(
                    "{} ... {}{}",
                    slice(0, start_len),
                    slice(dot - end_len, dot),
                    slice(dot, chars.len())
                );
            }
        }
    }

    let start_len = ((max_len as f64 * 0.7).ceil() as usize).min(chars.len());
    let end_len = ((max_len as f64 * 0.3).floor() as usize).saturating_sub(5);
    format!(
        "{} ... {}",
        slice(0, start_len),
        slice(chars.len() - end_len, chars.len())
    )
}

/// File name used when saving a track: non-alphanumerics become `_`,
/// lowercased, with the given extension appended.
pub fn download_file_name(title: &str, extension: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "audio".to_string() } else { stem };
    format!("{}.{}", stem, extension.trim_start_matches('.'))
}
