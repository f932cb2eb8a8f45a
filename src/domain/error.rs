use crate::domain::playback::PlaybackState;
use thiserror::Error;

/// Domain-level errors for the playground core.
///
/// Every failure that crosses a component boundary is one of these variants.
/// Raw transport responses are mapped into them by explicit inspection in the
/// adapters; nothing untyped escapes.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{0}")]
    Format(String),

    #[error("{message}")]
    Auth { status: u16, message: String },

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimit,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Network request blocked: {reason}")]
    NetworkBlocked { reason: String },

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("No response received from the model")]
    EmptyResponse,

    #[error("A credential check is already in progress")]
    CredentialBusy,

    #[error("No valid API key is configured")]
    NotAuthenticated,

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Invalid playback state transition from {from:?} to {to:?}")]
    PlaybackStateTransition {
        from: PlaybackState,
        to: PlaybackState,
    },

    #[error("Invalid seek to {requested}s: {reason}")]
    InvalidSeek { requested: f64, reason: String },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl DomainError {
    /// Stable machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Format(_) => "FORMAT_ERROR",
            DomainError::Auth { .. } => "AUTH_ERROR",
            DomainError::RateLimit => "RATE_LIMIT",
            DomainError::Network(_) => "NETWORK_ERROR",
            DomainError::NetworkBlocked { .. } => "NETWORK_BLOCKED",
            DomainError::Api { status: 400, .. } => "BAD_REQUEST",
            DomainError::Api { status: 413, .. } => "PAYLOAD_TOO_LARGE",
            DomainError::Api { status, .. } if *status >= 500 => "SERVER_ERROR",
            DomainError::Api { .. } => "API_ERROR",
            DomainError::EmptyResponse => "EMPTY_RESPONSE",
            DomainError::CredentialBusy => "CREDENTIAL_BUSY",
            DomainError::NotAuthenticated => "NOT_AUTHENTICATED",
            DomainError::Playback(_) => "PLAYBACK_ERROR",
            DomainError::PlaybackStateTransition { .. } => "PLAYBACK_STATE",
            DomainError::InvalidSeek { .. } => "INVALID_SEEK",
            DomainError::Download(_) => "DOWNLOAD_ERROR",
            DomainError::Validation(_) => "VALIDATION_ERROR",
            DomainError::Config(_) => "CONFIG_ERROR",
            DomainError::Serialization(_) => "SERIALIZATION_ERROR",
            DomainError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether an explicit user retry may succeed. Nothing is retried
    /// automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            DomainError::RateLimit | DomainError::Network(_) | DomainError::CredentialBusy => true,
            DomainError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => DomainError::Auth {
                status,
                message: "Invalid API key. Please check your key and try again.".to_string(),
            },
            403 => DomainError::Auth {
                status,
                message: "API key lacks necessary permissions. Please check your key."
                    .to_string(),
            },
            429 => DomainError::RateLimit,
            _ => DomainError::Api {
                status,
                message: api_error_message(body),
            },
        }
    }
}

/// Pull `error.message` out of an OpenAI-style error body, falling back to
/// the raw (truncated) body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
