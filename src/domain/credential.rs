use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Key under which the credential is stored in both key-value stores.
pub const CREDENTIAL_STORE_KEY: &str = "groq_api_key";

/// Literal prefix every API key carries.
pub const CREDENTIAL_PREFIX: &str = "gsk_";

/// Keys must be strictly longer than this.
pub const CREDENTIAL_MIN_LEN: usize = 20;

/// Opaque API secret. Debug output is redacted and the value is zeroized
/// when dropped.
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a raw secret without validating it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into()))
    }

    /// Trim and check the local format contract: non-empty, fixed prefix,
    /// length above the minimum.
    ///
    /// This is a fast heuristic only; the remote service stays authoritative.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Format(
                "Please enter a valid API key".to_string(),
            ));
        }

        if !trimmed.starts_with(CREDENTIAL_PREFIX) || trimmed.len() <= CREDENTIAL_MIN_LEN {
            return Err(DomainError::Format(format!(
                "Invalid API key format. API keys should start with \"{}\"",
                CREDENTIAL_PREFIX
            )));
        }

        Ok(Self::new(trimmed))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialOrigin {
    BuildConfig,
    DurableStore,
    EphemeralStore,
    UserEntry,
}

/// Resolution status of the credential session.
///
/// - Resolving -> Valid (candidate found in a source)
/// - Resolving -> Missing (no source had a key; entry prompt shown)
/// - Missing | Invalid -> Valid (submit accepted by the service)
/// - Missing | Invalid -> Invalid (submit rejected as unauthorized)
/// - any -> Missing (clear / logout)
/// - any -> Resolving (retry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Resolving,
    Valid,
    Missing,
    Invalid,
}

impl CredentialStatus {
    /// Whether network-dependent features may be used.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CredentialStatus::Valid)
    }

    /// Whether the user must be asked for a key.
    #[must_use]
    pub fn needs_prompt(&self) -> bool {
        matches!(self, CredentialStatus::Missing | CredentialStatus::Invalid)
    }
}

/// Serializable view of the credential session. Never carries the secret.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSnapshot {
    pub status: CredentialStatus,
    pub origin: Option<CredentialOrigin>,
    pub has_client: bool,
    pub failed_attempts: u32,
    pub last_error: Option<String>,
    pub prompt_visible: bool,
}

/// Events emitted by the credential session manager.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    StatusChanged {
        from: CredentialStatus,
        to: CredentialStatus,
    },
    /// The entry prompt became visible.
    PromptRequested,
    /// The entry prompt was dismissed after a successful resolution.
    PromptDismissed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(Credential::parse(""), Err(DomainError::Format(_))));
        assert!(matches!(Credential::parse("   "), Err(DomainError::Format(_))));
    }

    #[test]
    fn test_parse_rejects_bad_prefix() {
        assert!(matches!(
            Credential::parse("bad-prefix-key-1234567890"),
            Err(DomainError::Format(_))
        ));
    }

    #[test]
    fn test_parse_rejects_short_key() {
        // Exactly 20 characters is still too short.
        let key = format!("gsk_{}", "a".repeat(16));
        assert_eq!(key.len(), 20);
        assert!(Credential::parse(&key).is_err());
    }

    #[test]
    fn test_parse_trims_input() {
        let credential = Credential::parse("  gsk_validtestkey1234567890\n").unwrap();
        assert_eq!(credential.expose(), "gsk_validtestkey1234567890");
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential::new("gsk_secretsecretsecret123");
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_status_predicates() {
        assert!(CredentialStatus::Valid.is_authenticated());
        assert!(!CredentialStatus::Resolving.is_authenticated());
        assert!(CredentialStatus::Missing.needs_prompt());
        assert!(CredentialStatus::Invalid.needs_prompt());
        assert!(!CredentialStatus::Valid.needs_prompt());
    }
}
