use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::adapters::GroqClient;
use crate::domain::credential::CREDENTIAL_STORE_KEY;
use crate::domain::{
    Credential, CredentialOrigin, CredentialSnapshot, CredentialStatus, DomainError, SessionEvent,
};
use crate::ports::{HttpClient, KeyValueStore};

/// Environment variable consulted for a build-time key.
pub const BUILD_CONFIG_VAR: &str = "GROQ_API_KEY";

/// Key baked in at compile time, or failing that the process environment
/// (which may have been populated from `.env`).
pub fn build_config_credential() -> Option<String> {
    option_env!("GROQ_API_KEY")
        .map(str::to_string)
        .or_else(|| std::env::var(BUILD_CONFIG_VAR).ok())
        .filter(|k| !k.trim().is_empty())
}

struct CredentialSession {
    credential: Option<Credential>,
    origin: Option<CredentialOrigin>,
    status: CredentialStatus,
    client: Option<Arc<GroqClient>>,
    failed_attempts: u32,
    last_error: Option<String>,
    prompt_visible: bool,
}

impl CredentialSession {
    fn new() -> Self {
        Self {
            credential: None,
            origin: None,
            status: CredentialStatus::Resolving,
            client: None,
            failed_attempts: 0,
            last_error: None,
            prompt_visible: false,
        }
    }
}

/// Owner of the single credential session.
///
/// Resolves a key from layered sources (build config, durable store,
/// ephemeral store), validates user-entered keys against the service and
/// hands out the authenticated client while the session is valid.
/// Resolution, submission and clearing are serialized by one async gate;
/// the session itself sits behind a `parking_lot` lock that is never held
/// across an await.
pub struct CredentialSessionManager {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    build_config: Option<String>,
    http: Arc<dyn HttpClient>,
    base_url: String,
    session: RwLock<CredentialSession>,
    gate: Mutex<()>,
    resolved: AtomicBool,
    event_sender: broadcast::Sender<SessionEvent>,
}

impl CredentialSessionManager {
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        ephemeral: Arc<dyn KeyValueStore>,
        build_config: Option<String>,
        http: Arc<dyn HttpClient>,
        base_url: &str,
    ) -> Self {
        let (event_sender, _) = broadcast::channel(32);
        Self {
            durable,
            ephemeral,
            build_config,
            http,
            base_url: base_url.to_string(),
            session: RwLock::new(CredentialSession::new()),
            gate: Mutex::new(()),
            resolved: AtomicBool::new(false),
            event_sender,
        }
    }

    /// Resolve the credential once. Later calls, concurrent ones included,
    /// return the settled snapshot without touching any source.
    pub async fn resolve(&self) -> CredentialSnapshot {
        let _gate = self.gate.lock().await;
        if !self.resolved.load(Ordering::SeqCst) {
            self.run_resolution();
            self.resolved.store(true, Ordering::SeqCst);
        }
        self.snapshot()
    }

    /// Re-run resolution from scratch, dropping any error state.
    pub async fn retry(&self) -> CredentialSnapshot {
        let _gate = self.gate.lock().await;
        {
            let mut session = self.session.write();
            session.failed_attempts = 0;
            session.last_error = None;
            self.transition(&mut session, CredentialStatus::Resolving);
        }
        self.run_resolution();
        self.resolved.store(true, Ordering::SeqCst);
        self.snapshot()
    }

    /// Validate a user-entered key and adopt it on success.
    ///
    /// Format problems fail without a network call. A second submission
    /// while one is pending fails with `CredentialBusy`.
    pub async fn submit(&self, candidate: &str) -> Result<CredentialSnapshot, DomainError> {
        let _gate = self.gate.try_lock().map_err(|_| {
            warn!("Credential submission rejected: another check is in flight");
            DomainError::CredentialBusy
        })?;

        let credential = match Credential::parse(candidate) {
            Ok(c) => c,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };

        let client = GroqClient::new(Arc::clone(&self.http), &self.base_url, &credential);
        if let Err(e) = client.list_models().await {
            warn!(code = e.code(), "Credential rejected");
            self.record_failure(&e);
            return Err(e);
        }

        self.persist(&credential);

        {
            let mut session = self.session.write();
            session.credential = Some(credential);
            session.origin = Some(CredentialOrigin::UserEntry);
            session.client = Some(Arc::new(client));
            session.failed_attempts = 0;
            session.last_error = None;
            self.transition(&mut session, CredentialStatus::Valid);
            self.dismiss_prompt_locked(&mut session);
        }
        self.resolved.store(true, Ordering::SeqCst);

        info!("Credential accepted and stored");
        Ok(self.snapshot())
    }

    /// Wipe the key from both stores and ask for a new one.
    ///
    /// Both stores are attempted even if the first removal fails; the first
    /// error is returned.
    pub async fn clear(&self) -> Result<CredentialSnapshot, DomainError> {
        let _gate = self.gate.lock().await;

        let durable = self.durable.remove(CREDENTIAL_STORE_KEY);
        let ephemeral = self.ephemeral.remove(CREDENTIAL_STORE_KEY);

        {
            let mut session = self.session.write();
            session.credential = None;
            session.origin = None;
            session.client = None;
            session.failed_attempts = 0;
            session.last_error = None;
            self.transition(&mut session, CredentialStatus::Missing);
        }

        durable?;
        ephemeral?;

        info!("Credential cleared");
        Ok(self.snapshot())
    }

    /// Clear the session and take the entry prompt down with it.
    pub async fn logout(&self) -> Result<(), DomainError> {
        self.clear().await?;
        let mut session = self.session.write();
        self.dismiss_prompt_locked(&mut session);
        info!("Logged out");
        Ok(())
    }

    /// Hide the entry prompt and continue unauthenticated.
    pub fn dismiss_prompt(&self) {
        let mut session = self.session.write();
        self.dismiss_prompt_locked(&mut session);
    }

    /// The authenticated client, present only while the session is valid.
    pub fn client(&self) -> Option<Arc<GroqClient>> {
        let session = self.session.read();
        if session.status.is_authenticated() {
            session.client.clone()
        } else {
            None
        }
    }

    pub fn require_client(&self) -> Result<Arc<GroqClient>, DomainError> {
        self.client().ok_or(DomainError::NotAuthenticated)
    }

    pub fn status(&self) -> CredentialStatus {
        self.session.read().status
    }

    pub fn snapshot(&self) -> CredentialSnapshot {
        let session = self.session.read();
        CredentialSnapshot {
            status: session.status,
            origin: session.origin,
            has_client: session.client.is_some(),
            failed_attempts: session.failed_attempts,
            last_error: session.last_error.clone(),
            prompt_visible: session.prompt_visible,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }

    /// Walk the sources in priority order; the first non-empty one wins and
    /// is trusted without a remote check.
    fn run_resolution(&self) {
        let found = self
            .build_config
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| (k.to_string(), CredentialOrigin::BuildConfig))
            .or_else(|| self.read_store(&*self.durable, CredentialOrigin::DurableStore))
            .or_else(|| self.read_store(&*self.ephemeral, CredentialOrigin::EphemeralStore));

        let mut session = self.session.write();
        match found {
            Some((raw, origin)) => {
                let credential = Credential::new(raw);
                let client = GroqClient::new(Arc::clone(&self.http), &self.base_url, &credential);
                session.credential = Some(credential);
                session.origin = Some(origin);
                session.client = Some(Arc::new(client));
                self.transition(&mut session, CredentialStatus::Valid);
                self.dismiss_prompt_locked(&mut session);
                info!(origin = ?origin, "Credential resolved");
            }
            None => {
                session.credential = None;
                session.origin = None;
                session.client = None;
                self.transition(&mut session, CredentialStatus::Missing);
                info!("No credential found; entry required");
            }
        }
    }

    fn read_store(
        &self,
        store: &dyn KeyValueStore,
        origin: CredentialOrigin,
    ) -> Option<(String, CredentialOrigin)> {
        match store.get(CREDENTIAL_STORE_KEY) {
            Ok(Some(value)) if !value.trim().is_empty() => Some((value.trim().to_string(), origin)),
            Ok(_) => None,
            Err(e) => {
                warn!(store = store.name(), error = %e, "Failed to read credential store");
                None
            }
        }
    }

    /// Durable first; the ephemeral store keeps the key for this session if
    /// the durable write fails.
    fn persist(&self, credential: &Credential) {
        match self.durable.set(CREDENTIAL_STORE_KEY, credential.expose()) {
            Ok(()) => debug!(store = self.durable.name(), "Credential persisted"),
            Err(e) => {
                warn!(error = %e, "Durable credential write failed, keeping it for this session only");
                if let Err(e) = self.ephemeral.set(CREDENTIAL_STORE_KEY, credential.expose()) {
                    warn!(error = %e, "Ephemeral credential write failed");
                }
            }
        }
    }

    fn record_failure(&self, error: &DomainError) {
        let mut session = self.session.write();
        session.failed_attempts += 1;
        session.last_error = Some(error.to_string());

        if matches!(error, DomainError::Auth { .. }) {
            session.credential = None;
            session.origin = None;
            session.client = None;
            self.transition(&mut session, CredentialStatus::Invalid);
        }
    }

    /// Move to `to`; a status that needs a key also raises the prompt, even
    /// when the status itself is unchanged.
    fn transition(&self, session: &mut CredentialSession, to: CredentialStatus) {
        let from = session.status;
        if from != to {
            session.status = to;
            debug!(from = ?from, to = ?to, "Credential status changed");
            let _ = self.event_sender.send(SessionEvent::StatusChanged { from, to });
        }
        if to.needs_prompt() {
            self.request_prompt_locked(session);
        }
    }

    fn request_prompt_locked(&self, session: &mut CredentialSession) {
        if !session.prompt_visible {
            session.prompt_visible = true;
            let _ = self.event_sender.send(SessionEvent::PromptRequested);
        }
    }

    fn dismiss_prompt_locked(&self, session: &mut CredentialSession) {
        if session.prompt_visible {
            session.prompt_visible = false;
            let _ = self.event_sender.send(SessionEvent::PromptDismissed);
        }
    }
}
