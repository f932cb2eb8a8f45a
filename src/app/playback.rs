use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::playback::{clamp_volume, download_file_name};
use crate::domain::{
    DomainError, LoadGeneration, MediaEvent, MediaSession, PlaybackEvent, PlaybackState,
    SourceLocator,
};
use crate::ports::{Egress, HttpClient, MediaHost, TransientResources};

/// Extension used when nothing better can be derived.
const FALLBACK_EXTENSION: &str = "wav";

/// Single source of truth for one playable audio resource.
///
/// Host calls are always made after the session lock is released, so a
/// host may feed `handle_event` from inside any port call.
pub struct PlaybackController {
    host: Arc<dyn MediaHost>,
    resources: Arc<dyn TransientResources>,
    http: Arc<dyn HttpClient>,
    session: Mutex<MediaSession>,
    generation: AtomicU64,
    event_sender: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(
        host: Arc<dyn MediaHost>,
        resources: Arc<dyn TransientResources>,
        http: Arc<dyn HttpClient>,
        initial_volume: f64,
    ) -> Self {
        let (event_sender, _) = broadcast::channel(64);
        Self {
            host,
            resources,
            http,
            session: Mutex::new(MediaSession::new(initial_volume)),
            generation: AtomicU64::new(0),
            event_sender,
        }
    }

    /// Parse a locator and start loading it.
    pub fn load(&self, raw: &str) -> Result<LoadGeneration, DomainError> {
        let source = SourceLocator::parse(raw)?;
        Ok(self.load_source(source))
    }

    /// Register in-memory audio as a transient resource and load it.
    pub fn load_bytes(&self, bytes: Vec<u8>, mime_type: &str) -> (SourceLocator, LoadGeneration) {
        let source = self.resources.create(bytes, mime_type);
        let generation = self.load_source(source.clone());
        (source, generation)
    }

    /// Adopt a new source. The previous local resource, if any, is released
    /// first and every event still in flight for it becomes stale.
    pub fn load_source(&self, source: SourceLocator) -> LoadGeneration {
        let (generation, released) = {
            let mut session = self.session.lock();
            let generation = LoadGeneration(self.generation.fetch_add(1, Ordering::SeqCst) + 1);

            let previous = session.source.take();
            let released = previous.filter(|p| p.local_id().is_some() && *p != source);
            if let Some(old) = &released {
                self.resources.release(old);
            }

            session.source = Some(source.clone());
            session.position_secs = 0.0;
            session.duration_secs = None;
            session.last_error = None;
            session.generation = generation;
            self.transition(&mut session, PlaybackState::Loading);
            (generation, released)
        };

        info!(
            generation = generation.0,
            source = %source,
            released = ?released.map(|r| r.to_string()),
            "Loading audio source"
        );
        self.host.begin_load(generation, &source);
        generation
    }

    /// Apply a host signal. Returns `false` when the signal belongs to a
    /// superseded load and was discarded.
    pub fn handle_event(&self, generation: LoadGeneration, event: MediaEvent) -> bool {
        let mut session = self.session.lock();
        if generation != session.generation {
            debug!(
                stale = generation.0,
                current = session.generation.0,
                event = ?event,
                "Discarding event from a superseded load"
            );
            return false;
        }

        match event {
            MediaEvent::MetadataLoaded { duration_secs } => {
                if duration_secs.is_finite() && duration_secs >= 0.0 {
                    session.duration_secs = Some(duration_secs);
                    session.position_secs = session.bounded_position(session.position_secs);
                }
                if session.state == PlaybackState::Loading {
                    self.transition(&mut session, PlaybackState::Ready);
                }
            }
            MediaEvent::CanPlay => {
                if session.state == PlaybackState::Loading {
                    self.transition(&mut session, PlaybackState::Ready);
                }
            }
            MediaEvent::TimeUpdate { position_secs }
            | MediaEvent::SeekCompleted { position_secs } => {
                if session.state.is_decoded() {
                    session.position_secs = session.bounded_position(position_secs);
                }
            }
            MediaEvent::Ended => {
                if session.state.is_decoded() {
                    if let Some(duration) = session.duration_secs {
                        session.position_secs = duration;
                    }
                    self.transition(&mut session, PlaybackState::Ended);
                }
            }
            MediaEvent::Error { message } => {
                if session.state != PlaybackState::Idle {
                    warn!(generation = generation.0, error = %message, "Media error");
                    self.fail(&mut session, message);
                }
            }
        }
        true
    }

    /// Start or resume playback. Allowed from Ready, Paused and Ended;
    /// already playing is a no-op.
    pub async fn play(&self) -> Result<(), DomainError> {
        let generation = {
            let session = self.session.lock();
            if session.state == PlaybackState::Playing {
                return Ok(());
            }
            if !session.state.can_play() {
                return Err(DomainError::PlaybackStateTransition {
                    from: session.state,
                    to: PlaybackState::Playing,
                });
            }
            session.generation
        };

        let outcome = self.host.play().await;

        let mut session = self.session.lock();
        if session.generation != generation {
            return Err(DomainError::Playback(
                "Playback request superseded by a newer source".to_string(),
            ));
        }

        match outcome {
            Ok(()) if session.state == PlaybackState::Errored => {
                let message = session
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "Media failed while starting playback".to_string());
                warn!(error = %message, "Media failed while play was pending");
                Err(DomainError::Playback(message))
            }
            Ok(()) => {
                if session.state.can_play() {
                    self.transition(&mut session, PlaybackState::Playing);
                }
                Ok(())
            }
            Err(e) => {
                let message = match e {
                    DomainError::Playback(m) => m,
                    other => other.to_string(),
                };
                warn!(error = %message, "Host rejected playback");
                self.fail(&mut session, message.clone());
                Err(DomainError::Playback(message))
            }
        }
    }

    /// Pause playback. Pausing while paused is a no-op.
    pub fn pause(&self) -> Result<(), DomainError> {
        {
            let mut session = self.session.lock();
            if !session.state.can_pause() {
                return Err(DomainError::PlaybackStateTransition {
                    from: session.state,
                    to: PlaybackState::Paused,
                });
            }
            if session.state == PlaybackState::Paused {
                return Ok(());
            }
            self.transition(&mut session, PlaybackState::Paused);
        }
        self.host.pause();
        Ok(())
    }

    /// Pause and rewind. Lands in Idle without a source and in Ready with a
    /// decoded one; a load in progress or a failed load is left as is.
    pub fn stop(&self) {
        let (was_playing, rewind) = {
            let mut session = self.session.lock();
            let was_playing = session.state == PlaybackState::Playing;
            let decoded = session.state.is_decoded();
            session.position_secs = 0.0;

            if session.source.is_none() {
                self.transition(&mut session, PlaybackState::Idle);
            } else if decoded {
                self.transition(&mut session, PlaybackState::Ready);
            }
            (was_playing, decoded)
        };

        if was_playing {
            self.host.pause();
        }
        if rewind {
            self.host.seek(0.0);
        }
    }

    /// Move the playhead. Targets outside `[0, duration]`, non-finite
    /// targets and seeks before the duration is known are rejected and
    /// leave the position untouched.
    pub fn seek(&self, target_secs: f64) -> Result<(), DomainError> {
        {
            let mut session = self.session.lock();
            let invalid = |reason: &str| DomainError::InvalidSeek {
                requested: target_secs,
                reason: reason.to_string(),
            };

            if !session.state.is_decoded() {
                return Err(invalid("no media is loaded"));
            }
            if !target_secs.is_finite() {
                return Err(invalid("target is not a finite number"));
            }
            let duration = session
                .duration_secs
                .ok_or_else(|| invalid("duration is not known yet"))?;
            if target_secs < 0.0 || target_secs > duration {
                return Err(invalid(&format!("outside [0, {}]", duration)));
            }

            session.position_secs = target_secs;
        }
        self.host.seek(target_secs);
        Ok(())
    }

    /// Set the volume, clamped into `[0, 1]`. Returns the applied level.
    pub fn set_volume(&self, level: f64) -> f64 {
        let level = clamp_volume(level);
        self.session.lock().volume = level;
        self.host.set_volume(level);
        level
    }

    /// Save the current resource to `dest_dir` under a name derived from
    /// `title`. Playback state is not touched.
    ///
    /// A remote source was picked by the user, so its host is not held to
    /// the API allow-list; local-only mode still blocks it.
    pub async fn download(&self, dest_dir: &Path, title: &str) -> Result<PathBuf, DomainError> {
        let source = self
            .session
            .lock()
            .source
            .clone()
            .ok_or_else(|| DomainError::Download("No audio is loaded".to_string()))?;

        let path = match &source {
            SourceLocator::Local(_) => {
                let (bytes, mime_type) = self.resources.read(&source).ok_or_else(|| {
                    DomainError::Download("Audio resource is no longer available".to_string())
                })?;
                let path = dest_dir.join(download_file_name(title, &audio_extension(&mime_type)));
                write_atomically(&path, &bytes)
                    .await
                    .map_err(|e| DomainError::Download(e.to_string()))?;
                path
            }
            SourceLocator::Remote(url) => {
                let extension = Path::new(url.path())
                    .extension()
                    .and_then(|e| e.to_str())
                    .filter(|e| !e.is_empty())
                    .unwrap_or(FALLBACK_EXTENSION)
                    .to_string();
                let path = dest_dir.join(download_file_name(title, &extension));
                self.http
                    .download_file(url.as_str(), &path, Egress::UserSelected, None)
                    .await?;
                path
            }
        };

        info!(path = ?path, source = %source, "Audio saved");
        Ok(path)
    }

    /// Release the current resource and unload the host. Safe to call more
    /// than once.
    pub fn teardown(&self) {
        let previous = {
            let mut session = self.session.lock();
            let previous = session.source.take();
            if previous.is_none() && session.state == PlaybackState::Idle {
                return;
            }

            session.generation = LoadGeneration(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
            session.position_secs = 0.0;
            session.duration_secs = None;
            session.last_error = None;
            self.transition(&mut session, PlaybackState::Idle);
            previous
        };

        if let Some(source) = &previous {
            self.resources.release(source);
        }
        self.host.unload();
        debug!("Playback torn down");
    }

    pub fn snapshot(&self) -> MediaSession {
        self.session.lock().clone()
    }

    /// Generation of the most recent load, readable without the session lock.
    pub fn current_generation(&self) -> LoadGeneration {
        LoadGeneration(self.generation.load(Ordering::SeqCst))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.event_sender.subscribe()
    }

    fn fail(&self, session: &mut MediaSession, message: String) {
        session.last_error = Some(message.clone());
        self.transition(session, PlaybackState::Errored);
        let _ = self.event_sender.send(PlaybackEvent::Error {
            generation: session.generation,
            message,
        });
    }

    fn transition(&self, session: &mut MediaSession, to: PlaybackState) {
        let from = session.state;
        if from == to {
            return;
        }
        session.state = to;
        debug!(generation = session.generation.0, %from, %to, "Playback state changed");
        let _ = self.event_sender.send(PlaybackEvent::StateChanged {
            generation: session.generation,
            from,
            to,
        });
    }
}

fn audio_extension(mime_type: &str) -> String {
    match mime_type {
        "audio/wav" | "audio/wave" | "audio/x-wav" => "wav".to_string(),
        "audio/mpeg" | "audio/mp3" => "mp3".to_string(),
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .map(|e| e.to_string())
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string()),
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp_path = path.with_extension("download");
    if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::{
        loopback_guard, serve_once, HostCall, MockHttpClient, MockMediaHost,
    };
    use crate::adapters::BlobRegistry;
    use crate::domain::config::PrivacyConfig;

    struct Fixture {
        host: Arc<MockMediaHost>,
        blobs: Arc<BlobRegistry>,
        http: Arc<MockHttpClient>,
        player: PlaybackController,
    }

    fn fixture() -> Fixture {
        let host = Arc::new(MockMediaHost::new());
        let blobs = Arc::new(BlobRegistry::new());
        let http = Arc::new(MockHttpClient::new());
        let player = PlaybackController::new(host.clone(), blobs.clone(), http.clone(), 1.0);
        Fixture {
            host,
            blobs,
            http,
            player,
        }
    }

    /// Load a remote source and drive it to Ready with the given duration.
    fn ready(f: &Fixture, duration: f64) -> LoadGeneration {
        let generation = f.player.load("https://cdn.example.com/track.mp3").unwrap();
        f.player
            .handle_event(generation, MediaEvent::MetadataLoaded { duration_secs: duration });
        generation
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("playground_{}_{}", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_load_rejects_empty_locator() {
        let f = fixture();
        assert!(matches!(f.player.load(""), Err(DomainError::Validation(_))));
        assert_eq!(f.player.snapshot().state, PlaybackState::Idle);
        assert!(f.host.calls().is_empty());
    }

    #[test]
    fn test_load_resets_session() {
        let f = fixture();
        let generation = ready(&f, 30.0);
        f.player
            .handle_event(generation, MediaEvent::TimeUpdate { position_secs: 12.0 });

        f.player.load("https://cdn.example.com/other.wav").unwrap();
        let session = f.player.snapshot();
        assert_eq!(session.state, PlaybackState::Loading);
        assert_eq!(session.position_secs, 0.0);
        assert!(session.duration_secs.is_none());
    }

    #[test]
    fn test_last_load_wins() {
        let f = fixture();
        let a = f.player.load("https://cdn.example.com/a.wav").unwrap();
        let b = f.player.load("https://cdn.example.com/b.wav").unwrap();
        assert!(b > a);

        // Late signals for `a` must not touch `b`'s session.
        assert!(!f.player.handle_event(a, MediaEvent::MetadataLoaded { duration_secs: 99.0 }));
        assert!(!f.player.handle_event(a, MediaEvent::Error { message: "boom".into() }));

        let session = f.player.snapshot();
        assert_eq!(session.state, PlaybackState::Loading);
        assert_eq!(session.source, Some(SourceLocator::parse("https://cdn.example.com/b.wav").unwrap()));
        assert!(session.duration_secs.is_none());

        assert!(f.player.handle_event(b, MediaEvent::CanPlay));
        assert_eq!(f.player.snapshot().state, PlaybackState::Ready);
        assert_eq!(f.host.last_generation(), Some(b));
    }

    #[test]
    fn test_load_releases_previous_local_resource() {
        let f = fixture();
        let (first, _) = f.player.load_bytes(vec![1, 2, 3], "audio/wav");
        assert_eq!(f.blobs.live_count(), 1);

        f.player.load_bytes(vec![4, 5, 6], "audio/wav");
        assert_eq!(f.blobs.live_count(), 1);
        assert!(f.blobs.read(&first).is_none());

        // Reloading the same locator keeps it alive.
        let current = f.player.snapshot().source.unwrap();
        f.player.load_source(current.clone());
        assert!(f.blobs.read(&current).is_some());
    }

    #[test]
    fn test_error_event_then_reload_recovers() {
        let f = fixture();
        let generation = f.player.load("https://cdn.example.com/a.wav").unwrap();
        f.player.handle_event(
            generation,
            MediaEvent::Error {
                message: "decode failed".into(),
            },
        );

        let session = f.player.snapshot();
        assert_eq!(session.state, PlaybackState::Errored);
        assert_eq!(session.last_error.as_deref(), Some("decode failed"));

        ready(&f, 10.0);
        let session = f.player.snapshot();
        assert_eq!(session.state, PlaybackState::Ready);
        assert!(session.last_error.is_none());
    }

    #[tokio::test]
    async fn test_play_pause_cycle() {
        let f = fixture();
        ready(&f, 10.0);

        f.player.play().await.unwrap();
        assert_eq!(f.player.snapshot().state, PlaybackState::Playing);

        f.player.pause().unwrap();
        let once = f.player.snapshot();
        f.player.pause().unwrap();
        let twice = f.player.snapshot();
        assert_eq!(once.state, PlaybackState::Paused);
        assert_eq!(once.state, twice.state);
        assert_eq!(once.position_secs, twice.position_secs);

        let pauses = f.host.calls().iter().filter(|c| **c == HostCall::Pause).count();
        assert_eq!(pauses, 1);
    }

    #[tokio::test]
    async fn test_play_requires_loaded_media() {
        let f = fixture();
        let result = f.player.play().await;
        assert!(matches!(
            result,
            Err(DomainError::PlaybackStateTransition {
                from: PlaybackState::Idle,
                ..
            })
        ));
        assert!(f.player.pause().is_err());
    }

    #[tokio::test]
    async fn test_play_rejection_marks_errored() {
        let f = fixture();
        ready(&f, 10.0);
        f.host.fail_play("not allowed by autoplay policy");

        let result = f.player.play().await;
        assert!(matches!(result, Err(DomainError::Playback(_))));

        let session = f.player.snapshot();
        assert_eq!(session.state, PlaybackState::Errored);
        assert_eq!(
            session.last_error.as_deref(),
            Some("not allowed by autoplay policy")
        );
    }

    #[tokio::test]
    async fn test_replay_after_end() {
        let f = fixture();
        let generation = ready(&f, 10.0);
        f.player.play().await.unwrap();
        f.player.handle_event(generation, MediaEvent::Ended);

        let session = f.player.snapshot();
        assert_eq!(session.state, PlaybackState::Ended);
        assert_eq!(session.position_secs, 10.0);

        f.player.play().await.unwrap();
        assert_eq!(f.player.snapshot().state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_play_superseded_by_new_load() {
        let f = fixture();
        ready(&f, 10.0);
        let release = f.host.hold_play();

        let play = f.player.play();
        let load = async {
            tokio::task::yield_now().await;
            f.player.load("https://cdn.example.com/next.wav").unwrap();
            release.notify_one();
        };
        let (result, _) = tokio::join!(play, load);

        assert!(matches!(result, Err(DomainError::Playback(_))));
        assert_eq!(f.player.snapshot().state, PlaybackState::Loading);
    }

    #[tokio::test]
    async fn test_play_fails_when_media_errors_meanwhile() {
        let f = fixture();
        let generation = ready(&f, 10.0);
        let release = f.host.hold_play();

        let play = f.player.play();
        let fail = async {
            tokio::task::yield_now().await;
            f.player.handle_event(
                generation,
                MediaEvent::Error {
                    message: "decoder crashed".into(),
                },
            );
            release.notify_one();
        };
        let (result, _) = tokio::join!(play, fail);

        match result {
            Err(DomainError::Playback(message)) => assert_eq!(message, "decoder crashed"),
            other => panic!("expected playback error, got {:?}", other),
        }
        assert_eq!(f.player.snapshot().state, PlaybackState::Errored);
    }

    #[tokio::test]
    async fn test_stop_rewinds() {
        let f = fixture();
        f.player.stop();
        assert_eq!(f.player.snapshot().state, PlaybackState::Idle);

        let generation = ready(&f, 10.0);
        f.player.play().await.unwrap();
        f.player
            .handle_event(generation, MediaEvent::TimeUpdate { position_secs: 4.0 });

        f.player.stop();
        let session = f.player.snapshot();
        assert_eq!(session.state, PlaybackState::Ready);
        assert_eq!(session.position_secs, 0.0);
        assert!(f.host.calls().contains(&HostCall::Seek(0.0)));
    }

    #[test]
    fn test_stop_while_loading_keeps_state() {
        let f = fixture();
        f.player.load("https://cdn.example.com/a.wav").unwrap();
        f.player.stop();
        assert_eq!(f.player.snapshot().state, PlaybackState::Loading);
    }

    #[test]
    fn test_seek_within_range() {
        let f = fixture();
        let generation = ready(&f, 10.0);
        f.player.seek(7.5).unwrap();
        assert_eq!(f.player.snapshot().position_secs, 7.5);

        // Host may settle elsewhere.
        f.player
            .handle_event(generation, MediaEvent::SeekCompleted { position_secs: 7.0 });
        assert_eq!(f.player.snapshot().position_secs, 7.0);
    }

    #[test]
    fn test_seek_out_of_range_leaves_position() {
        let f = fixture();
        let generation = ready(&f, 10.0);
        f.player
            .handle_event(generation, MediaEvent::TimeUpdate { position_secs: 3.0 });

        for target in [-1.0, 10.5, f64::NAN, f64::INFINITY] {
            let result = f.player.seek(target);
            assert!(matches!(result, Err(DomainError::InvalidSeek { .. })));
            assert_eq!(f.player.snapshot().position_secs, 3.0);
        }
        assert!(!f.host.calls().iter().any(|c| matches!(c, HostCall::Seek(_))));
    }

    #[test]
    fn test_seek_unknown_duration_rejected() {
        let f = fixture();
        let generation = f.player.load("https://cdn.example.com/live").unwrap();
        f.player.handle_event(generation, MediaEvent::CanPlay);
        assert!(matches!(
            f.player.seek(1.0),
            Err(DomainError::InvalidSeek { .. })
        ));
    }

    #[test]
    fn test_set_volume_clamps() {
        let f = fixture();
        assert_eq!(f.player.set_volume(-5.0), 0.0);
        assert_eq!(f.player.snapshot().volume, 0.0);
        assert_eq!(f.player.set_volume(5.0), 1.0);
        assert_eq!(f.player.snapshot().volume, 1.0);
        assert_eq!(f.player.set_volume(0.4), 0.4);
        assert_eq!(f.host.calls().last(), Some(&HostCall::SetVolume(0.4)));
    }

    #[tokio::test]
    async fn test_download_local_resource() {
        let f = fixture();
        let (_, generation) = f.player.load_bytes(b"RIFFdata".to_vec(), "audio/wav");
        f.player.handle_event(generation, MediaEvent::CanPlay);

        let dir = temp_dir("download_local");
        let path = f.player.download(&dir, "Hello World").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "hello_world.wav");
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFFdata");
        assert_eq!(f.player.snapshot().state, PlaybackState::Ready);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_download_remote_resource() {
        let f = fixture();
        ready(&f, 10.0);
        f.http.push_bytes(200, "audio/mpeg", vec![0xFF, 0xFB, 0x90]);

        let dir = temp_dir("download_remote");
        let path = f.player.download(&dir, "track").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "track.mp3");
        assert_eq!(std::fs::read(&path).unwrap().len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_download_user_source_through_default_guard() {
        let base = serve_once(b"ID3 user track").await;
        let host = Arc::new(MockMediaHost::new());
        let guard = Arc::new(loopback_guard(&PrivacyConfig::default()));
        let player = PlaybackController::new(host, Arc::new(BlobRegistry::new()), guard.clone(), 1.0);

        let generation = player.load(&format!("{}/song.mp3", base)).unwrap();
        player.handle_event(generation, MediaEvent::MetadataLoaded { duration_secs: 3.0 });

        let dir = temp_dir("download_user_source");
        let path = player.download(&dir, "My Song").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "my_song.mp3");
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3 user track");

        guard.set_local_only(true);
        let err = player.download(&dir, "My Song").await.unwrap_err();
        assert_eq!(err.code(), "NETWORK_BLOCKED");
        assert_eq!(player.snapshot().state, PlaybackState::Ready);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_download_failure_keeps_playback() {
        let f = fixture();
        ready(&f, 10.0);
        f.player.play().await.unwrap();
        f.http.push_bytes(404, "text/plain", Vec::new());

        let result = f.player.download(&temp_dir("download_fail"), "track").await;
        assert!(matches!(result, Err(DomainError::Download(_))));
        assert_eq!(f.player.snapshot().state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_download_without_source() {
        let f = fixture();
        let result = f.player.download(&temp_dir("download_none"), "x").await;
        assert!(matches!(result, Err(DomainError::Download(_))));
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let f = fixture();
        let (_, generation) = f.player.load_bytes(vec![1, 2, 3], "audio/wav");

        f.player.teardown();
        f.player.teardown();

        assert_eq!(f.blobs.live_count(), 0);
        assert_eq!(f.player.snapshot().state, PlaybackState::Idle);
        assert!(!f.player.handle_event(generation, MediaEvent::CanPlay));

        let unloads = f.host.calls().iter().filter(|c| **c == HostCall::Unload).count();
        assert_eq!(unloads, 1);
    }

    #[tokio::test]
    async fn test_state_events_are_broadcast() {
        let f = fixture();
        let mut events = f.player.subscribe();
        ready(&f, 10.0);

        let mut seen = Vec::new();
        while let Ok(PlaybackEvent::StateChanged { to, .. }) = events.try_recv() {
            seen.push(to);
        }
        assert_eq!(seen, vec![PlaybackState::Loading, PlaybackState::Ready]);
    }
}
