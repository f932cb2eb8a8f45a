use async_trait::async_trait;

use crate::domain::{DomainError, LoadGeneration, SourceLocator};

/// Port for the host media-decoding primitive (an `<audio>` element, a
/// native player, a test double).
///
/// The host reports progress back through
/// `PlaybackController::handle_event`, tagging each event with the
/// generation it was handed in `begin_load`. Events may be delivered from
/// inside any call on this trait.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Start fetching and parsing a source. Must not block; the outcome
    /// arrives later as events.
    fn begin_load(&self, generation: LoadGeneration, source: &SourceLocator);

    /// Start or resume playback. Resolves once the host confirms or rejects
    /// (undecodable resource, autoplay policy).
    async fn play(&self) -> Result<(), DomainError>;

    fn pause(&self);

    fn seek(&self, position_secs: f64);

    fn set_volume(&self, level: f64);

    /// Drop the current resource.
    fn unload(&self);
}

/// Port for transient local resources (object URLs).
pub trait TransientResources: Send + Sync {
    /// Register bytes and return a locator for them.
    fn create(&self, bytes: Vec<u8>, mime_type: &str) -> SourceLocator;

    /// Bytes and content type of a live resource.
    fn read(&self, locator: &SourceLocator) -> Option<(Vec<u8>, String)>;

    /// Release a resource. Releasing an unknown or already released
    /// resource is a no-op.
    fn release(&self, locator: &SourceLocator);
}
