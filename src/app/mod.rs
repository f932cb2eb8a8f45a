pub mod controller;
pub mod credentials;
pub mod features;
pub mod playback;

pub use controller::AppController;
pub use credentials::CredentialSessionManager;
pub use features::{FeatureServices, SpeechOutcome};
pub use playback::PlaybackController;
