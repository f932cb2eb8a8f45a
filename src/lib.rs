//! Core of the inference playground: media playback state, credential
//! session handling and the feature services built on the inference API.
//!
//! The host shell supplies the media-decoding primitive through
//! [`ports::MediaHost`] and drives everything through [`commands`].

#![forbid(unsafe_code)]

pub mod adapters;
pub mod app;
pub mod commands;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::{AppController, CredentialSessionManager, FeatureServices, PlaybackController};
pub use commands::ErrorReport;
pub use domain::DomainError;
