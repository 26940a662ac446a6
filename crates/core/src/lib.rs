//! Core library for the Animal Explorer front-ends.
//!
//! The crate holds everything the different front-ends (flat grid, popup,
//! sprite globe) have in common: the catalogue, the location router and view
//! state machine, image candidate chains and the audio fallback policy. The
//! drawing itself is left to a [`Surface`] implementation supplied by the
//! caller.

pub mod audio;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod media;
pub mod navigation;
pub mod render;
pub mod router;

pub use audio::{
    resolve_sound_source, AudioController, PlaybackFailure, PlaybackOutcome, SoundAction, SoundRequest,
    SoundSource, ToneBuffer, ToneGenerator,
};
pub use catalogue::{Animal, Catalogue, Category};
pub use config::{AppConfig, AudioConfig, ImageSize, MediaConfig, ToneConfig, Waveform};
pub use error::{ExplorerError, Result};
pub use media::{ImageResolution, ImageStep, MediaResolver};
pub use navigation::{NavigationLocation, Navigator, View};
pub use render::{compose, Breadcrumb, Card, Detail, Page, Surface};
pub use router::{RouteChange, Router};
