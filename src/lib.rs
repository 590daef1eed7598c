//! RFID card-swipe jukebox
//!
//! Swipe a card on a keyboard-like RFID reader and the mapped track (or
//! ordered playlist) starts playing. The crate is organized around a single
//! polling control loop: reader events feed a swipe decoder, completed card
//! codes resolve through a file-backed mapping store, and a playback
//! controller drives the external player and walks multi-track sequences.

pub mod app;
pub mod debounce;
pub mod decoder;
pub mod input;
pub mod playback;
pub mod player;
pub mod store;

pub use app::Jukebox;
pub use decoder::{SwipeDecoder, SwipeProgress};
pub use input::{InputSource, KeyPhase, RawKeyEvent};
pub use playback::{PlaybackController, SkipReason, TriggerOutcome};
pub use player::{Player, VlcPlayer};
pub use store::{MappingStore, PlaybackTarget};
