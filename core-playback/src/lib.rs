//! # Playback Module
//!
//! Drives the host audio engine through the `PlaybackAdapter` bridge.
//!
//! ## Overview
//!
//! This module handles:
//! - The single active voice and its lifecycle ([`VoiceManager`])
//! - Progress sampling while a clip plays
//! - The session-wide volume and its debounced propagation ([`VolumePropagator`])

pub mod error;
pub mod voice;
pub mod volume;

pub use error::{PlaybackError, Result};
pub use voice::{VoiceManager, VoiceSnapshot, VoiceState, DEFAULT_PROGRESS_INTERVAL};
pub use volume::{Volume, VolumePropagator};
