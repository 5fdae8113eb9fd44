//! # Playback Error Types
//!
//! Errors returned by the voice manager and the volume propagator.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The host could not load the clip. The voice is back to idle.
    #[error("Failed to load {item_id}: {reason}")]
    LoadFailed { item_id: String, reason: String },

    /// The clip has no audio reference; nothing was handed to the host.
    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// Pause or resume was requested while nothing was in the matching state.
    #[error("Nothing is playing")]
    NotPlaying,

    // ========================================================================
    // Platform/Adapter Errors
    // ========================================================================
    /// A control call on an already loaded session failed.
    #[error("Playback adapter error: {0}")]
    Adapter(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::LoadFailed { .. } => true,
            PlaybackError::Adapter(err) => err.is_transport(),
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
