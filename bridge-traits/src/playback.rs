//! Playback bridge trait and supporting audio types.
//!
//! The core drives a host audio engine through [`PlaybackAdapter`]: it asks
//! the host to prepare a session for a clip URI, then issues control calls
//! against the returned [`PlaybackSessionId`]. Hosts decode and render audio
//! however their platform prefers.

use crate::error::{BridgeError, Result};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// High-level audio source descriptor provided to playback adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Remote HTTP(S) resource fetched by the host.
    Remote {
        url: String,
        headers: HashMap<String, String>,
    },
    /// Anything the host can resolve on its own (bundled asset, file URI).
    Uri(String),
}

impl AudioSource {
    /// Build a source from a URI, treating `http(s)://` as remote.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        if uri.starts_with("http://") || uri.starts_with("https://") {
            AudioSource::Remote {
                url: uri,
                headers: HashMap::new(),
            }
        } else {
            AudioSource::Uri(uri)
        }
    }

    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::Remote { .. })
    }

    pub fn uri(&self) -> &str {
        match self {
            AudioSource::Remote { url, .. } => url,
            AudioSource::Uri(uri) => uri,
        }
    }
}

/// Additional playback options supplied alongside a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Initial playback position (defaults to start of stream).
    pub start_position: Duration,
    /// Initial volume (0.0 = muted, 1.0 = unity gain).
    pub initial_volume: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            start_position: Duration::ZERO,
            initial_volume: 1.0,
        }
    }
}

/// Unique identifier for playback sessions managed by a host adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Playback lifecycle state as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Preparing,
    Playing,
    Paused,
    Stopped,
    /// The stream reached its natural end.
    Completed,
    Error { message: String },
}

/// Display information the host may surface in its media controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackMetadata {
    pub track_id: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
}

/// Request describing the playback session a host adapter should provision.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub source: AudioSource,
    pub options: PlaybackOptions,
    pub metadata: PlaybackMetadata,
}

impl PlaybackRequest {
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            options: PlaybackOptions::default(),
            metadata: PlaybackMetadata::default(),
        }
    }

    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Trait for platform-specific playback adapters that drive native audio engines.
#[async_trait::async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Load the source and allocate a session. Resolves once the host is
    /// ready to start playback.
    async fn prepare(&self, request: PlaybackRequest) -> Result<PlaybackSessionId>;

    /// Begin or resume playback for the provided session.
    async fn play(&self, session: PlaybackSessionId) -> Result<()>;

    /// Pause playback without releasing the session.
    async fn pause(&self, session: PlaybackSessionId) -> Result<()>;

    /// Stop playback and reset position to the start of the stream.
    async fn stop(&self, session: PlaybackSessionId) -> Result<()>;

    /// Seek to an absolute position within the stream.
    async fn seek(&self, session: PlaybackSessionId, position: Duration) -> Result<()>;

    /// Adjust playback volume. Volume is normalized to `0.0..=1.0`.
    async fn set_volume(&self, session: PlaybackSessionId, volume: f32) -> Result<()>;

    /// Query the current playback position.
    async fn get_position(&self, session: PlaybackSessionId) -> Result<Duration>;

    /// Total stream length, when the host knows it.
    async fn get_duration(&self, session: PlaybackSessionId) -> Result<Option<Duration>> {
        let _ = session;
        Ok(None)
    }

    /// Fetch the adapter's current understanding of the session state.
    async fn state(&self, session: PlaybackSessionId) -> Result<PlaybackState>;

    /// Release resources associated with a playback session.
    async fn unload(&self, session: PlaybackSessionId) -> Result<()>;
}

/// Convenience result type alias for playback operations.
pub type PlaybackResult<T> = std::result::Result<T, BridgeError>;
