//! # Event Bus System
//!
//! Broadcasts what the session is doing (catalog fetches, voice transitions,
//! intent bookkeeping) to any number of observers over
//! `tokio::sync::broadcast`.
//!
//! ```text
//! ┌───────────────┐   emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ CatalogFetcher├─────────>│           ├────────────>│ UI adapter │
//! └───────────────┘          │ EventBus  │             └────────────┘
//! ┌───────────────┐   emit   │ (broadcast│  subscribe  ┌────────────┐
//! │ VoiceManager  ├─────────>│  channel) ├────────────>│ Telemetry  │
//! └───────────────┘          └───────────┘             └────────────┘
//! ```
//!
//! Events are informational. The authoritative state is the controller's
//! session snapshot; a subscriber that lags and misses events can always
//! re-read it.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Catalog(CatalogEvent::FetchStarted {
//!     seq: 1,
//!     page: 1,
//!     term: String::new(),
//! }))
//! .ok();
//!
//! assert!(matches!(rx.recv().await, Ok(CoreEvent::Catalog(_))));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind by `n` events.
//!   Non-fatal; keep receiving.
//! - **`RecvError::Closed`**: every sender is gone, the session shut down.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// The progress ticker emits four events per second, so this leaves a few
/// seconds of slack for slow subscribers.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 128;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Catalog(CatalogEvent),
    Playback(PlaybackEvent),
    Session(SessionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Catalog(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Catalog(CatalogEvent::FetchFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Catalog(CatalogEvent::FetchApplied { .. })
            | CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Session(SessionEvent::ShutDown) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Lifecycle of sequence-stamped catalog fetches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// A fetch was issued.
    FetchStarted { seq: u64, page: u32, term: String },
    /// A fetch reply was the latest one and replaced the visible results.
    FetchApplied {
        seq: u64,
        page: u32,
        term: String,
        item_count: usize,
        total: u64,
        page_count: u32,
    },
    /// A reply arrived after a newer fetch was issued and was dropped.
    FetchDiscarded { seq: u64, latest: u64 },
    /// The latest fetch failed.
    FetchFailed {
        seq: u64,
        page: u32,
        term: String,
        message: String,
        /// Whether the previously shown results were kept on screen.
        retained: bool,
    },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::FetchStarted { .. } => "Catalog fetch started",
            CatalogEvent::FetchApplied { .. } => "Catalog results applied",
            CatalogEvent::FetchDiscarded { .. } => "Stale catalog reply discarded",
            CatalogEvent::FetchFailed { .. } => "Catalog fetch failed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Transitions of the single active voice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The clip is being loaded by the host audio engine.
    Loading { item_id: String },
    /// Playback started from the beginning of the clip.
    Started { item_id: String, name: String },
    Paused { item_id: String, position_ms: u64 },
    Resumed { item_id: String, position_ms: u64 },
    /// The voice was released before reaching its end.
    Stopped { item_id: String },
    /// The clip played to its natural end.
    Completed { item_id: String },
    /// Sampled by the progress ticker while playing.
    PositionChanged {
        item_id: String,
        position_ms: u64,
        duration_ms: Option<u64>,
    },
    /// The global volume reached the active voice.
    VolumeApplied { level: u8 },
    Error {
        item_id: Option<String>,
        message: String,
        /// Whether asking again may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Loading clip",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Clip completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::VolumeApplied { .. } => "Volume applied",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Intent bookkeeping that does not map to a fetch or a voice transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A debounced search fired but did not trigger a fetch.
    SearchSkipped { term: String, reason: String },
    /// A page change was refused.
    PageRejected { requested: u32, page_count: u32 },
    /// The user asked for a volume, before it reaches the voice.
    VolumeRequested { level: u8 },
    ShutDown,
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::SearchSkipped { .. } => "Search skipped",
            SessionEvent::PageRejected { .. } => "Page change rejected",
            SessionEvent::VolumeRequested { .. } => "Volume requested",
            SessionEvent::ShutDown => "Session shut down",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender, so every component can hold its own
/// handle. Subscribers only see events emitted after they subscribed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified per-subscriber buffer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none. Publishers generally ignore that error.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe through an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus};
///
/// let bus = EventBus::default();
/// let playback_only = bus
///     .stream()
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if nothing matching is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
