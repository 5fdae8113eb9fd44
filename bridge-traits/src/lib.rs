//! # Host Bridge Traits
//!
//! Capabilities the sound library core needs from its host, expressed as
//! traits. Each host platform ships adapters; the core only ever sees the
//! trait objects.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - catalog requests
//! - [`PlaybackAdapter`](playback::PlaybackAdapter) - the audio engine that
//!   loads, plays, pauses and releases a single clip
//! - [`Clock`](time::Clock) - wall-clock source for timestamps
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Provides |
//! |----------|---------------------|----------|
//! | Desktop  | `bridge-desktop`    | `HttpClient` |
//! | Any      | host application    | `PlaybackAdapter` |
//!
//! ## Fail-Fast Strategy
//!
//! The core refuses to start when a required capability is missing:
//!
//! ```ignore
//! let config = SessionConfig::builder()
//!     .catalog_endpoint(endpoint)
//!     .build()?; // Error::CapabilityMissing { capability: "PlaybackAdapter", .. }
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters report
//! failures that happen before a response exists as
//! [`BridgeError::Transport`](error::BridgeError::Transport) or
//! [`BridgeError::Timeout`](error::BridgeError::Timeout) so the core can tell
//! network trouble apart from a bad reply.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! async tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod playback;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{
    AudioSource, PlaybackAdapter, PlaybackMetadata, PlaybackOptions, PlaybackRequest,
    PlaybackSessionId, PlaybackState,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
