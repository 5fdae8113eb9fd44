//! Core service façade.
//!
//! [`SessionController`] is what host applications talk to: it owns the
//! catalog fetcher, the single voice and the global volume of one session,
//! and exposes the session as [`Session`] snapshots plus a handful of intents.
//!
//! Desktop apps typically enable the `desktop-shims` feature, which supplies a
//! reqwest-based `HttpClient` when a catalog endpoint is configured without
//! one. Every other host injects its own bridges through
//! [`SessionConfig::builder`](core_runtime::config::SessionConfig::builder).

pub mod controller;
pub mod debounce;
pub mod error;
pub mod session;

pub use controller::SessionController;
pub use debounce::QueryDebouncer;
pub use error::{Result, ServiceError};
pub use session::{Notice, Session};

pub use core_catalog::{CatalogService, InMemoryCatalog, ItemKey, SoundId, SoundItem};
pub use core_playback::{VoiceSnapshot, VoiceState, Volume};
pub use core_runtime::config::{CatalogEndpoint, ResultMode, SessionConfig, SessionSettings};
pub use core_runtime::events::{CoreEvent, EventBus};
pub use core_runtime::logging::{init_logging, LoggingConfig};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use bridge_desktop::ReqwestHttpClient;
