//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! Only networking has a portable desktop implementation: `HttpClient` is
//! backed by `reqwest`. Audio output is owned by the host application, which
//! passes its own `PlaybackAdapter` to the session config.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_desktop::ReqwestHttpClient;
//!
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let config = SessionConfig::builder()
//!     .http_client(http)
//!     .playback_adapter(host_audio)
//!     .build()?;
//! ```

mod http;

pub use http::ReqwestHttpClient;
