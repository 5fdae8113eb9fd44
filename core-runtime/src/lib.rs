//! # Core Runtime Module
//!
//! Shared runtime infrastructure for the sound library core:
//! - Session configuration with fail-fast capability checks
//! - Logging and tracing setup
//! - The event bus every component reports through
//!
//! Domain crates (`core-catalog`, `core-playback`, `core-service`) depend on
//! this crate; it depends only on the bridge traits and `core-async`.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CatalogEndpoint, ResultMode, SessionConfig, SessionSettings};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus};
