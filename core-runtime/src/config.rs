//! # Session Configuration
//!
//! A [`SessionConfig`] carries the host capabilities and tunables a session
//! controller needs. It is assembled with [`SessionConfigBuilder`], which
//! validates eagerly so a misconfigured host fails at startup with an
//! actionable message instead of on the first user intent.
//!
//! ## Required Capabilities
//!
//! - `PlaybackAdapter` - the host audio engine
//! - `HttpClient` - only when a [`CatalogEndpoint`] is configured
//!   (desktop default: reqwest, with the `desktop-shims` feature)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CatalogEndpoint, SessionConfig};
//!
//! let config = SessionConfig::builder()
//!     .playback_adapter(host_audio)
//!     .catalog_endpoint(CatalogEndpoint::new("http://localhost:5000"))
//!     .page_size(12)
//!     .build()?;
//! ```
//!
//! Tunables can also be loaded from JSON; omitted fields take their
//! defaults:
//!
//! ```rust
//! use core_runtime::config::SessionSettings;
//!
//! let settings: SessionSettings =
//!     serde_json::from_str(r#"{ "page_size": 20, "result_mode": "append" }"#).unwrap();
//! assert_eq!(settings.page_size, 20);
//! assert_eq!(settings.search_debounce_ms, 300);
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, PlaybackAdapter, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How a page-change fetch combines with the results already shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    /// Every fetch supersedes the visible items wholesale.
    #[default]
    Replace,
    /// Page-change fetches append to the visible items (infinite scroll).
    /// Search fetches still replace.
    Append,
}

fn default_page_size() -> u32 {
    8
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_volume_debounce_ms() -> u64 {
    300
}

fn default_progress_interval_ms() -> u64 {
    250
}

fn default_initial_volume() -> u8 {
    50
}

fn default_skip_empty_queries() -> bool {
    true
}

fn default_event_buffer_size() -> usize {
    crate::events::DEFAULT_EVENT_BUFFER_SIZE
}

/// Tunable session behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Items requested per catalog page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Quiet period before a typed search term is fetched.
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Quiet period before a volume change reaches the active voice.
    #[serde(default = "default_volume_debounce_ms")]
    pub volume_debounce_ms: u64,

    /// How often the active voice's position is sampled while playing.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Global volume at session start, `0..=100`.
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,

    /// Debounced empty search terms do not trigger a fetch.
    #[serde(default = "default_skip_empty_queries")]
    pub skip_empty_queries: bool,

    #[serde(default)]
    pub result_mode: ResultMode,

    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_debounce_ms: default_search_debounce_ms(),
            volume_debounce_ms: default_volume_debounce_ms(),
            progress_interval_ms: default_progress_interval_ms(),
            initial_volume: default_initial_volume(),
            skip_empty_queries: default_skip_empty_queries(),
            result_mode: ResultMode::default(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl SessionSettings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn volume_debounce(&self) -> Duration {
        Duration::from_millis(self.volume_debounce_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > 100 {
            return Err(Error::Config(format!(
                "page_size must be between 1 and 100, got {}",
                self.page_size
            )));
        }

        if self.initial_volume > 100 {
            return Err(Error::Config(format!(
                "initial_volume must be between 0 and 100, got {}",
                self.initial_volume
            )));
        }

        if self.progress_interval_ms < 10 {
            return Err(Error::Config(
                "progress_interval_ms must be at least 10ms".to_string(),
            ));
        }

        for (name, value) in [
            ("search_debounce_ms", self.search_debounce_ms),
            ("volume_debounce_ms", self.volume_debounce_ms),
        ] {
            if value > 10_000 {
                return Err(Error::Config(format!(
                    "{} exceeds maximum of 10 seconds (10,000ms)",
                    name
                )));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_audio_extension() -> String {
    "ogg".to_string()
}

/// Where the remote catalog and its audio files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    /// Root of the catalog API; `/api/sounds` is appended.
    pub base_url: String,

    /// Root that clip files are served from. Defaults to `{base_url}/audio`.
    #[serde(default)]
    pub audio_base_url: Option<String>,

    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,
}

impl CatalogEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            audio_base_url: None,
            audio_extension: default_audio_extension(),
        }
    }

    pub fn with_audio_base_url(mut self, url: impl Into<String>) -> Self {
        self.audio_base_url = Some(url.into());
        self
    }

    pub fn with_audio_extension(mut self, extension: impl Into<String>) -> Self {
        self.audio_extension = extension.into();
        self
    }

    /// `base_url` without a trailing slash.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Resolved audio root without a trailing slash.
    pub fn audio_root(&self) -> String {
        match &self.audio_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}/audio", self.api_root()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let root = self.api_root();
        if !(root.starts_with("http://") || root.starts_with("https://")) {
            return Err(Error::Config(format!(
                "catalog base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.audio_extension.is_empty() || self.audio_extension.contains('.') {
            return Err(Error::Config(
                "audio_extension must be a bare extension such as 'ogg'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a session controller needs from its host.
#[derive(Clone)]
pub struct SessionConfig {
    /// Host audio engine (required)
    pub playback_adapter: Arc<dyn PlaybackAdapter>,

    /// HTTP transport for the remote catalog
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Remote catalog location. `None` when the host supplies its own
    /// catalog service.
    pub catalog_endpoint: Option<CatalogEndpoint>,

    /// Time source for user-visible notices
    pub clock: Arc<dyn Clock>,

    pub settings: SessionSettings,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("playback_adapter", &"PlaybackAdapter { ... }")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("catalog_endpoint", &self.catalog_endpoint)
            .field("settings", &self.settings)
            .finish()
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        if let Some(endpoint) = &self.catalog_endpoint {
            endpoint.validate()?;
            if self.http_client.is_none() {
                return Err(http_client_missing_error());
            }
        }

        Ok(())
    }
}

fn playback_adapter_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlaybackAdapter".to_string(),
        message: "A PlaybackAdapter is required to play clips. \
                 Inject the host audio engine with .playback_adapter()."
            .to_string(),
    }
}

fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "A catalog endpoint is configured but no HttpClient was provided. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform-native client with .http_client()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Option<Arc<dyn HttpClient>>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(Some(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Option<Arc<dyn HttpClient>>> {
    Ok(None)
}

/// Builder for [`SessionConfig`].
#[derive(Default)]
pub struct SessionConfigBuilder {
    playback_adapter: Option<Arc<dyn PlaybackAdapter>>,
    http_client: Option<Arc<dyn HttpClient>>,
    catalog_endpoint: Option<CatalogEndpoint>,
    clock: Option<Arc<dyn Clock>>,
    settings: SessionSettings,
}

impl SessionConfigBuilder {
    pub fn playback_adapter(mut self, adapter: Arc<dyn PlaybackAdapter>) -> Self {
        self.playback_adapter = Some(adapter);
        self
    }

    /// Sets the HTTP client used for catalog requests.
    ///
    /// With `desktop-shims`, a reqwest client is created when a catalog
    /// endpoint is configured and no client was given.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn catalog_endpoint(mut self, endpoint: CatalogEndpoint) -> Self {
        self.catalog_endpoint = Some(endpoint);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.settings.page_size = page_size;
        self
    }

    pub fn search_debounce(mut self, delay: Duration) -> Self {
        self.settings.search_debounce_ms = delay.as_millis() as u64;
        self
    }

    pub fn volume_debounce(mut self, delay: Duration) -> Self {
        self.settings.volume_debounce_ms = delay.as_millis() as u64;
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.settings.progress_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn initial_volume(mut self, level: u8) -> Self {
        self.settings.initial_volume = level;
        self
    }

    pub fn skip_empty_queries(mut self, skip: bool) -> Self {
        self.settings.skip_empty_queries = skip;
        self
    }

    pub fn result_mode(mut self, mode: ResultMode) -> Self {
        self.settings.result_mode = mode;
        self
    }

    /// Builds the final `SessionConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when the playback adapter is missing, or
    ///   when a catalog endpoint is set without any way to reach it
    /// - [`Error::Config`] when a tunable is out of range
    pub fn build(self) -> Result<SessionConfig> {
        let playback_adapter = self
            .playback_adapter
            .ok_or_else(playback_adapter_missing_error)?;

        let http_client = match (self.http_client, &self.catalog_endpoint) {
            (Some(client), _) => Some(client),
            (None, Some(_)) => provide_default_http_client()?,
            (None, None) => None,
        };

        let config = SessionConfig {
            playback_adapter,
            http_client,
            catalog_endpoint: self.catalog_endpoint,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            settings: self.settings,
        };

        config.validate()?;

        Ok(config)
    }
}
