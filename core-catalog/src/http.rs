//! Remote catalog over HTTP
//!
//! Talks to a catalog API of the form
//!
//! ```text
//! GET {base}/api/sounds?page=2&limit=8&search=rain
//!
//! {
//!   "sounds": [{ "id": 9, "name": "Rain", "tags": "weather,loop", "file": "ambient/rain1" }],
//!   "meta":   { "total": 14, "pageCount": 2, "currentPage": "2" }
//! }
//! ```
//!
//! Older catalog servers store tags as a comma-separated text column and echo
//! `currentPage` back as a string, so both shapes are accepted.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_async::time::Duration;
use core_runtime::config::CatalogEndpoint;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::{CatalogError, Result};
use crate::model::{page_count_for, CatalogQuery, Page, SoundId, SoundItem};
use crate::service::CatalogService;

const SOUNDS_PATH: &str = "/api/sounds";

/// Default per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    sounds: Vec<WireSound>,
    #[serde(default)]
    meta: Option<WireMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMeta {
    #[serde(default)]
    total: Option<WireNumber>,
    #[serde(default)]
    page_count: Option<WireNumber>,
    #[serde(default)]
    current_page: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
struct WireSound {
    #[serde(default)]
    id: Option<SoundId>,
    name: String,
    #[serde(default)]
    tags: Option<WireTags>,
    file: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTags {
    List(Vec<String>),
    Joined(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Number(u64),
    Text(String),
}

impl WireNumber {
    fn value(&self) -> Option<u64> {
        match self {
            WireNumber::Number(n) => Some(*n),
            WireNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
}

fn split_tags(tags: Option<WireTags>) -> Vec<String> {
    let raw: Vec<String> = match tags {
        None => return Vec::new(),
        Some(WireTags::List(list)) => list,
        Some(WireTags::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    };
    raw.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// HTTP-backed [`CatalogService`].
pub struct HttpCatalogService {
    http_client: Arc<dyn HttpClient>,
    endpoint: CatalogEndpoint,
    audio_root: String,
    timeout: Duration,
}

impl HttpCatalogService {
    pub fn new(http_client: Arc<dyn HttpClient>, endpoint: CatalogEndpoint) -> Self {
        let audio_root = endpoint.audio_root();
        Self {
            http_client,
            endpoint,
            audio_root,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &CatalogEndpoint {
        &self.endpoint
    }

    /// Build the listing URL for a query.
    pub fn page_url(&self, query: &CatalogQuery) -> String {
        format!(
            "{}{}?page={}&limit={}&search={}",
            self.endpoint.api_root(),
            SOUNDS_PATH,
            query.page,
            query.page_size,
            urlencoding::encode(&query.term)
        )
    }

    /// Resolve a catalog `file` field to a playable URI.
    pub fn audio_ref(&self, file: &str) -> String {
        if file.contains("://") {
            return file.to_string();
        }
        let path = file
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}.{}", self.audio_root, path, self.endpoint.audio_extension)
    }

    fn convert_sound(&self, sound: WireSound) -> SoundItem {
        SoundItem {
            id: sound.id,
            audio_ref: self.audio_ref(&sound.file),
            name: sound.name,
            tags: split_tags(sound.tags),
        }
    }

    fn error_for_status(response: &HttpResponse) -> CatalogError {
        let message = response
            .json::<WireError>()
            .map(|body| body.error)
            .or_else(|_| response.text())
            .unwrap_or_default();
        CatalogError::Service {
            status: Some(response.status),
            message: if message.trim().is_empty() {
                "empty error body".to_string()
            } else {
                message
            },
        }
    }

    fn parse_page(&self, response: &HttpResponse, query: &CatalogQuery) -> Result<Page> {
        let wire: WirePage = response
            .json()
            .map_err(|e| CatalogError::service(format!("malformed catalog reply: {}", e)))?;

        let meta = wire.meta.ok_or_else(|| {
            CatalogError::service("malformed catalog reply: missing meta".to_string())
        })?;

        let items: Vec<SoundItem> = wire
            .sounds
            .into_iter()
            .map(|sound| self.convert_sound(sound))
            .collect();

        let total = meta
            .total
            .as_ref()
            .and_then(WireNumber::value)
            .unwrap_or(items.len() as u64);

        let page_count = match meta.page_count.as_ref().and_then(WireNumber::value) {
            Some(count) if count > 0 || total == 0 => count.min(u64::from(u32::MAX)) as u32,
            _ => page_count_for(total, query.page_size),
        };

        let current_page = meta
            .current_page
            .as_ref()
            .and_then(WireNumber::value)
            .and_then(|page| u32::try_from(page).ok())
            .filter(|page| *page >= 1)
            .unwrap_or(query.page);

        Ok(Page {
            items,
            total,
            page_count,
            current_page,
        })
    }
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    #[instrument(skip(self), fields(page = query.page, limit = query.page_size))]
    async fn fetch_page(&self, query: &CatalogQuery) -> Result<Page> {
        query.validate()?;

        let request = HttpRequest::get(self.page_url(query))
            .accept_json()
            .timeout(self.timeout);

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "catalog request failed");
            CatalogError::from(e)
        })?;

        if !response.is_success() {
            let err = Self::error_for_status(&response);
            warn!(status = response.status, error = %err, "catalog returned error status");
            return Err(err);
        }

        let page = self.parse_page(&response, query)?;
        debug!(
            returned = page.items.len(),
            total = page.total,
            page_count = page.page_count,
            "catalog page received"
        );
        Ok(page)
    }
}
