//! Catalog sources
//!
//! [`CatalogService`] is the seam between the session and wherever the clips
//! are listed. [`InMemoryCatalog`] serves a fixed list and is what hosts use
//! for bundled catalogs and what tests use to drive the controller.

use async_trait::async_trait;
use core_async::time::{sleep, Duration};
use tracing::trace;

use crate::error::Result;
use crate::model::{page_count_for, CatalogQuery, Page, SoundItem};

/// A paginated, searchable list of clips.
///
/// Implementations must be side-effect free: fetching the same query twice
/// yields equivalent pages.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn fetch_page(&self, query: &CatalogQuery) -> Result<Page>;
}

/// Catalog over a fixed list of items.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<SoundItem>,
    latency: Option<Duration>,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<SoundItem>) -> Self {
        Self {
            items,
            latency: None,
        }
    }

    /// Delay every reply, as a remote catalog would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn fetch_page(&self, query: &CatalogQuery) -> Result<Page> {
        query.validate()?;

        if let Some(latency) = self.latency {
            sleep(latency).await;
        }

        let needle = query.term.trim().to_lowercase();
        let matching: Vec<&SoundItem> = self
            .items
            .iter()
            .filter(|item| item.matches_lowercase(&needle))
            .collect();

        let total = matching.len() as u64;
        let items: Vec<SoundItem> = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .cloned()
            .collect();

        trace!(term = %query.term, page = query.page, returned = items.len(), total, "in-memory page");

        Ok(Page {
            items,
            total,
            page_count: page_count_for(total, query.page_size),
            current_page: query.page,
        })
    }
}
