//! Shared fixtures for controller scenarios.

#![allow(dead_code)]

mod adapter;

pub use adapter::FakeAdapter;

use async_trait::async_trait;
use core_async::time::{sleep, Duration};
use core_catalog::{CatalogError, CatalogQuery, CatalogService, InMemoryCatalog, Page, Result};
use core_runtime::config::{SessionConfig, SessionConfigBuilder};
use core_service::{SessionController, SoundItem};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// In-memory catalog whose replies can be delayed or failed per term.
pub struct ScriptedCatalog {
    inner: InMemoryCatalog,
    delays: Mutex<HashMap<String, Duration>>,
    failing_terms: Mutex<HashSet<String>>,
    failing_pages: Mutex<HashSet<u32>>,
    queries: Mutex<Vec<CatalogQuery>>,
}

impl ScriptedCatalog {
    pub fn new(items: Vec<SoundItem>) -> Self {
        Self {
            inner: InMemoryCatalog::new(items),
            delays: Mutex::new(HashMap::new()),
            failing_terms: Mutex::new(HashSet::new()),
            failing_pages: Mutex::new(HashSet::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn delay_term(&self, term: &str, delay: Duration) {
        self.delays.lock().insert(term.to_string(), delay);
    }

    pub fn fail_term(&self, term: &str) {
        self.failing_terms.lock().insert(term.to_string());
    }

    pub fn fail_page(&self, page: u32) {
        self.failing_pages.lock().insert(page);
    }

    pub fn heal(&self) {
        self.failing_terms.lock().clear();
        self.failing_pages.lock().clear();
    }

    /// Every query received, in arrival order.
    pub fn queries(&self) -> Vec<CatalogQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl CatalogService for ScriptedCatalog {
    async fn fetch_page(&self, query: &CatalogQuery) -> Result<Page> {
        self.queries.lock().push(query.clone());
        let delay = self.delays.lock().get(&query.term).copied();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if self.failing_terms.lock().contains(&query.term)
            || self.failing_pages.lock().contains(&query.page)
        {
            return Err(CatalogError::Network("connection reset by peer".into()));
        }
        self.inner.fetch_page(query).await
    }
}

pub fn clip(id: i64, name: &str, tags: &[&str]) -> SoundItem {
    SoundItem::new(name, format!("mem://{id}.ogg"))
        .with_id(id)
        .with_tags(tags.iter().copied())
}

/// 6 ambient clips, 10 footsteps, a door and a rainstorm.
pub fn library() -> Vec<SoundItem> {
    let mut items: Vec<SoundItem> = (1..=6)
        .map(|n| clip(n, &format!("Cave {n}"), &["ambient", "cave"]))
        .collect();
    items.extend((7..=16).map(|n| clip(n, &format!("Step {n}"), &["foley", "footsteps"])));
    items.push(clip(17, "Door Creak", &["foley", "door"]));
    items.push(clip(18, "Rainstorm", &["weather", "rain"]));
    items
}

pub struct Harness {
    pub controller: SessionController,
    pub adapter: Arc<FakeAdapter>,
    pub catalog: Arc<ScriptedCatalog>,
}

pub fn harness_with(configure: impl FnOnce(SessionConfigBuilder) -> SessionConfigBuilder) -> Harness {
    harness_with_adapter(FakeAdapter::new(), configure)
}

pub fn harness_with_adapter(
    adapter: FakeAdapter,
    configure: impl FnOnce(SessionConfigBuilder) -> SessionConfigBuilder,
) -> Harness {
    let adapter = Arc::new(adapter);
    let catalog = Arc::new(ScriptedCatalog::new(library()));
    let config = configure(SessionConfig::builder().playback_adapter(adapter.clone()))
        .build()
        .unwrap();
    let controller = SessionController::with_catalog(config, catalog.clone()).unwrap();
    Harness {
        controller,
        adapter,
        catalog,
    }
}

pub fn harness() -> Harness {
    harness_with(|builder| builder)
}
