//! Out-of-order replies against the sequence-stamped fetcher
//!
//! A slow catalog answers queries with a per-term delay so that replies
//! arrive in a different order than they were issued.

use async_trait::async_trait;
use core_async::time::{sleep, Duration};
use core_catalog::{
    CatalogError, CatalogFetcher, CatalogQuery, CatalogService, InMemoryCatalog, Page, Result,
    SoundItem,
};
use std::sync::Arc;

struct SkewedCatalog {
    inner: InMemoryCatalog,
}

#[async_trait]
impl CatalogService for SkewedCatalog {
    async fn fetch_page(&self, query: &CatalogQuery) -> Result<Page> {
        // Shorter terms take longer, so the first keystrokes answer last.
        let delay = 400u64.saturating_sub(query.term.len() as u64 * 100);
        sleep(Duration::from_millis(delay)).await;
        if query.term == "boom" {
            return Err(CatalogError::Network("connection reset".into()));
        }
        self.inner.fetch_page(query).await
    }
}

fn fetcher() -> Arc<CatalogFetcher> {
    let items = vec![
        SoundItem::new("Rain", "mem://rain").with_id(1).with_tags(["weather"]),
        SoundItem::new("Rainstick", "mem://rainstick").with_id(2),
        SoundItem::new("Thunder", "mem://thunder").with_id(3).with_tags(["weather"]),
    ];
    Arc::new(CatalogFetcher::new(
        Arc::new(SkewedCatalog {
            inner: InMemoryCatalog::new(items),
        }),
        8,
    ))
}

#[tokio::test(start_paused = true)]
async fn only_latest_reply_is_current() {
    let fetcher = fetcher();

    let early = fetcher.stamp(fetcher.query(1, "r")).unwrap();
    let late = fetcher.stamp(fetcher.query(1, "rain")).unwrap();

    let f1 = Arc::clone(&fetcher);
    let early_task = tokio::spawn(async move { f1.fetch_ticket(early).await });
    let f2 = Arc::clone(&fetcher);
    let late_task = tokio::spawn(async move { f2.fetch_ticket(late).await });

    let late_outcome = late_task.await.unwrap();
    assert!(fetcher.is_latest(late_outcome.ticket.seq));
    assert_eq!(late_outcome.result.unwrap().items.len(), 2);

    let early_outcome = early_task.await.unwrap();
    assert!(!fetcher.is_latest(early_outcome.ticket.seq));
    assert_eq!(early_outcome.result.unwrap().items.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failures_carry_their_stamp() {
    let fetcher = fetcher();
    let outcome = fetcher.fetch(1, "boom", 8).await.unwrap();
    assert!(fetcher.is_latest(outcome.ticket.seq));
    assert!(matches!(outcome.result, Err(CatalogError::Network(_))));
}
