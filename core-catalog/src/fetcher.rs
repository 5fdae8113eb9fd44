//! Sequence-stamped catalog fetching
//!
//! Every fetch is stamped with a strictly increasing sequence number before
//! it is issued. Replies may arrive in any order; a reply is only worth
//! applying if its sequence number is still the latest one stamped. The
//! fetcher never applies anything itself, the caller decides under its own
//! state lock using [`CatalogFetcher::is_latest`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::model::{CatalogQuery, Page};
use crate::service::CatalogService;

/// A stamped, not yet resolved fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: CatalogQuery,
}

/// A resolved fetch, successful or not, still carrying its stamp.
#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub result: Result<Page>,
}

pub struct CatalogFetcher {
    service: Arc<dyn CatalogService>,
    page_size: u32,
    // Last sequence handed out; zero means nothing was stamped yet.
    latest: AtomicU64,
}

impl CatalogFetcher {
    pub fn new(service: Arc<dyn CatalogService>, page_size: u32) -> Self {
        Self {
            service,
            page_size,
            latest: AtomicU64::new(0),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Query for `page` of `term` at the configured page size.
    pub fn query(&self, page: u32, term: impl Into<String>) -> CatalogQuery {
        CatalogQuery::new(page, self.page_size, term)
    }

    /// Reserve the next sequence number for `query`.
    ///
    /// Stamping alone supersedes every earlier ticket, even if the new one
    /// is never fetched.
    pub fn stamp(&self, query: CatalogQuery) -> Result<FetchTicket> {
        query.validate()?;
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(FetchTicket { seq, query })
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        self.latest.load(Ordering::Acquire) == seq
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Stamp and fetch in one step.
    pub async fn fetch(
        &self,
        page: u32,
        term: impl Into<String>,
        page_size: u32,
    ) -> Result<FetchOutcome> {
        let ticket = self.stamp(CatalogQuery::new(page, page_size, term))?;
        Ok(self.fetch_ticket(ticket).await)
    }

    /// Resolve a previously stamped ticket.
    #[instrument(skip(self, ticket), fields(seq = ticket.seq, page = ticket.query.page))]
    pub async fn fetch_ticket(&self, ticket: FetchTicket) -> FetchOutcome {
        let result = self.service.fetch_page(&ticket.query).await;
        debug!(
            ok = result.is_ok(),
            latest = self.latest_seq(),
            "catalog fetch resolved"
        );
        FetchOutcome { ticket, result }
    }
}

impl std::fmt::Debug for CatalogFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogFetcher")
            .field("page_size", &self.page_size)
            .field("latest", &self.latest_seq())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::model::SoundItem;
    use crate::service::InMemoryCatalog;

    fn fetcher() -> CatalogFetcher {
        let items = (1..=20)
            .map(|n| SoundItem::new(format!("clip {n}"), format!("mem://{n}")).with_id(n))
            .collect();
        CatalogFetcher::new(Arc::new(InMemoryCatalog::new(items)), 8)
    }

    #[test]
    fn stamps_increase_strictly() {
        let fetcher = fetcher();
        assert_eq!(fetcher.latest_seq(), 0);

        let a = fetcher.stamp(fetcher.query(1, "")).unwrap();
        let b = fetcher.stamp(fetcher.query(1, "clip")).unwrap();
        assert!(b.seq > a.seq);
        assert!(!fetcher.is_latest(a.seq));
        assert!(fetcher.is_latest(b.seq));
        assert_eq!(b.query, CatalogQuery::new(1, 8, "clip"));
    }

    #[test]
    fn invalid_page_does_not_consume_a_stamp() {
        let fetcher = fetcher();
        let err = fetcher.stamp(fetcher.query(0, "")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidQuery(_)));
        assert_eq!(fetcher.latest_seq(), 0);
    }

    #[tokio::test]
    async fn outcome_keeps_its_stamp() {
        let fetcher = fetcher();
        let outcome = fetcher.fetch(3, "", 8).await.unwrap();
        assert_eq!(outcome.ticket.seq, 1);
        let page = outcome.result.unwrap();
        assert_eq!(page.current_page, 3);
        assert_eq!(page.items.len(), 4);
        assert!(fetcher.is_latest(outcome.ticket.seq));
    }

    #[tokio::test]
    async fn superseded_ticket_still_resolves() {
        let fetcher = fetcher();
        let first = fetcher.stamp(fetcher.query(1, "")).unwrap();
        let _second = fetcher.stamp(fetcher.query(2, "")).unwrap();

        let outcome = fetcher.fetch_ticket(first).await;
        assert!(outcome.result.is_ok());
        assert!(!fetcher.is_latest(outcome.ticket.seq));
    }
}
