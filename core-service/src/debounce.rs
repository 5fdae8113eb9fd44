//! Search-box debouncing
//!
//! Keystrokes are coalesced into one catalog refresh per quiet period. When
//! the quiet period elapses the term is checked against the query policy:
//! empty terms (when configured) and a term identical to the last one fired
//! are dropped instead of refetching the same results.

use std::future::Future;
use std::sync::Arc;

use core_async::debounce::Debouncer;
use core_async::sync::SyncMutex;
use core_async::time::Duration;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use tracing::debug;

/// Debounces search terms and filters out refreshes that would change nothing.
pub struct QueryDebouncer {
    debouncer: Debouncer<String>,
    last_fired: Arc<SyncMutex<Option<String>>>,
}

impl QueryDebouncer {
    pub fn new<F, Fut>(quiet_period: Duration, skip_empty: bool, events: EventBus, on_fire: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let last_fired: Arc<SyncMutex<Option<String>>> = Arc::new(SyncMutex::new(None));
        let fired = Arc::clone(&last_fired);
        let debouncer = Debouncer::new(quiet_period, move |raw: String| {
            let term = raw.trim().to_string();
            let skip = skip_reason(&term, skip_empty, fired.lock().as_deref());
            let fire = match skip {
                Some(reason) => {
                    debug!(%term, reason, "search skipped");
                    let _ = events.emit(CoreEvent::Session(SessionEvent::SearchSkipped {
                        term,
                        reason: reason.to_string(),
                    }));
                    None
                }
                None => {
                    *fired.lock() = Some(term.clone());
                    Some(on_fire(term))
                }
            };
            async move {
                if let Some(fire) = fire {
                    fire.await;
                }
            }
        });

        Self {
            debouncer,
            last_fired,
        }
    }

    /// Restart the quiet period with `term`.
    pub fn submit(&self, term: impl Into<String>) {
        self.debouncer.submit(term.into());
    }

    /// Drop the pending term without firing it.
    pub fn cancel(&self) -> bool {
        self.debouncer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Record a term fetched outside the debouncer (the initial load).
    pub fn mark_fired(&self, term: impl Into<String>) {
        *self.last_fired.lock() = Some(term.into());
    }

    /// Let the next term fire even if it equals the last one, e.g. after its
    /// fetch failed.
    pub fn forget_last_fired(&self) {
        *self.last_fired.lock() = None;
    }

    pub fn last_fired(&self) -> Option<String> {
        self.last_fired.lock().clone()
    }
}

fn skip_reason(term: &str, skip_empty: bool, last_fired: Option<&str>) -> Option<&'static str> {
    if skip_empty && term.is_empty() {
        Some("empty")
    } else if last_fired == Some(term) {
        Some("unchanged")
    } else {
        None
    }
}

impl std::fmt::Debug for QueryDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDebouncer")
            .field("delay", &self.debouncer.delay())
            .field("last_fired", &self.last_fired())
            .finish()
    }
}
