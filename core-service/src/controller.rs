//! # Session Controller
//!
//! The single entry point for a browsing/playback session. Presentation code
//! reads [`Session`] snapshots and reports user intents; everything else
//! (debouncing, fetch sequencing, the voice, volume propagation) happens
//! behind this type.
//!
//! ## Ordering
//!
//! Session state sits behind one synchronous lock that is never held across
//! an `.await`. Fetches are stamped while that lock is held, so sequence
//! numbers follow intent order. A reply is applied only if its stamp is still
//! the latest one issued; anything older is dropped on arrival.
//!
//! ```ignore
//! let controller = SessionController::from_config(config)?;
//! controller.start().await?;
//!
//! controller.search_term_changed("rain")?;
//! controller.item_play_toggled(&item.identity()).await?;
//! controller.volume_changed(30)?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use bridge_traits::time::Clock;
use core_async::sync::{watch, CancellationToken, SyncMutex};
use core_catalog::{
    append_unique, CatalogFetcher, CatalogService, FetchOutcome, FetchTicket,
    HttpCatalogService, ItemKey,
};
use core_playback::{PlaybackError, VoiceManager, VoiceState, Volume, VolumePropagator};
use core_runtime::config::{ResultMode, SessionConfig, SessionSettings};
use core_runtime::events::{
    CatalogEvent, CoreEvent, EventBus, EventStream, SessionEvent,
};
use tracing::{debug, info, instrument, warn};

use crate::debounce::QueryDebouncer;
use crate::error::{Result, ServiceError};
use crate::session::{Notice, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    /// Page 1 of a (new) search term; always replaces the results
    Search,
    /// Another page of the active term
    Page,
}

struct State {
    // `voice`, `global_volume` and `loading` are filled in when snapshotting.
    session: Session,
    pending: Option<u64>,
}

struct Inner {
    settings: SessionSettings,
    fetcher: CatalogFetcher,
    voice: VoiceManager,
    volume: VolumePropagator,
    query: QueryDebouncer,
    events: EventBus,
    clock: Arc<dyn Clock>,
    state: SyncMutex<State>,
    session_tx: watch::Sender<Session>,
    lifecycle: CancellationToken,
    started: AtomicBool,
}

impl Inner {
    fn snapshot(&self, state: &State) -> Session {
        let mut session = state.session.clone();
        session.voice = self.voice.snapshot();
        session.global_volume = self.volume.current();
        session.loading = state.pending.is_some();
        session
    }

    fn publish(&self, state: &State) {
        self.session_tx.send_replace(self.snapshot(state));
    }

    fn publish_now(&self) {
        let state = self.state.lock();
        self.publish(&state);
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.events.emit(event);
    }

    fn is_closed(&self) -> bool {
        self.lifecycle.is_cancelled()
    }

    fn notice(&self, message: String) -> Notice {
        Notice {
            message,
            at: self.clock.now(),
        }
    }

    /// Stamp a fetch and mark the session as loading. Call with the state locked.
    fn begin_fetch(&self, state: &mut State, page: u32, term: String) -> Result<FetchTicket> {
        let ticket = self.fetcher.stamp(self.fetcher.query(page, term))?;
        state.pending = Some(ticket.seq);
        self.publish(state);
        self.emit(CoreEvent::Catalog(CatalogEvent::FetchStarted {
            seq: ticket.seq,
            page: ticket.query.page,
            term: ticket.query.term.clone(),
        }));
        Ok(ticket)
    }

    async fn run_search(&self, term: String) {
        let ticket = {
            let mut state = self.state.lock();
            if self.is_closed() {
                return;
            }
            match self.begin_fetch(&mut state, 1, term) {
                Ok(ticket) => ticket,
                Err(e) => {
                    warn!(error = %e, "could not issue search");
                    return;
                }
            }
        };
        self.resolve(ticket, FetchKind::Search).await;
    }

    async fn resolve(&self, ticket: FetchTicket, kind: FetchKind) {
        let outcome = self.fetcher.fetch_ticket(ticket).await;
        self.apply(outcome, kind);
    }

    fn apply(&self, outcome: FetchOutcome, kind: FetchKind) {
        let FetchOutcome { ticket, result } = outcome;
        let seq = ticket.seq;

        let mut state = self.state.lock();
        if self.is_closed() || !self.fetcher.is_latest(seq) {
            drop(state);
            let latest = self.fetcher.latest_seq();
            debug!(seq, latest, "dropping stale catalog reply");
            self.emit(CoreEvent::Catalog(CatalogEvent::FetchDiscarded { seq, latest }));
            return;
        }

        state.pending = None;
        let session = &mut state.session;
        let event = match result {
            Ok(page) => {
                if kind == FetchKind::Page && self.settings.result_mode == ResultMode::Append {
                    append_unique(&mut session.items, page.items);
                } else {
                    session.items = page.items;
                }
                session.page = ticket.query.page;
                session.page_count = page.page_count;
                session.total = page.total;
                session.active_term = ticket.query.term.clone();
                session.last_error = None;

                debug!(
                    seq,
                    page = session.page,
                    items = session.items.len(),
                    "catalog page applied"
                );
                CatalogEvent::FetchApplied {
                    seq,
                    page: session.page,
                    term: ticket.query.term,
                    item_count: session.items.len(),
                    total: session.total,
                    page_count: session.page_count,
                }
            }
            Err(e) => {
                let retained = !session.items.is_empty();
                if !retained {
                    session.page = 1;
                    session.page_count = 0;
                    session.total = 0;
                    session.active_term = ticket.query.term.clone();
                }
                session.last_error = Some(self.notice(format!("Could not load sounds: {}", e)));
                // The failed term must not count as unchanged on retry.
                self.query.forget_last_fired();

                warn!(seq, error = %e, retained, "catalog fetch failed");
                CatalogEvent::FetchFailed {
                    seq,
                    page: ticket.query.page,
                    term: ticket.query.term,
                    message: e.to_string(),
                    retained,
                }
            }
        };

        self.publish(&state);
        drop(state);
        self.emit(CoreEvent::Catalog(event));
    }
}

/// Owns one session: its results, its single voice and its volume.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Build a controller that lists clips from the configured HTTP endpoint.
    pub fn from_config(config: SessionConfig) -> Result<Self> {
        let endpoint = config
            .catalog_endpoint
            .clone()
            .ok_or_else(|| ServiceError::CapabilityMissing {
                capability: "CatalogService".to_string(),
                message: "No catalog endpoint is configured. Set one with \
                          .catalog_endpoint() or pass a catalog to SessionController::with_catalog()."
                    .to_string(),
            })?;
        let http_client =
            config
                .http_client
                .clone()
                .ok_or_else(|| ServiceError::CapabilityMissing {
                    capability: "HttpClient".to_string(),
                    message: "A catalog endpoint is configured but no HttpClient was provided."
                        .to_string(),
                })?;

        let catalog: Arc<dyn CatalogService> =
            Arc::new(HttpCatalogService::new(http_client, endpoint));
        Self::with_catalog(config, catalog)
    }

    /// Build a controller over any catalog source.
    pub fn with_catalog(config: SessionConfig, catalog: Arc<dyn CatalogService>) -> Result<Self> {
        config.settings.validate()?;

        let SessionConfig {
            playback_adapter,
            clock,
            settings,
            ..
        } = config;

        let events = EventBus::new(settings.event_buffer_size);
        let voice = VoiceManager::with_progress_interval(
            playback_adapter,
            events.clone(),
            settings.progress_interval(),
        );
        let initial_volume = Volume::new(settings.initial_volume);
        let volume =
            VolumePropagator::new(voice.clone(), initial_volume, settings.volume_debounce());
        let fetcher = CatalogFetcher::new(catalog, settings.page_size);
        let (session_tx, _) = watch::channel(Session::new(initial_volume));

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let query = QueryDebouncer::new(
                settings.search_debounce(),
                settings.skip_empty_queries,
                events.clone(),
                move |term| {
                    let weak = weak.clone();
                    async move {
                        if let Some(inner) = weak.upgrade() {
                            inner.run_search(term).await;
                        }
                    }
                },
            );

            Inner {
                settings,
                fetcher,
                voice,
                volume,
                query,
                events,
                clock,
                state: SyncMutex::new(State {
                    session: Session::new(initial_volume),
                    pending: None,
                }),
                session_tx,
                lifecycle: CancellationToken::new(),
                started: AtomicBool::new(false),
            }
        });

        info!(
            page_size = inner.settings.page_size,
            result_mode = ?inner.settings.result_mode,
            "session controller created"
        );
        Ok(Self { inner })
    }

    /// Load the unfiltered first page. Later calls do nothing.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        if self.inner.is_closed() {
            return Err(ServiceError::SessionClosed);
        }
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.spawn_voice_forwarder();
        self.inner.query.mark_fired("");

        let ticket = {
            let mut state = self.inner.state.lock();
            self.inner.begin_fetch(&mut state, 1, String::new())?
        };
        self.inner.resolve(ticket, FetchKind::Search).await;
        Ok(())
    }

    /// Voice transitions and progress samples happen off-intent; republish
    /// the session whenever the voice changes.
    fn spawn_voice_forwarder(&self) {
        let weak = Arc::downgrade(&self.inner);
        let lifecycle = self.inner.lifecycle.clone();
        let mut voice_rx = self.inner.voice.subscribe();

        core_async::spawn(async move {
            loop {
                core_async::select! {
                    biased;
                    _ = lifecycle.cancelled() => break,
                    changed = voice_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                match weak.upgrade() {
                    Some(inner) => inner.publish_now(),
                    None => break,
                }
            }
        });
    }

    /// The search box changed. Fetches page 1 of `term` once typing settles.
    #[instrument(skip(self, term))]
    pub fn search_term_changed(&self, term: impl Into<String>) -> Result<()> {
        if self.inner.is_closed() {
            return Err(ServiceError::SessionClosed);
        }
        let term = term.into();
        {
            let mut state = self.inner.state.lock();
            state.session.search_term = term.clone();
            self.inner.publish(&state);
        }
        self.inner.query.submit(term);
        Ok(())
    }

    /// Show `new_page` of the active result set.
    ///
    /// Returns `false` without fetching when a fetch is already in flight or
    /// `new_page` is outside `1..=page_count`.
    #[instrument(skip(self))]
    pub async fn page_changed(&self, new_page: u32) -> Result<bool> {
        if self.inner.is_closed() {
            return Err(ServiceError::SessionClosed);
        }

        let ticket = {
            let mut state = self.inner.state.lock();
            let page_count = state.session.page_count;
            if state.pending.is_some() || new_page < 1 || new_page > page_count {
                drop(state);
                debug!(new_page, page_count, "page change ignored");
                self.inner
                    .emit(CoreEvent::Session(SessionEvent::PageRejected {
                        requested: new_page,
                        page_count,
                    }));
                return Ok(false);
            }
            let term = state.session.active_term.clone();
            self.inner.begin_fetch(&mut state, new_page, term)?
        };

        self.inner.resolve(ticket, FetchKind::Page).await;
        Ok(true)
    }

    /// Show the page after the current one.
    pub async fn next_page(&self) -> Result<bool> {
        let target = self.inner.state.lock().session.page.saturating_add(1);
        self.page_changed(target).await
    }

    /// Show the page before the current one.
    pub async fn previous_page(&self) -> Result<bool> {
        let target = self.inner.state.lock().session.page.saturating_sub(1);
        self.page_changed(target).await
    }

    /// The play/pause control of the card for `key` was pressed.
    ///
    /// Returns the resulting state of that item's voice.
    #[instrument(skip(self, key), fields(item = %key))]
    pub async fn item_play_toggled(&self, key: &ItemKey) -> Result<VoiceState> {
        if self.inner.is_closed() {
            return Err(ServiceError::SessionClosed);
        }

        let item = self.inner.state.lock().session.item(key).cloned();
        let Some(item) = item else {
            return Err(ServiceError::UnknownItem(key.to_string()));
        };

        let result = self
            .inner
            .voice
            .toggle(item, self.inner.volume.current())
            .await;

        let failure = match &result {
            Err(PlaybackError::LoadFailed { reason, .. }) => Some(reason.clone()),
            Err(e @ PlaybackError::SourceUnavailable(_)) => Some(e.to_string()),
            _ => None,
        };
        if let Some(reason) = failure {
            let notice = self.inner.notice(format!("Could not play sound: {}", reason));
            self.inner.state.lock().session.last_error = Some(notice);
        }
        self.inner.publish_now();
        result?;

        Ok(self
            .inner
            .voice
            .snapshot()
            .filter(|voice| voice.key() == *key)
            .map_or(VoiceState::Idle, |voice| voice.state))
    }

    /// The volume slider moved. The value is stored at once and reaches the
    /// playing voice after the quiet period.
    #[instrument(skip(self))]
    pub fn volume_changed(&self, value: i32) -> Result<Volume> {
        if self.inner.is_closed() {
            return Err(ServiceError::SessionClosed);
        }
        let level = u8::try_from(value)
            .ok()
            .filter(|level| *level <= 100)
            .ok_or(ServiceError::InvalidVolume(value))?;

        let volume = self.inner.volume.set_volume(level);
        self.inner
            .emit(CoreEvent::Session(SessionEvent::VolumeRequested { level }));
        self.inner.publish_now();
        Ok(volume)
    }

    /// Stop whatever is playing. Returns `false` if nothing was.
    pub async fn stop_all(&self) -> bool {
        let stopped = self.inner.voice.stop().await;
        self.inner.publish_now();
        stopped
    }

    pub fn session(&self) -> Session {
        let state = self.inner.state.lock();
        self.inner.snapshot(&state)
    }

    /// Observe every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.session_tx.subscribe()
    }

    pub fn events(&self) -> EventStream {
        self.inner.events.stream()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    /// Tear the session down. Pending search and volume changes are dropped,
    /// the voice is released and late catalog replies are ignored. The stored
    /// volume is kept.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        if self.inner.is_closed() {
            return;
        }
        self.inner.lifecycle.cancel();
        self.inner.query.cancel();
        self.inner.volume.cancel();
        self.inner.voice.stop().await;

        {
            let mut state = self.inner.state.lock();
            state.pending = None;
            self.inner.publish(&state);
        }
        self.inner.emit(CoreEvent::Session(SessionEvent::ShutDown));
        info!("session shut down");
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("settings", &self.inner.settings)
            .field("fetcher", &self.inner.fetcher)
            .field("voice", &self.inner.voice)
            .field("closed", &self.inner.is_closed())
            .finish_non_exhaustive()
    }
}
