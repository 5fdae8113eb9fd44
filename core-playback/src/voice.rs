//! # Voice Manager
//!
//! Owns the single live audio resource ("voice") of a session.
//!
//! ```text
//! Idle ──play──> Loading ──ready──> Playing <──toggle──> Paused
//!   ^               │                  │                   │
//!   └── load failed ┘                  └── end / stop ─────┴──> Idle
//! ```
//!
//! Every state transition happens under one short synchronous lock; calls
//! into the host adapter happen outside of it. Each `play` and `stop` bumps a
//! generation counter, and an adapter call that returns after its generation
//! was superseded releases what it loaded instead of touching the slot. This
//! keeps at most one voice alive even when `play` calls overlap.

use std::sync::Arc;

use bridge_traits::playback::{
    AudioSource, PlaybackAdapter, PlaybackMetadata, PlaybackOptions, PlaybackRequest,
    PlaybackSessionId, PlaybackState,
};
use core_async::sync::{watch, CancellationToken, Mutex, SyncMutex};
use core_async::time::{interval, Duration, MissedTickBehavior};
use core_catalog::{ItemKey, SoundItem};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::volume::Volume;

/// Default interval between progress samples.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Lifecycle of the voice. `Stopped` and `Ended` are transient and land in
/// `Idle` immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceState {
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Observable view of the active voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSnapshot {
    pub item: SoundItem,
    pub state: VoiceState,
    pub position: Duration,
    /// `None` until the host reports a length
    pub duration: Option<Duration>,
}

impl VoiceSnapshot {
    pub fn key(&self) -> ItemKey {
        self.item.identity()
    }

    pub fn is_paused(&self) -> bool {
        self.state == VoiceState::Paused
    }
}

struct ActiveVoice {
    item: SoundItem,
    key: ItemKey,
    state: VoiceState,
    session: Option<PlaybackSessionId>,
    position: Duration,
    duration: Option<Duration>,
    ticker: Option<CancellationToken>,
    /// Cancelled when a later `play` or `stop` supersedes the pending load.
    load: CancellationToken,
}

impl ActiveVoice {
    fn snapshot(&self) -> VoiceSnapshot {
        VoiceSnapshot {
            item: self.item.clone(),
            state: self.state,
            position: self.position,
            duration: self.duration,
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }

    fn halt(&mut self) {
        self.load.cancel();
        self.stop_ticker();
    }
}

struct Slot {
    generation: u64,
    level: Volume,
    voice: Option<ActiveVoice>,
}

struct Shared {
    adapter: Arc<dyn PlaybackAdapter>,
    events: EventBus,
    progress_interval: Duration,
    slot: SyncMutex<Slot>,
    /// Held from `prepare` until the prepared session is claimed or released,
    /// so at most one load is ever in flight.
    load_gate: Mutex<()>,
    watch_tx: watch::Sender<Option<VoiceSnapshot>>,
}

impl Shared {
    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.emit(CoreEvent::Playback(event));
    }

    /// Push the current slot to watchers. Call with the slot locked.
    fn publish(&self, slot: &Slot) {
        self.watch_tx
            .send_replace(slot.voice.as_ref().map(ActiveVoice::snapshot));
    }

    /// Best-effort teardown of a host session.
    async fn release(&self, session: PlaybackSessionId, stop_first: bool) {
        if stop_first {
            if let Err(e) = self.adapter.stop(session).await {
                debug!(%session, error = %e, "stop before unload failed");
            }
        }
        if let Err(e) = self.adapter.unload(session).await {
            warn!(%session, error = %e, "failed to unload playback session");
        }
    }
}

enum Claim {
    Resume,
    Active,
    Load {
        generation: u64,
        load: CancellationToken,
        previous: Option<ActiveVoice>,
    },
}

/// Single-voice state machine over a [`PlaybackAdapter`].
///
/// Cloning yields another handle to the same voice.
#[derive(Clone)]
pub struct VoiceManager {
    shared: Arc<Shared>,
}

impl VoiceManager {
    pub fn new(adapter: Arc<dyn PlaybackAdapter>, events: EventBus) -> Self {
        Self::with_progress_interval(adapter, events, DEFAULT_PROGRESS_INTERVAL)
    }

    pub fn with_progress_interval(
        adapter: Arc<dyn PlaybackAdapter>,
        events: EventBus,
        progress_interval: Duration,
    ) -> Self {
        let (watch_tx, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                adapter,
                events,
                progress_interval,
                slot: SyncMutex::new(Slot {
                    generation: 0,
                    level: Volume::default(),
                    voice: None,
                }),
                load_gate: Mutex::new(()),
                watch_tx,
            }),
        }
    }

    pub fn snapshot(&self) -> Option<VoiceSnapshot> {
        let slot = self.shared.slot.lock();
        slot.voice.as_ref().map(ActiveVoice::snapshot)
    }

    pub fn state(&self) -> VoiceState {
        let slot = self.shared.slot.lock();
        slot.voice
            .as_ref()
            .map_or(VoiceState::Idle, |voice| voice.state)
    }

    /// Level most recently handed to `play` or `apply_volume`.
    pub fn level(&self) -> Volume {
        self.shared.slot.lock().level
    }

    /// Observe every voice transition and progress sample.
    pub fn subscribe(&self) -> watch::Receiver<Option<VoiceSnapshot>> {
        self.shared.watch_tx.subscribe()
    }

    /// Start `item` at `volume`, replacing any other voice.
    ///
    /// Resumes instead when `item` is the paused voice; does nothing when it
    /// is already playing or loading. Returns `Ok` without playing when a
    /// later `play` or `stop` superseded this one while it was loading.
    #[instrument(skip(self, item), fields(item = %item.identity()))]
    pub async fn play(&self, item: SoundItem, volume: Volume) -> Result<()> {
        let key = item.identity();
        if item.audio_ref.trim().is_empty() {
            return Err(PlaybackError::SourceUnavailable(key.to_string()));
        }

        let claimed = {
            let mut slot = self.shared.slot.lock();
            let existing = slot
                .voice
                .as_ref()
                .filter(|voice| voice.key == key)
                .map(|voice| voice.state);
            match existing {
                Some(VoiceState::Paused) => Claim::Resume,
                Some(_) => Claim::Active,
                None => {
                    slot.generation += 1;
                    slot.level = volume;
                    let previous = slot.voice.take().map(|mut voice| {
                        voice.halt();
                        voice
                    });
                    let load = CancellationToken::new();
                    slot.voice = Some(ActiveVoice {
                        item: item.clone(),
                        key: key.clone(),
                        state: VoiceState::Loading,
                        session: None,
                        position: Duration::ZERO,
                        duration: None,
                        ticker: None,
                        load: load.clone(),
                    });
                    self.shared.publish(&slot);
                    Claim::Load {
                        generation: slot.generation,
                        load,
                        previous,
                    }
                }
            }
        };

        let (generation, load, previous) = match claimed {
            Claim::Resume => return self.resume().await,
            Claim::Active => {
                debug!("already active");
                return Ok(());
            }
            Claim::Load {
                generation,
                load,
                previous,
            } => (generation, load, previous),
        };

        if let Some(previous) = previous {
            if let Some(session) = previous.session {
                self.shared.release(session, true).await;
            }
            self.shared.emit(PlaybackEvent::Stopped {
                item_id: previous.key.to_string(),
            });
        }

        let item_id = key.to_string();
        self.shared.emit(PlaybackEvent::Loading {
            item_id: item_id.clone(),
        });

        let request = PlaybackRequest::new(AudioSource::from_uri(item.audio_ref.clone()))
            .with_options(PlaybackOptions {
                start_position: Duration::ZERO,
                initial_volume: volume.gain(),
            })
            .with_metadata(PlaybackMetadata {
                track_id: Some(item_id.clone()),
                title: Some(item.name.clone()),
                tags: item.tags.clone(),
            });

        // A superseded load in flight drops its `prepare` and hands the gate on.
        let gate = self.shared.load_gate.lock().await;
        if load.is_cancelled() {
            debug!("load superseded before it started");
            return Ok(());
        }
        let prepared = core_async::select! {
            biased;
            _ = load.cancelled() => None,
            prepared = self.shared.adapter.prepare(request) => Some(prepared),
        };
        let session = match prepared {
            None => {
                debug!("load cancelled");
                return Ok(());
            }
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                drop(gate);
                return self.fail_load(generation, &item_id, None, e.to_string()).await;
            }
        };

        let claimed_level = {
            let mut slot = self.shared.slot.lock();
            if slot.generation == generation {
                if let Some(voice) = slot.voice.as_mut() {
                    voice.session = Some(session);
                }
                Some(slot.level)
            } else {
                None
            }
        };
        let Some(level) = claimed_level else {
            debug!(%session, "load superseded, releasing");
            self.shared.release(session, false).await;
            return Ok(());
        };
        drop(gate);

        // The global volume may have moved while the clip was loading.
        if level != volume {
            if let Err(e) = self.shared.adapter.set_volume(session, level.gain()).await {
                warn!(%session, error = %e, "failed to apply volume after load");
            }
        }

        if let Err(e) = self.shared.adapter.play(session).await {
            return self
                .fail_load(generation, &item_id, Some(session), e.to_string())
                .await;
        }

        {
            let mut slot = self.shared.slot.lock();
            if slot.generation != generation {
                // Whoever superseded us took the session along with the voice.
                return Ok(());
            }
            let token = CancellationToken::new();
            if let Some(voice) = slot.voice.as_mut() {
                voice.state = VoiceState::Playing;
                voice.ticker = Some(token.clone());
            }
            self.shared.publish(&slot);
            self.spawn_ticker(session, generation, token);
        }

        info!(name = %item.name, "playback started");
        self.shared.emit(PlaybackEvent::Started {
            item_id,
            name: item.name,
        });
        Ok(())
    }

    async fn fail_load(
        &self,
        generation: u64,
        item_id: &str,
        session: Option<PlaybackSessionId>,
        reason: String,
    ) -> Result<()> {
        let current = {
            let mut slot = self.shared.slot.lock();
            let current = slot.generation == generation;
            if current {
                slot.voice = None;
                self.shared.publish(&slot);
            }
            current
        };

        if let Some(session) = session {
            if current {
                self.shared.release(session, false).await;
            }
        }

        if !current {
            debug!(item_id, "superseded load failed");
            return Ok(());
        }

        warn!(item_id, reason = %reason, "failed to load clip");
        self.shared.emit(PlaybackEvent::Error {
            item_id: Some(item_id.to_string()),
            message: reason.clone(),
            recoverable: true,
        });
        Err(PlaybackError::LoadFailed {
            item_id: item_id.to_string(),
            reason,
        })
    }

    /// Pause the playing voice, keeping its position.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let (session, key) = {
            let slot = self.shared.slot.lock();
            match slot.voice.as_ref() {
                Some(ActiveVoice {
                    state: VoiceState::Playing,
                    session: Some(session),
                    key,
                    ..
                }) => (*session, key.clone()),
                _ => return Err(PlaybackError::NotPlaying),
            }
        };

        self.shared.adapter.pause(session).await?;
        let position = self.shared.adapter.get_position(session).await.ok();

        let position = {
            let mut slot = self.shared.slot.lock();
            let Some(voice) = slot
                .voice
                .as_mut()
                .filter(|voice| voice.session == Some(session))
            else {
                return Ok(());
            };
            voice.state = VoiceState::Paused;
            voice.stop_ticker();
            if let Some(position) = position {
                voice.position = position;
            }
            let position = voice.position;
            self.shared.publish(&slot);
            position
        };

        self.shared.emit(PlaybackEvent::Paused {
            item_id: key.to_string(),
            position_ms: position.as_millis() as u64,
        });
        Ok(())
    }

    /// Resume the paused voice from where it was paused.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> Result<()> {
        let (session, key, generation) = {
            let slot = self.shared.slot.lock();
            match slot.voice.as_ref() {
                Some(ActiveVoice {
                    state: VoiceState::Paused,
                    session: Some(session),
                    key,
                    ..
                }) => (*session, key.clone(), slot.generation),
                _ => return Err(PlaybackError::NotPlaying),
            }
        };

        self.shared.adapter.play(session).await?;

        let position = {
            let mut slot = self.shared.slot.lock();
            if slot.generation != generation {
                return Ok(());
            }
            let token = CancellationToken::new();
            let Some(voice) = slot
                .voice
                .as_mut()
                .filter(|voice| voice.session == Some(session))
            else {
                return Ok(());
            };
            voice.state = VoiceState::Playing;
            voice.stop_ticker();
            voice.ticker = Some(token.clone());
            let position = voice.position;
            self.shared.publish(&slot);
            self.spawn_ticker(session, generation, token);
            position
        };

        self.shared.emit(PlaybackEvent::Resumed {
            item_id: key.to_string(),
            position_ms: position.as_millis() as u64,
        });
        Ok(())
    }

    /// Pause/resume when `item` is the active voice, otherwise [`play`](Self::play) it.
    pub async fn toggle(&self, item: SoundItem, volume: Volume) -> Result<()> {
        let state = {
            let slot = self.shared.slot.lock();
            let key = item.identity();
            slot.voice
                .as_ref()
                .filter(|voice| voice.key == key)
                .map(|voice| voice.state)
        };

        match state {
            Some(VoiceState::Playing) => self.pause().await,
            Some(VoiceState::Paused) => self.resume().await,
            Some(VoiceState::Loading) => Ok(()),
            Some(VoiceState::Idle) | None => self.play(item, volume).await,
        }
    }

    /// Release the voice, cancelling a load in progress.
    ///
    /// Returns `false` when there was nothing to stop.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> bool {
        let previous = {
            let mut slot = self.shared.slot.lock();
            slot.generation += 1;
            let previous = slot.voice.take().map(|mut voice| {
                voice.halt();
                voice
            });
            if previous.is_some() {
                self.shared.publish(&slot);
            }
            previous
        };

        let Some(voice) = previous else {
            return false;
        };
        if let Some(session) = voice.session {
            self.shared.release(session, true).await;
        }
        debug!(item = %voice.key, "voice stopped");
        self.shared.emit(PlaybackEvent::Stopped {
            item_id: voice.key.to_string(),
        });
        true
    }

    /// The host reported that `session` reached its end.
    ///
    /// Returns `false` if `session` is not the active voice.
    pub async fn handle_completion(&self, session: PlaybackSessionId) -> bool {
        finish(&self.shared, session).await
    }

    /// Set the level of the active voice without restarting it.
    #[instrument(skip(self), fields(level = volume.level()))]
    pub async fn apply_volume(&self, volume: Volume) -> Result<()> {
        let session = {
            let mut slot = self.shared.slot.lock();
            slot.level = volume;
            slot.voice.as_ref().and_then(|voice| voice.session)
        };

        if let Some(session) = session {
            self.shared.adapter.set_volume(session, volume.gain()).await?;
        }
        self.shared.emit(PlaybackEvent::VolumeApplied {
            level: volume.level(),
        });
        Ok(())
    }

    fn spawn_ticker(&self, session: PlaybackSessionId, generation: u64, token: CancellationToken) {
        let shared = Arc::clone(&self.shared);
        core_async::spawn(async move {
            let mut ticker = interval(shared.progress_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                core_async::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if !sample(&shared, session, generation, &token).await {
                    break;
                }
            }
        });
    }
}

/// One progress sample. Returns `false` once the ticker should stop.
async fn sample(
    shared: &Shared,
    session: PlaybackSessionId,
    generation: u64,
    token: &CancellationToken,
) -> bool {
    let state = match shared.adapter.state(session).await {
        Ok(state) => state,
        Err(e) => {
            debug!(%session, error = %e, "progress sample failed");
            return !token.is_cancelled();
        }
    };

    match state {
        PlaybackState::Completed => {
            finish(shared, session).await;
            return false;
        }
        PlaybackState::Error { message } => {
            fail_active(shared, session, message).await;
            return false;
        }
        _ => {}
    }

    let position = shared.adapter.get_position(session).await.ok();
    let duration = shared.adapter.get_duration(session).await.ok().flatten();

    let event = {
        let mut slot = shared.slot.lock();
        if slot.generation != generation || token.is_cancelled() {
            return false;
        }
        let Some(voice) = slot
            .voice
            .as_mut()
            .filter(|voice| voice.session == Some(session) && voice.state == VoiceState::Playing)
        else {
            return false;
        };
        if let Some(position) = position {
            voice.position = position;
        }
        if duration.is_some() {
            voice.duration = duration;
        }
        let event = PlaybackEvent::PositionChanged {
            item_id: voice.key.to_string(),
            position_ms: voice.position.as_millis() as u64,
            duration_ms: voice.duration.map(|d| d.as_millis() as u64),
        };
        shared.publish(&slot);
        event
    };

    shared.emit(event);
    true
}

/// Natural end: clear the voice if `session` still owns it.
async fn finish(shared: &Shared, session: PlaybackSessionId) -> bool {
    let Some(mut voice) = take_if_session(shared, session) else {
        return false;
    };
    voice.stop_ticker();
    shared.release(session, false).await;
    info!(item = %voice.key, "clip completed");
    shared.emit(PlaybackEvent::Completed {
        item_id: voice.key.to_string(),
    });
    true
}

async fn fail_active(shared: &Shared, session: PlaybackSessionId, message: String) {
    let Some(mut voice) = take_if_session(shared, session) else {
        return;
    };
    voice.stop_ticker();
    shared.release(session, true).await;
    warn!(item = %voice.key, %message, "host reported playback error");
    shared.emit(PlaybackEvent::Error {
        item_id: Some(voice.key.to_string()),
        message,
        recoverable: false,
    });
}

fn take_if_session(shared: &Shared, session: PlaybackSessionId) -> Option<ActiveVoice> {
    let mut slot = shared.slot.lock();
    if slot.voice.as_ref().and_then(|voice| voice.session) != Some(session) {
        return None;
    }
    slot.generation += 1;
    let voice = slot.voice.take();
    shared.publish(&slot);
    voice
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("state", &self.state())
            .field("progress_interval", &self.shared.progress_interval)
            .finish_non_exhaustive()
    }
}
