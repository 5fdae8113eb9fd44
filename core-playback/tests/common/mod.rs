//! In-process stand-in for a host audio engine.
//!
//! Positions advance with the tokio clock, so paused-time tests control
//! playback progress with `tokio::time::advance`.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::playback::{
    PlaybackAdapter, PlaybackRequest, PlaybackSessionId, PlaybackState,
};
use core_async::time::{sleep, Duration, Instant};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
struct FakeSession {
    uri: String,
    state: PlaybackState,
    accumulated: Duration,
    resumed_at: Option<Instant>,
    volume: f32,
}

impl FakeSession {
    fn position(&self) -> Duration {
        match self.resumed_at {
            Some(at) => self.accumulated + at.elapsed(),
            None => self.accumulated,
        }
    }
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<PlaybackSessionId, FakeSession>,
    plays: Vec<String>,
    prepared: Vec<String>,
    max_playing: usize,
    loading: usize,
    max_loading: usize,
}

impl Inner {
    fn playing_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.state == PlaybackState::Playing)
            .count()
    }
}

/// Counts a `prepare` as in flight until it returns or is dropped.
struct LoadInFlight<'a>(&'a Mutex<Inner>);

impl<'a> LoadInFlight<'a> {
    fn enter(inner: &'a Mutex<Inner>) -> Self {
        let mut guard = inner.lock();
        guard.loading += 1;
        guard.max_loading = guard.max_loading.max(guard.loading);
        Self(inner)
    }
}

impl Drop for LoadInFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().loading -= 1;
    }
}

#[derive(Default)]
pub struct FakeAdapter {
    inner: Mutex<Inner>,
    load_delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashSet<String>>,
    clip_length: Mutex<Option<Duration>>,
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip_length(self, length: Duration) -> Self {
        *self.clip_length.lock() = Some(length);
        self
    }

    pub fn set_load_delay(&self, uri: &str, delay: Duration) {
        self.load_delays.lock().insert(uri.to_string(), delay);
    }

    pub fn fail_loads_for(&self, uri: &str) {
        self.failing.lock().insert(uri.to_string());
    }

    /// Every URI passed to `play`, in call order.
    pub fn plays(&self) -> Vec<String> {
        self.inner.lock().plays.clone()
    }

    pub fn prepared(&self) -> Vec<String> {
        self.inner.lock().prepared.clone()
    }

    pub fn playing_uris(&self) -> Vec<String> {
        self.inner
            .lock()
            .sessions
            .values()
            .filter(|s| s.state == PlaybackState::Playing)
            .map(|s| s.uri.clone())
            .collect()
    }

    /// Highest number of sessions ever playing at once.
    pub fn max_concurrent_playing(&self) -> usize {
        self.inner.lock().max_playing
    }

    /// Highest number of `prepare` calls ever in flight at once.
    pub fn max_concurrent_loads(&self) -> usize {
        self.inner.lock().max_loading
    }

    pub fn live_sessions(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn session_for(&self, uri: &str) -> Option<PlaybackSessionId> {
        self.inner
            .lock()
            .sessions
            .iter()
            .find(|(_, s)| s.uri == uri)
            .map(|(id, _)| *id)
    }

    pub fn volume_of(&self, uri: &str) -> Option<f32> {
        self.inner
            .lock()
            .sessions
            .values()
            .find(|s| s.uri == uri)
            .map(|s| s.volume)
    }

    pub fn position_of(&self, uri: &str) -> Option<Duration> {
        self.inner
            .lock()
            .sessions
            .values()
            .find(|s| s.uri == uri)
            .map(FakeSession::position)
    }

    fn with_session<T>(
        &self,
        session: PlaybackSessionId,
        f: impl FnOnce(&mut FakeSession) -> T,
    ) -> Result<T> {
        let mut inner = self.inner.lock();
        let found = inner
            .sessions
            .get_mut(&session)
            .ok_or_else(|| BridgeError::UnknownSession(session.to_string()))?;
        Ok(f(found))
    }
}

#[async_trait]
impl PlaybackAdapter for FakeAdapter {
    async fn prepare(&self, request: PlaybackRequest) -> Result<PlaybackSessionId> {
        let uri = request.source.uri().to_string();
        let _in_flight = LoadInFlight::enter(&self.inner);
        let delay = self.load_delays.lock().get(&uri).copied();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if self.failing.lock().contains(&uri) {
            return Err(BridgeError::OperationFailed(format!("cannot decode {uri}")));
        }

        let id = PlaybackSessionId::new();
        let mut inner = self.inner.lock();
        inner.prepared.push(uri.clone());
        inner.sessions.insert(
            id,
            FakeSession {
                uri,
                state: PlaybackState::Idle,
                accumulated: request.options.start_position,
                resumed_at: None,
                volume: request.options.initial_volume,
            },
        );
        Ok(id)
    }

    async fn play(&self, session: PlaybackSessionId) -> Result<()> {
        let mut inner = self.inner.lock();
        let found = inner
            .sessions
            .get_mut(&session)
            .ok_or_else(|| BridgeError::UnknownSession(session.to_string()))?;
        if found.state != PlaybackState::Playing {
            found.state = PlaybackState::Playing;
            found.resumed_at = Some(Instant::now());
        }
        let uri = found.uri.clone();
        inner.plays.push(uri);
        let playing = inner.playing_count();
        inner.max_playing = inner.max_playing.max(playing);
        Ok(())
    }

    async fn pause(&self, session: PlaybackSessionId) -> Result<()> {
        self.with_session(session, |s| {
            s.accumulated = s.position();
            s.resumed_at = None;
            s.state = PlaybackState::Paused;
        })
    }

    async fn stop(&self, session: PlaybackSessionId) -> Result<()> {
        self.with_session(session, |s| {
            s.accumulated = Duration::ZERO;
            s.resumed_at = None;
            s.state = PlaybackState::Stopped;
        })
    }

    async fn seek(&self, session: PlaybackSessionId, position: Duration) -> Result<()> {
        self.with_session(session, |s| {
            s.accumulated = position;
            if s.resumed_at.is_some() {
                s.resumed_at = Some(Instant::now());
            }
        })
    }

    async fn set_volume(&self, session: PlaybackSessionId, volume: f32) -> Result<()> {
        self.with_session(session, |s| s.volume = volume)
    }

    async fn get_position(&self, session: PlaybackSessionId) -> Result<Duration> {
        let length = *self.clip_length.lock();
        self.with_session(session, |s| match length {
            Some(length) => s.position().min(length),
            None => s.position(),
        })
    }

    async fn get_duration(&self, session: PlaybackSessionId) -> Result<Option<Duration>> {
        let length = *self.clip_length.lock();
        self.with_session(session, |_| length)
    }

    async fn state(&self, session: PlaybackSessionId) -> Result<PlaybackState> {
        let length = *self.clip_length.lock();
        self.with_session(session, |s| {
            if s.state == PlaybackState::Playing {
                if let Some(length) = length {
                    if s.position() >= length {
                        s.accumulated = length;
                        s.resumed_at = None;
                        s.state = PlaybackState::Completed;
                    }
                }
            }
            s.state.clone()
        })
    }

    async fn unload(&self, session: PlaybackSessionId) -> Result<()> {
        self.inner
            .lock()
            .sessions
            .remove(&session)
            .map(|_| ())
            .ok_or_else(|| BridgeError::UnknownSession(session.to_string()))
    }
}
