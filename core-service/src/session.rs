//! Observable session state
//!
//! A [`Session`] is a snapshot: the controller hands out clones and pushes a
//! fresh one to watchers after every change.

use chrono::{DateTime, Utc};
use core_catalog::{ItemKey, SoundItem};
use core_playback::{VoiceSnapshot, VoiceState, Volume};

/// A user-visible message about a recovered failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// What the user last typed, fired or not
    pub search_term: String,
    /// Term that produced `items`
    pub active_term: String,
    /// 1-based
    pub page: u32,
    /// Zero when nothing matched or nothing could be fetched
    pub page_count: u32,
    pub total: u64,
    pub items: Vec<SoundItem>,
    pub global_volume: Volume,
    pub voice: Option<VoiceSnapshot>,
    /// A fetch is in flight
    pub loading: bool,
    pub last_error: Option<Notice>,
}

impl Session {
    pub(crate) fn new(global_volume: Volume) -> Self {
        Self {
            search_term: String::new(),
            active_term: String::new(),
            page: 1,
            page_count: 0,
            total: 0,
            items: Vec::new(),
            global_volume,
            voice: None,
            loading: false,
            last_error: None,
        }
    }

    pub fn item(&self, key: &ItemKey) -> Option<&SoundItem> {
        self.items.iter().find(|item| item.identity() == *key)
    }

    /// Voice state as seen by the card for `key`.
    pub fn voice_state_of(&self, key: &ItemKey) -> VoiceState {
        match &self.voice {
            Some(voice) if voice.key() == *key => voice.state,
            _ => VoiceState::Idle,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.page_count
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }
}
