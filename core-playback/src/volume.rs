//! Global volume
//!
//! The session volume is authoritative the moment it is set; the active voice
//! only catches up after a quiet period so that dragging a slider does not
//! flood the audio engine with gain changes.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use core_async::debounce::Debouncer;
use core_async::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::voice::VoiceManager;

/// Volume level on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Volume(u8);

impl Volume {
    pub const MAX: Volume = Volume(100);
    pub const MUTED: Volume = Volume(0);

    /// Clamps anything above 100.
    pub fn new(level: u8) -> Self {
        Self(level.min(100))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Linear gain for the host adapter.
    pub fn gain(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(50)
    }
}

impl From<u8> for Volume {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<Volume> for u8 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Stores the global volume and forwards it to the active voice once the
/// user stops changing it.
pub struct VolumePropagator {
    level: Arc<AtomicU8>,
    debouncer: Debouncer<Volume>,
}

impl VolumePropagator {
    pub fn new(voice: VoiceManager, initial: Volume, quiet_period: Duration) -> Self {
        let debouncer = Debouncer::new(quiet_period, move |volume: Volume| {
            let voice = voice.clone();
            async move {
                if let Err(e) = voice.apply_volume(volume).await {
                    warn!(error = %e, level = volume.level(), "failed to apply volume");
                }
            }
        });

        Self {
            level: Arc::new(AtomicU8::new(initial.level())),
            debouncer,
        }
    }

    /// Store `level` (clamped) and schedule propagation. Returns the stored value.
    pub fn set_volume(&self, level: u8) -> Volume {
        let volume = Volume::new(level);
        self.level.store(volume.level(), Ordering::Release);
        debug!(level = volume.level(), "volume stored");
        self.debouncer.submit(volume);
        volume
    }

    /// The authoritative level, including values not yet propagated.
    pub fn current(&self) -> Volume {
        Volume(self.level.load(Ordering::Acquire))
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Drop the pending propagation. The stored level is kept.
    pub fn cancel(&self) -> bool {
        self.debouncer.cancel()
    }
}

impl fmt::Debug for VolumePropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolumePropagator")
            .field("level", &self.current())
            .field("pending", &self.is_pending())
            .finish()
    }
}
