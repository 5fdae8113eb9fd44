//! Time-related operations.
//!
//! Thin re-exports of `tokio::time` so that timer-driven code (debouncers,
//! progress tickers) stays executor-agnostic at the call site. Tests that
//! pause the tokio clock drive every timer in this module deterministically.

pub use tokio::time::{
    interval, sleep, sleep_until, timeout, Instant, Interval, MissedTickBehavior, Sleep,
};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current time as milliseconds since UNIX_EPOCH.
///
/// Falls back to `0` if the system clock reports a time before the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
