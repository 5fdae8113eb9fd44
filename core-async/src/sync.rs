//! Synchronization primitives.
//!
//! Async-aware locks and channels come from `tokio::sync`; cancellation
//! tokens come from `tokio-util`. Short, purely synchronous critical sections
//! (state that is never held across an `.await`) use `parking_lot` instead,
//! re-exported here as [`SyncMutex`].
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let child = token.child_token();
//! token.cancel();
//! assert!(child.is_cancelled());
//!
//! let (tx, rx) = watch::channel(0u8);
//! tx.send_replace(7);
//! assert_eq!(*rx.borrow(), 7);
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

pub use tokio_util::sync::CancellationToken;

pub use parking_lot::{Mutex as SyncMutex, MutexGuard as SyncMutexGuard};
