//! Runtime abstraction layer for the sound library core.
//!
//! Every `core-*` crate reaches the executor through this crate rather than
//! depending on tokio directly. Besides thin re-exports of the tokio
//! primitives, it carries the one timing primitive the session layer is
//! built on: the cancellable [`Debouncer`](debounce::Debouncer).
//!
//! # Modules
//!
//! - `task`: task spawning
//! - `time`: sleep, intervals, timeouts
//! - `sync`: locks, channels, cancellation tokens
//! - `runtime`: handles and `block_on`
//! - `debounce`: quiet-period coalescing of rapid inputs
//!
//! # Examples
//!
//! ```rust
//! use core_async::debounce::Debouncer;
//! use core_async::time::Duration;
//!
//! # async fn example() {
//! let debouncer = Debouncer::new(Duration::from_millis(300), |term: String| async move {
//!     println!("searching for {term}");
//! });
//!
//! debouncer.submit("a".to_string());
//! debouncer.submit("am".to_string()); // replaces the pending "a"
//! # }
//! ```

pub mod debounce;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use debounce::Debouncer;
pub use tokio::select;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
