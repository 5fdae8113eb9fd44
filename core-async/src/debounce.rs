//! Quiet-period debouncing.
//!
//! A [`Debouncer`] coalesces a burst of inputs into a single delayed action.
//! Every [`submit`](Debouncer::submit) restarts the quiet period; only the
//! value from the most recent submission is handed to the action, and only
//! once the quiet period has elapsed without another submission.
//!
//! ```text
//! submit(a) ──┐
//! submit(b) ──┼── quiet period restarts on every submit
//! submit(c) ──┘
//!                 ... delay ...  ──> action(c)
//! ```
//!
//! Pending work is cancelled by a newer submission, by [`cancel`](Debouncer::cancel)
//! or when the debouncer is dropped. An action that has already started is
//! never interrupted.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::task;
use crate::time::{sleep, Duration};

type Action<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Default)]
struct PendingSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Coalesces rapid submissions into one delayed invocation of an async action.
pub struct Debouncer<T> {
    delay: Duration,
    action: Action<T>,
    pending: Arc<Mutex<PendingSlot>>,
}

impl<T> Debouncer<T>
where
    T: Send + 'static,
{
    /// Create a debouncer that runs `action` after `delay` of quiet.
    pub fn new<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let action: Action<T> = Arc::new(move |value| Box::pin(action(value)));
        Self {
            delay,
            action,
            pending: Arc::new(Mutex::new(PendingSlot::default())),
        }
    }

    /// Schedule `value`, replacing any submission that has not fired yet.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, value: T) {
        let token = CancellationToken::new();
        let generation = {
            let mut slot = self.pending.lock();
            if let Some(previous) = slot.token.replace(token.clone()) {
                previous.cancel();
            }
            slot.generation += 1;
            slot.generation
        };

        let pending = Arc::clone(&self.pending);
        let action = Arc::clone(&self.action);
        let delay = self.delay;

        task::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(generation, "debounced submission superseded");
                    return;
                }
                _ = sleep(delay) => {}
            }

            {
                let mut slot = pending.lock();
                if slot.generation != generation || token.is_cancelled() {
                    return;
                }
                slot.token = None;
            }

            trace!(generation, "quiet period elapsed");
            action(value).await;
        });
    }

    /// Discard the pending submission without firing it.
    ///
    /// Returns `true` if something was pending.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().token.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a submission is waiting for its quiet period to elapse.
    pub fn is_pending(&self) -> bool {
        self.pending.lock().token.is_some()
    }

    /// The configured quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(token) = self.pending.lock().token.take() {
            token.cancel();
        }
    }
}

impl<T> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.pending.lock().token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_debouncer(delay_ms: u64) -> (Debouncer<u32>, Arc<Mutex<Vec<u32>>>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), move |value| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(value);
            }
        });
        (debouncer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once_with_last_value() {
        let (debouncer, fired) = recording_debouncer(300);

        debouncer.submit(1);
        sleep(Duration::from_millis(100)).await;
        debouncer.submit(2);
        sleep(Duration::from_millis(100)).await;
        debouncer.submit(3);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(400)).await;

        assert_eq!(*fired.lock(), vec![3]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_period_restarts_on_each_submit() {
        let (debouncer, fired) = recording_debouncer(300);

        debouncer.submit(1);
        sleep(Duration::from_millis(250)).await;
        debouncer.submit(2);
        sleep(Duration::from_millis(250)).await;

        // 500ms after the first submit, but only 250ms after the last one.
        assert!(fired.lock().is_empty());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(*fired.lock(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_submissions_fire_independently() {
        let (debouncer, fired) = recording_debouncer(300);

        debouncer.submit(1);
        sleep(Duration::from_millis(400)).await;
        debouncer.submit(2);
        sleep(Duration::from_millis(400)).await;

        assert_eq!(*fired.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_submission() {
        let (debouncer, fired) = recording_debouncer(300);

        debouncer.submit(7);
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        sleep(Duration::from_millis(600)).await;
        assert!(fired.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_submission() {
        let (debouncer, fired) = recording_debouncer(300);

        debouncer.submit(9);
        drop(debouncer);

        sleep(Duration::from_millis(600)).await;
        assert!(fired.lock().is_empty());
    }
}
