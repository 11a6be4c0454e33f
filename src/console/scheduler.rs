//! Trailing-edge debounce timer feeding configuration saves.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default debounce window between the last edit and the write.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(600);

#[derive(Default)]
struct TimerState {
    /// Bumped on every arm; identifies the newest timer
    generation: u64,
    /// Token of the timer currently waiting, if any
    pending: Option<CancellationToken>,
}

/// Cancel-and-replace debounce timer.
///
/// Each `arm` cancels the previously pending timer, so a burst of edits
/// collapses into one job run `delay` after the last of them. Cancellation
/// only reaches a timer that is still waiting: a job that has started runs
/// to completion.
pub struct SaveScheduler {
    delay: Duration,
    state: Mutex<TimerState>,
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(SAVE_DEBOUNCE)
    }
}

impl SaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Mutex::new(TimerState::default()),
        }
    }

    fn timer(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// (Re)arm the timer with `job`, replacing any pending one.
    pub fn arm<F, Fut>(self: &Arc<Self>, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let (generation, previous) = {
            let mut timer = self.timer();
            timer.generation += 1;
            (timer.generation, timer.pending.replace(token.clone()))
        };
        if let Some(previous) = previous {
            previous.cancel();
        }

        let delay = self.delay;
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::trace!("Save timer replaced");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            scheduler.fired(generation);
            job().await;
        });
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&self) {
        let pending = self.timer().pending.take();
        if let Some(token) = pending {
            token.cancel();
        }
    }

    /// Whether a timer is currently waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.timer().pending.is_some()
    }

    fn fired(&self, generation: u64) {
        let mut timer = self.timer();
        if timer.generation == generation {
            timer.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_job(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> futures::future::Ready<()> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let scheduler = Arc::new(SaveScheduler::new(Duration::from_millis(600)));
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.arm(counting_job(&fired));
        assert!(scheduler.is_armed());

        tokio::time::sleep(Duration::from_millis(599)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_collapses_bursts() {
        let scheduler = Arc::new(SaveScheduler::new(Duration::from_millis(600)));
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.arm(counting_job(&fired));
        tokio::time::sleep(Duration::from_millis(400)).await;
        scheduler.arm(counting_job(&fired));
        tokio::time::sleep(Duration::from_millis(400)).await;
        // First timer would have fired at 600ms
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let scheduler = Arc::new(SaveScheduler::new(Duration::from_millis(600)));
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.arm(counting_job(&fired));
        scheduler.cancel();
        assert!(!scheduler.is_armed());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
