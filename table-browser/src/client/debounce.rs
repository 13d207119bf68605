//! Cancellable delayed tasks
//!
//! Scheduling replaces whatever was pending: the previous task is aborted
//! before the new timer starts, so at most one scheduled task is alive.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default quiet period after the last filter keystroke
pub const DEFAULT_FILTER_DEBOUNCE: Duration = Duration::from_millis(300);

/// Runs only the most recently scheduled task, after a fixed delay
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    /// Abort any pending task and schedule `task` to run after the delay
    ///
    /// The task receives the generation it was scheduled under; pass it back
    /// to [`Debouncer::finish`] to find out whether it is still the current one.
    pub fn schedule<F, Fut>(&mut self, task: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task(generation).await;
        }));

        generation
    }

    /// Abort the pending task, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Mark `generation` as fired
    ///
    /// Returns false if that task was cancelled or superseded after it had
    /// already started, in which case its effect must be ignored.
    pub fn finish(&mut self, generation: u64) -> bool {
        if self.pending.is_none() || generation != self.generation {
            return false;
        }
        self.pending = None;
        true
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
