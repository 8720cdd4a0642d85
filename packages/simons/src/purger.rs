use std::mem;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::{PurgerStateError, Registry, Result};

static NEXT_PURGER_INDEX: AtomicU64 = AtomicU64::new(0);

/// Background thread that periodically forgets stale incremental sampling keys.
///
/// Every period, the purger removes from every Simon of its registry the incremental
/// sampling keys ([`Counter::sample_increment()`][crate::Counter::sample_increment],
/// [`Stopwatch::sample_increment()`][crate::Stopwatch::sample_increment]) that were not used
/// for longer than one period. Keep the period well above the interval at which the keys
/// are sampled.
///
/// A purger can be started once and cancelled once. Dropping a running purger stops its
/// thread without waiting for it.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use simons::{Purger, Registry};
///
/// let registry = Registry::new();
/// let purger = Purger::new(&registry);
///
/// purger.start(Duration::from_secs(60)).unwrap();
/// purger.cancel().unwrap();
/// ```
#[derive(Debug)]
pub struct Purger {
    registry: Registry,
    state: Mutex<PurgerState>,
}

#[derive(Debug)]
enum PurgerState {
    Idle,
    Running {
        cancel: oneshot::Sender<()>,
        thread: JoinHandle<()>,
    },
    Cancelled,
}

impl Purger {
    /// Creates a purger for `registry`. Nothing runs until [`start()`][Self::start].
    #[must_use]
    pub fn new(registry: &Registry) -> Self {
        Self {
            registry: registry.clone(),
            state: Mutex::new(PurgerState::Idle),
        }
    }

    /// Starts the purger thread.
    ///
    /// A zero `period` is raised to one millisecond.
    ///
    /// # Errors
    ///
    /// [`PurgerStateError::AlreadyStarted`] if the purger was started before, even if it has
    /// been cancelled since.
    pub fn start(&self, period: Duration) -> Result<()> {
        let mut state = self.state.lock();

        if !matches!(*state, PurgerState::Idle) {
            return Err(PurgerStateError::AlreadyStarted.into());
        }

        let period = period.max(Duration::from_millis(1));
        let (cancel, cancelled) = oneshot::channel::<()>();
        let task = PurgeTask::new(self.registry.clone(), period);
        let index = NEXT_PURGER_INDEX.fetch_add(1, Ordering::Relaxed);

        let thread = thread::Builder::new()
            .name(format!("simons-purger-{index}"))
            .spawn(move || {
                debug!(index, ?period, "purger thread started");
                purger_loop(&task, &cancelled);
                debug!(index, "purger thread exiting");
            })
            .expect("failed to spawn purger thread: thread spawning failure is not supported");

        *state = PurgerState::Running { cancel, thread };
        Ok(())
    }

    /// Stops the purger thread and waits for it to exit.
    ///
    /// # Errors
    ///
    /// * [`PurgerStateError::NotStarted`] if the purger was never started.
    /// * [`PurgerStateError::AlreadyCancelled`] if the purger was cancelled before.
    pub fn cancel(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();

            match *state {
                PurgerState::Idle => return Err(PurgerStateError::NotStarted.into()),
                PurgerState::Cancelled => return Err(PurgerStateError::AlreadyCancelled.into()),
                PurgerState::Running { .. } => {}
            }

            mem::replace(&mut *state, PurgerState::Cancelled)
        };

        if let PurgerState::Running { cancel, thread } = previous {
            if cancel.send(()).is_err() {
                debug!("purger thread exited before it was cancelled");
            }

            if let Err(payload) = thread.join() {
                // The purge task has no panic paths of its own, so a panic here means a
                // broken Simon. Surface it to the caller.
                panic::resume_unwind(payload);
            }
        }

        Ok(())
    }

    /// Whether the purger thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), PurgerState::Running { .. })
    }
}

impl Drop for Purger {
    fn drop(&mut self) {
        if let PurgerState::Running { cancel, .. } =
            mem::replace(self.state.get_mut(), PurgerState::Cancelled)
        {
            if cancel.send(()).is_err() {
                debug!("purger thread exited before the purger was dropped");
            }
        }
    }
}

fn purger_loop(task: &PurgeTask, cancelled: &oneshot::Receiver<()>) {
    loop {
        match cancelled.recv_timeout(task.period) {
            Err(oneshot::RecvTimeoutError::Timeout) => {
                task.run_one_iteration();
            }
            // Either an explicit cancel or the purger was dropped.
            Ok(()) | Err(oneshot::RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// One purge pass, separated from the thread so it can be driven directly.
#[derive(Debug)]
pub(crate) struct PurgeTask {
    registry: Registry,
    period: Duration,
}

impl PurgeTask {
    pub(crate) fn new(registry: Registry, period: Duration) -> Self {
        Self { registry, period }
    }

    /// Forgets every key last used more than one period ago. Returns how many were forgotten.
    pub(crate) fn run_one_iteration(&self) -> usize {
        let period_millis = i64::try_from(self.period.as_millis()).unwrap_or(i64::MAX);
        let cutoff_millis = self.registry.clock().millis().saturating_sub(period_millis);

        let purged = self.registry.purge_incremental_older_than(cutoff_millis);

        if purged > 0 {
            debug!(purged, cutoff_millis, "purged stale incremental sampling keys");
        }

        purged
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{Error, ManualClock};

    assert_impl_all!(Purger: Send, Sync);

    fn registry(clock: &ManualClock) -> Registry {
        Registry::builder().clock(Arc::new(clock.clone())).build()
    }

    #[test]
    fn iteration_forgets_only_stale_keys() {
        let clock = ManualClock::new();
        let registry = registry(&clock);
        let counter = registry.counter("c").unwrap();
        let stopwatch = registry.stopwatch("s").unwrap();

        clock.set_millis(1_000);
        _ = counter.sample_increment("old");
        _ = stopwatch.sample_increment("old");
        clock.set_millis(5_000);
        _ = counter.sample_increment("fresh");

        let task = PurgeTask::new(registry.clone(), Duration::from_secs(2));
        clock.set_millis(6_000);

        assert_eq!(task.run_one_iteration(), 2);
        assert!(!counter.stop_sampling("old"));
        assert!(!stopwatch.stop_sampling("old"));
        assert!(counter.stop_sampling("fresh"));
    }

    #[test]
    fn key_used_exactly_at_cutoff_survives() {
        let clock = ManualClock::new();
        let registry = registry(&clock);
        let counter = registry.counter("c").unwrap();

        clock.set_millis(4_000);
        _ = counter.sample_increment("edge");
        clock.set_millis(6_000);

        let task = PurgeTask::new(registry, Duration::from_secs(2));

        assert_eq!(task.run_one_iteration(), 0);
        assert!(counter.stop_sampling("edge"));
    }

    #[test]
    fn cancel_before_start_fails() {
        let purger = Purger::new(&Registry::new());

        assert!(matches!(
            purger.cancel(),
            Err(Error::Purger(PurgerStateError::NotStarted))
        ));
    }

    #[test]
    fn lifecycle_is_one_way() {
        let purger = Purger::new(&Registry::new());

        purger.start(Duration::from_secs(3_600)).unwrap();
        assert!(purger.is_running());
        assert!(matches!(
            purger.start(Duration::from_secs(1)),
            Err(Error::Purger(PurgerStateError::AlreadyStarted))
        ));

        purger.cancel().unwrap();
        assert!(!purger.is_running());
        assert!(matches!(
            purger.cancel(),
            Err(Error::Purger(PurgerStateError::AlreadyCancelled))
        ));
        assert!(matches!(
            purger.start(Duration::from_secs(1)),
            Err(Error::Purger(PurgerStateError::AlreadyStarted))
        ));
    }

    #[test]
    fn dropping_running_purger_does_not_hang() {
        let purger = Purger::new(&Registry::new());
        purger.start(Duration::from_secs(3_600)).unwrap();

        drop(purger);
    }
}
