use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};

use crate::Clock;
use crate::Stopwatch;
use crate::stopwatch::StopwatchInner;

/// One measurement interval, returned by [`Stopwatch::start()`].
///
/// The split only holds a weak reference to its stopwatch, so it neither keeps the stopwatch
/// alive nor blocks the registry from destroying it. A split may be stopped from another
/// thread than the one that started it. Only the first [`stop()`][Self::stop] counts.
#[derive(Debug)]
pub struct Split {
    stopwatch: Option<Weak<StopwatchInner>>,
    clock: Arc<dyn Clock>,
    start: i64,
    enabled: bool,
    running: AtomicBool,
    total: AtomicI64,
}

impl Split {
    pub(crate) fn running(stopwatch: Weak<StopwatchInner>, clock: Arc<dyn Clock>) -> Self {
        let start = clock.nanos();

        Self {
            stopwatch: Some(stopwatch),
            clock,
            start,
            enabled: true,
            running: AtomicBool::new(true),
            total: AtomicI64::new(0),
        }
    }

    /// The split handed out by a disabled stopwatch. Never running, always zero.
    pub(crate) fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self {
            stopwatch: None,
            clock,
            start: 0,
            enabled: false,
            running: AtomicBool::new(false),
            total: AtomicI64::new(0),
        }
    }

    /// Starts a split that belongs to no stopwatch.
    ///
    /// Its measured time can later be recorded with [`Stopwatch::add_split_of()`], for
    /// example once it is known which stopwatch the work should be attributed to.
    #[must_use]
    pub fn detached(clock: Arc<dyn Clock>) -> Self {
        let start = clock.nanos();

        Self {
            stopwatch: None,
            clock,
            start,
            enabled: true,
            running: AtomicBool::new(true),
            total: AtomicI64::new(0),
        }
    }

    /// Stops the split and records it into its stopwatch.
    ///
    /// Returns the measured nanoseconds. Returns `0` if the split was already stopped or
    /// came from a disabled stopwatch. If the stopwatch no longer exists, the time is still
    /// measured and returned but recorded nowhere.
    pub fn stop(&self) -> i64 {
        if !self.running.swap(false, Ordering::AcqRel) {
            return 0;
        }

        let split_nanos = self.elapsed();
        self.total.store(split_nanos, Ordering::Release);

        if let Some(inner) = self.stopwatch.as_ref().and_then(Weak::upgrade) {
            Stopwatch::from_inner(inner).record_stop(self, split_nanos);
        }

        split_nanos
    }

    /// Nanoseconds measured so far, or the final duration once stopped.
    #[must_use]
    pub fn running_for(&self) -> i64 {
        if self.running.load(Ordering::Acquire) {
            self.elapsed()
        } else {
            self.total.load(Ordering::Acquire)
        }
    }

    /// Whether the split is still being measured.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether the split measures anything, `false` if it came from a disabled stopwatch.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Monotonic nanos at which the split started.
    #[must_use]
    pub fn start_nanos(&self) -> i64 {
        self.start
    }

    /// The stopwatch the split belongs to, if any and if it still exists.
    #[must_use]
    pub fn stopwatch(&self) -> Option<Stopwatch> {
        self.stopwatch
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Stopwatch::from_inner)
    }

    fn elapsed(&self) -> i64 {
        self.clock.nanos().saturating_sub(self.start).max(0)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;
    use std::time::Duration;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{ManualClock, Registry};

    assert_impl_all!(Split: Send, Sync);

    fn registry(clock: &ManualClock) -> Registry {
        Registry::builder().clock(Arc::new(clock.clone())).build()
    }

    #[test]
    fn second_stop_is_noop() {
        let clock = ManualClock::new();
        let stopwatch = registry(&clock).stopwatch("sw").unwrap();

        let split = stopwatch.start();
        clock.advance(Duration::from_nanos(40));

        assert_eq!(split.stop(), 40);
        clock.advance(Duration::from_nanos(40));
        assert_eq!(split.stop(), 0);

        assert_eq!(stopwatch.counter(), 1);
        assert_eq!(split.running_for(), 40);
        assert!(!split.is_running());
    }

    #[test]
    fn running_for_tracks_clock() {
        let clock = ManualClock::new();
        let split = Split::detached(Arc::new(clock.clone()));

        clock.advance(Duration::from_nanos(10));
        assert_eq!(split.running_for(), 10);
        clock.advance(Duration::from_nanos(5));
        assert_eq!(split.running_for(), 15);
        assert!(split.is_running());
        assert!(split.stopwatch().is_none());
    }

    #[test]
    fn start_nanos_is_clock_at_start() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_nanos(1_234));
        let stopwatch = registry(&clock).stopwatch("sw").unwrap();

        let split = stopwatch.start();
        clock.advance(Duration::from_nanos(66));
        split.stop();

        assert_eq!(split.start_nanos(), 1_234);
        assert_eq!(
            split.start_nanos().wrapping_add(split.running_for()),
            clock.nanos()
        );
    }

    #[test]
    fn stop_from_another_thread() {
        let clock = ManualClock::new();
        let stopwatch = registry(&clock).stopwatch("sw").unwrap();
        let split = stopwatch.start();

        assert!(split.stopwatch().is_some_and(|owner| owner.ptr_eq(&stopwatch)));

        thread::spawn(move || split.stop()).join().unwrap();

        assert_eq!(stopwatch.counter(), 1);
        assert_eq!(stopwatch.active(), 0);
    }

    #[test]
    fn split_outliving_stopwatch_still_measures() {
        let clock = ManualClock::new();
        let split = {
            let registry = registry(&clock);
            let stopwatch = registry.stopwatch("sw").unwrap();
            stopwatch.start()
        };

        clock.advance(Duration::from_nanos(7));

        assert!(split.stopwatch().is_none());
        assert_eq!(split.stop(), 7);
    }
}
