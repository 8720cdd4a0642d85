use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of time for all Simons of a [`Registry`][crate::Registry].
///
/// Two timelines are exposed:
///
/// * [`nanos()`][Clock::nanos] is a monotonic nanosecond reading used to measure split
///   durations. Only differences between readings are meaningful.
/// * [`millis()`][Clock::millis] is wall-clock time in milliseconds since the Unix epoch,
///   used for usage timestamps, reset timestamps and incremental sampling ages.
///
/// The default is [`SystemClock`]. Tests substitute [`ManualClock`] to control time.
pub trait Clock: Debug + Send + Sync + 'static {
    /// Monotonic time in nanoseconds since an arbitrary fixed origin.
    fn nanos(&self) -> i64;

    /// Wall-clock time in milliseconds since the Unix epoch.
    fn millis(&self) -> i64;
}

/// The real clock, backed by [`Instant`] and [`SystemTime`].
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose monotonic origin is the moment of creation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[cfg_attr(test, mutants::skip)] // Real time, cannot assert exact values.
    fn nanos(&self) -> i64 {
        duration_to_i64_nanos(self.origin.elapsed())
    }

    #[cfg_attr(test, mutants::skip)] // Real time, cannot assert exact values.
    fn millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since_epoch| {
                i64::try_from(since_epoch.as_millis()).unwrap_or(i64::MAX)
            })
    }
}

fn duration_to_i64_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

#[derive(Debug, Default)]
struct ManualClockState {
    nanos: i64,
    millis: i64,
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hand one clone to a
/// [`Registry`][crate::Registry] and keep another to advance time from the outside.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use simons::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
///
/// handle.advance(Duration::from_millis(5));
///
/// assert_eq!(clock.nanos(), 5_000_000);
/// assert_eq!(clock.millis(), 5);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualClockState>>,
}

impl ManualClock {
    /// Creates a clock with both timelines at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves both timelines forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();

        state.nanos = state
            .nanos
            .saturating_add(duration_to_i64_nanos(duration));
        state.millis = state
            .millis
            .saturating_add(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
    }

    /// Sets the monotonic timeline to an absolute value.
    pub fn set_nanos(&self, nanos: i64) {
        self.state.lock().nanos = nanos;
    }

    /// Sets the wall-clock timeline to an absolute value.
    pub fn set_millis(&self, millis: i64) {
        self.state.lock().millis = millis;
    }
}

impl Clock for ManualClock {
    fn nanos(&self) -> i64 {
        self.state.lock().nanos
    }

    fn millis(&self) -> i64 {
        self.state.lock().millis
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use mockall::mock;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(SystemClock: Clock, Send, Sync);
    assert_impl_all!(ManualClock: Clock, Send, Sync, Clone);

    mock! {
        #[derive(Debug)]
        pub Clock {
        }

        impl Clock for Clock {
            fn nanos(&self) -> i64;
            fn millis(&self) -> i64;
        }
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();

        other.set_nanos(123);
        other.set_millis(456);

        assert_eq!(clock.nanos(), 123);
        assert_eq!(clock.millis(), 456);
    }

    #[test]
    fn manual_clock_advance_moves_both_timelines() {
        let clock = ManualClock::new();
        clock.set_millis(1_000);

        clock.advance(Duration::from_micros(2_500));

        assert_eq!(clock.nanos(), 2_500_000);
        assert_eq!(clock.millis(), 1_002);
    }

    #[test]
    fn manual_clock_advance_saturates() {
        let clock = ManualClock::new();
        clock.set_nanos(i64::MAX - 1);

        clock.advance(Duration::from_secs(1));

        assert_eq!(clock.nanos(), i64::MAX);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();

        let first = clock.nanos();
        let second = clock.nanos();

        assert!(second >= first);
        assert!(clock.millis() > 0);
    }

    #[test]
    fn mock_clock_is_usable_as_dyn_clock() {
        let mut mock = MockClock::new();
        mock.expect_nanos().return_const(42_i64);
        mock.expect_millis().return_const(7_i64);

        let clock: Arc<dyn Clock> = Arc::new(mock);

        assert_eq!(clock.nanos(), 42);
        assert_eq!(clock.millis(), 7);
    }
}
