use std::fmt::{self, Display};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::incremental::IncrementalSampler;
use crate::simon::{SimonCommon, common_accessors};
use crate::{OnlineStats, Split, StopwatchSample, present_nanos};

#[derive(Debug)]
pub(crate) struct StopwatchInner {
    common: SimonCommon,
    data: Mutex<StopwatchData>,
}

#[derive(Debug)]
struct StopwatchData {
    tally: StopwatchTally,
    active: i64,
    last_reset: i64,
    sampler: IncrementalSampler<StopwatchTally>,
}

impl StopwatchData {
    fn new(online_stats: bool) -> Self {
        Self {
            tally: StopwatchTally::new(online_stats, 0),
            active: 0,
            last_reset: 0,
            sampler: IncrementalSampler::new(),
        }
    }

    fn start(&mut self, now: i64) {
        self.active = self.active.wrapping_add(1);
        let active = self.active;

        self.tally.start(active, now);
        self.sampler.record(|window| window.start(active, now));
    }

    fn add_split(&mut self, split_nanos: i64, now: i64) {
        self.tally.add_split(split_nanos, now);
        self.sampler.record(|window| window.add_split(split_nanos, now));
    }

    /// An empty tally of the same shape, as the next window of an incremental sampling key.
    fn fresh_window(&self) -> StopwatchTally {
        StopwatchTally::new(self.tally.stats.is_some(), self.active)
    }

    fn reset(&mut self, now: i64) {
        // Running splits do not know about the reset and will still stop.
        self.tally = StopwatchTally {
            first_usage: self.tally.first_usage,
            last_usage: self.tally.last_usage,
            ..self.fresh_window()
        };
        self.last_reset = now;
    }

    fn sample(&self, common: &SimonCommon) -> StopwatchSample {
        self.tally.sample(common, self.active, self.last_reset)
    }
}

/// The split statistics of a stopwatch.
///
/// Used both for the cumulative state and for the window of each incremental sampling key.
/// The number of running splits is a level shared by all of them and lives outside.
#[derive(Debug)]
struct StopwatchTally {
    total: i64,
    counter: i64,
    max_active: i64,
    max_active_timestamp: i64,
    min: i64,
    min_timestamp: i64,
    max: i64,
    max_timestamp: i64,
    last: i64,
    first_usage: i64,
    last_usage: i64,
    stats: Option<OnlineStats>,
}

impl StopwatchTally {
    fn new(online_stats: bool, active: i64) -> Self {
        Self {
            total: 0,
            counter: 0,
            max_active: active,
            max_active_timestamp: 0,
            min: i64::MAX,
            min_timestamp: 0,
            max: 0,
            max_timestamp: 0,
            last: 0,
            first_usage: 0,
            last_usage: 0,
            stats: online_stats.then(OnlineStats::new),
        }
    }

    fn touch(&mut self, now: i64) {
        if self.first_usage == 0 {
            self.first_usage = now;
        }

        self.last_usage = now;
    }

    fn start(&mut self, active: i64, now: i64) {
        self.touch(now);

        if active >= self.max_active {
            self.max_active = active;
            self.max_active_timestamp = now;
        }
    }

    fn add_split(&mut self, split_nanos: i64, now: i64) {
        self.touch(now);

        self.total = self.total.wrapping_add(split_nanos);
        self.counter = self.counter.wrapping_add(1);
        self.last = split_nanos;

        // Strict, so the first occurrence of an extreme keeps its timestamp.
        if split_nanos > self.max {
            self.max = split_nanos;
            self.max_timestamp = now;
        }

        if split_nanos < self.min {
            self.min = split_nanos;
            self.min_timestamp = now;
        }

        if let Some(stats) = self.stats.as_mut() {
            stats.process(split_nanos);
        }
    }

    fn sample(&self, common: &SimonCommon, active: i64, last_reset: i64) -> StopwatchSample {
        StopwatchSample {
            name: common.name().map(str::to_string),
            note: common.note(),
            first_usage: self.first_usage,
            last_usage: self.last_usage,
            last_reset,
            total: self.total,
            counter: self.counter,
            min: self.min,
            min_timestamp: self.min_timestamp,
            max: self.max,
            max_timestamp: self.max_timestamp,
            active,
            max_active: self.max_active,
            max_active_timestamp: self.max_active_timestamp,
            last: self.last,
            stats: self.stats,
        }
    }
}

/// Accumulates elapsed-time splits, with extremes and concurrency statistics.
///
/// Splits are measured by [`start()`][Self::start] and [`Split::stop()`], which may happen
/// on different threads, or recorded directly with [`add_split()`][Self::add_split]. Any
/// number of threads may use the same stopwatch at the same time.
///
/// A split that is started but never stopped stays counted in [`active()`][Self::active]
/// forever. Dropping a [`Split`] does not stop it.
///
/// # Example
///
/// ```
/// use simons::Registry;
///
/// let registry = Registry::new();
/// let query = registry.stopwatch("app.db.query").unwrap();
///
/// let split = query.start();
/// // ... the measured work ...
/// let elapsed = split.stop();
///
/// let sample = query.sample();
/// assert_eq!(sample.counter(), 1);
/// assert_eq!(sample.total(), elapsed);
/// assert_eq!(sample.active(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct Stopwatch {
    inner: Arc<StopwatchInner>,
}

impl Stopwatch {
    pub(crate) fn new(common: SimonCommon, online_stats: bool) -> Self {
        Self {
            inner: Arc::new(StopwatchInner {
                common,
                data: Mutex::new(StopwatchData::new(online_stats)),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<StopwatchInner>) -> Self {
        Self { inner }
    }

    common_accessors!();

    /// Starts measuring a split.
    ///
    /// On a disabled stopwatch this returns a split that records nothing and whose
    /// [`stop()`][Split::stop] returns `0`.
    #[must_use = "a split that is never stopped stays active forever"]
    pub fn start(&self) -> Split {
        let common = &self.inner.common;

        if !common.is_enabled() {
            return Split::disabled(Arc::clone(&common.context().clock));
        }

        let now = common.millis();

        self.inner.data.lock().start(now);

        let split = Split::running(
            Arc::downgrade(&self.inner),
            Arc::clone(&common.context().clock),
        );

        if !common.callbacks().is_empty() {
            common
                .callbacks()
                .dispatch(|callback| callback.on_stopwatch_start(&split));
        }

        split
    }

    /// Records a split measured elsewhere. Ignored while disabled.
    pub fn add_split(&self, split_nanos: i64) {
        let common = &self.inner.common;

        if !common.is_enabled() {
            return;
        }

        let now = common.millis();
        let notify_sample = {
            let mut data = self.inner.data.lock();
            data.add_split(split_nanos, now);

            (!common.callbacks().is_empty()).then(|| data.sample(common))
        };

        if let Some(sample) = notify_sample {
            common
                .callbacks()
                .dispatch(|callback| callback.on_stopwatch_add(self, split_nanos, &sample));
        }
    }

    /// Records the time measured by `split` so far, typically a
    /// [detached][Split::detached] one.
    pub fn add_split_of(&self, split: &Split) {
        self.add_split(split.running_for());
    }

    /// Completes a split started on this stopwatch.
    ///
    /// Runs regardless of the current enabled state, the split was already counted as active.
    pub(crate) fn record_stop(&self, split: &Split, split_nanos: i64) {
        let common = &self.inner.common;
        let now = common.millis();

        let notify_sample = {
            let mut data = self.inner.data.lock();
            data.active = data.active.wrapping_sub(1);
            data.add_split(split_nanos, now);

            (!common.callbacks().is_empty()).then(|| data.sample(common))
        };

        if let Some(sample) = notify_sample {
            common
                .callbacks()
                .dispatch(|callback| callback.on_stopwatch_stop(split, &sample));
        }
    }

    /// Clears all split statistics.
    ///
    /// [`active()`][Self::active] is kept and becomes the new peak, as running splits will
    /// still stop later.
    pub fn reset(&self) {
        let now = self.inner.common.millis();
        self.inner.data.lock().reset(now);
    }

    /// Consistent snapshot of all fields.
    #[must_use]
    pub fn sample(&self) -> StopwatchSample {
        self.inner.data.lock().sample(&self.inner.common)
    }

    /// Takes a snapshot and resets the stopwatch under one lock.
    #[must_use]
    pub fn sample_and_reset(&self) -> StopwatchSample {
        let now = self.inner.common.millis();
        let mut data = self.inner.data.lock();

        let sample = data.sample(&self.inner.common);
        data.reset(now);

        sample
    }

    /// What changed since the previous call with the same `key`.
    ///
    /// The first call for a key returns the full cumulative sample and becomes the baseline.
    /// Later calls describe only the splits since the previous call, including their extremes,
    /// online statistics and usage timestamps. Without splits in between, the result is an
    /// empty sample. [`active()`][StopwatchSample::active] is always the current level.
    /// Resetting the stopwatch does not affect the increments.
    #[must_use]
    pub fn sample_increment(&self, key: &str) -> StopwatchSample {
        let now = self.inner.common.millis();
        let mut data = self.inner.data.lock();
        let fresh = data.fresh_window();

        match data.sampler.take_window(key, fresh, now) {
            Some(window) => window.sample(&self.inner.common, data.active, data.last_reset),
            None => data.sample(&self.inner.common),
        }
    }

    /// Forgets the incremental baseline of `key`. Returns whether the key was known.
    pub fn stop_sampling(&self, key: &str) -> bool {
        self.inner.data.lock().sampler.stop_sampling(key)
    }

    pub(crate) fn purge_incremental_older_than(&self, cutoff_millis: i64) -> usize {
        self.inner.data.lock().sampler.purge_older_than(cutoff_millis)
    }

    /// Sum of all splits in nanoseconds.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.inner.data.lock().tally.total
    }

    /// Number of splits.
    #[must_use]
    pub fn counter(&self) -> i64 {
        self.inner.data.lock().tally.counter
    }

    /// Splits currently running.
    #[must_use]
    pub fn active(&self) -> i64 {
        self.inner.data.lock().active
    }

    /// Most recent split in nanoseconds.
    #[must_use]
    pub fn last(&self) -> i64 {
        self.inner.data.lock().tally.last
    }

    /// Whether online statistics are collected.
    #[must_use]
    pub fn has_online_stats(&self) -> bool {
        self.inner.data.lock().tally.stats.is_some()
    }

    /// Wall-clock millis of the first recorded usage, `0` if never used.
    #[must_use]
    pub fn first_usage(&self) -> i64 {
        self.inner.data.lock().tally.first_usage
    }

    /// Wall-clock millis of the most recent usage, `0` if never used.
    #[must_use]
    pub fn last_usage(&self) -> i64 {
        self.inner.data.lock().tally.last_usage
    }

    /// Wall-clock millis of the most recent reset, `0` if never reset.
    #[must_use]
    pub fn last_reset(&self) -> i64 {
        self.inner.data.lock().last_reset
    }

    pub(crate) fn common(&self) -> &SimonCommon {
        &self.inner.common
    }

    /// Whether both handles refer to the same underlying stopwatch.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Display for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sample = self.sample();

        write!(
            f,
            "Stopwatch '{}' [{}]: total {}, counter {}, max {}, min {}, mean {}",
            self.inner.common.name().unwrap_or("<anonymous>"),
            self.inner.common.state(),
            present_nanos(sample.total),
            sample.counter,
            present_nanos(sample.max),
            present_nanos(sample.min),
            present_mean(&sample)
        )
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "presentation of a mean that is bounded by the i64 split range"
)]
fn present_mean(sample: &StopwatchSample) -> String {
    match sample.stats {
        Some(stats) if stats.count() > 0 => present_nanos(stats.mean().round() as i64),
        _ => "undef".to_string(),
    }
}
