use std::fmt::{self, Display};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::incremental::IncrementalSampler;
use crate::simon::{SimonCommon, common_accessors};
use crate::{Callback, CounterSample, present_min_max};

#[derive(Debug)]
pub(crate) struct CounterInner {
    common: SimonCommon,
    data: Mutex<CounterData>,
}

#[derive(Debug)]
struct CounterData {
    tally: CounterTally,
    last_reset: i64,
    sampler: IncrementalSampler<CounterTally>,
}

impl CounterData {
    fn new() -> Self {
        Self {
            tally: CounterTally::new(),
            last_reset: 0,
            sampler: IncrementalSampler::new(),
        }
    }

    /// Applies a relative change to the counter and to every incremental window.
    fn apply(&mut self, now: i64, change: impl Fn(&mut CounterTally, i64)) {
        self.tally.touch(now);
        change(&mut self.tally, now);

        self.sampler.record(|window| {
            window.touch(now);
            change(window, now);
        });
    }

    /// Sets the value. A window sees the same net movement, not the absolute value.
    fn set(&mut self, value: i64, now: i64) {
        let shift = value.wrapping_sub(self.tally.value);

        self.tally.touch(now);
        self.tally.set_value(value, now);

        self.sampler.record(|window| {
            window.touch(now);
            window.set_value(window.value.wrapping_add(shift), now);
        });
    }

    fn reset(&mut self, now: i64) {
        self.tally.clear();
        self.last_reset = now;
    }

    fn sample(&self, common: &SimonCommon) -> CounterSample {
        self.tally.sample(common, self.last_reset)
    }
}

/// The statistical state of a counter.
///
/// Used both for the cumulative state and for the window of each incremental sampling key.
/// A window's value is the net change within the window.
#[derive(Debug)]
struct CounterTally {
    value: i64,
    min: i64,
    min_timestamp: i64,
    max: i64,
    max_timestamp: i64,
    increment_sum: i64,
    decrement_sum: i64,
    first_usage: i64,
    last_usage: i64,
}

impl CounterTally {
    fn new() -> Self {
        Self {
            value: 0,
            min: i64::MAX,
            min_timestamp: 0,
            max: i64::MIN,
            max_timestamp: 0,
            increment_sum: 0,
            decrement_sum: 0,
            first_usage: 0,
            last_usage: 0,
        }
    }

    fn touch(&mut self, now: i64) {
        if self.first_usage == 0 {
            self.first_usage = now;
        }

        self.last_usage = now;
    }

    fn increase_by(&mut self, delta: i64) {
        self.value = self.value.wrapping_add(delta);
        self.increment_sum = self.increment_sum.wrapping_add(delta);
    }

    fn decrease_by(&mut self, delta: i64) {
        self.value = self.value.wrapping_sub(delta);
        self.decrement_sum = self.decrement_sum.wrapping_add(delta);
    }

    fn set_value(&mut self, value: i64, now: i64) {
        self.value = value;
        self.update_extremes(now);
    }

    // Inclusive, so a repeated extreme moves its timestamp forward.
    fn update_max(&mut self, now: i64) {
        if self.value >= self.max {
            self.max = self.value;
            self.max_timestamp = now;
        }
    }

    fn update_min(&mut self, now: i64) {
        if self.value <= self.min {
            self.min = self.value;
            self.min_timestamp = now;
        }
    }

    fn update_extremes(&mut self, now: i64) {
        self.update_max(now);
        self.update_min(now);
    }

    /// Clears everything except the usage timestamps.
    fn clear(&mut self) {
        *self = Self {
            first_usage: self.first_usage,
            last_usage: self.last_usage,
            ..Self::new()
        };
    }

    fn sample(&self, common: &SimonCommon, last_reset: i64) -> CounterSample {
        CounterSample {
            name: common.name().map(str::to_string),
            note: common.note(),
            first_usage: self.first_usage,
            last_usage: self.last_usage,
            last_reset,
            value: self.value,
            min: self.min,
            min_timestamp: self.min_timestamp,
            max: self.max,
            max_timestamp: self.max_timestamp,
            increment_sum: self.increment_sum,
            decrement_sum: self.decrement_sum,
        }
    }
}

/// Tracks a signed value along with the sums of its increments and decrements and the
/// extremes it has reached.
///
/// While the counter is disabled, every mutating call returns immediately without touching
/// any field.
///
/// # Example
///
/// ```
/// use simons::Registry;
///
/// let registry = Registry::new();
/// let connections = registry.counter("server.connections").unwrap();
///
/// connections.increase();
/// connections.increase();
/// connections.decrease();
///
/// let sample = connections.sample();
/// assert_eq!(sample.value(), 1);
/// assert_eq!(sample.max(), 2);
/// assert_eq!(sample.increment_sum(), 2);
/// assert_eq!(sample.decrement_sum(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

impl Counter {
    pub(crate) fn new(common: SimonCommon) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                common,
                data: Mutex::new(CounterData::new()),
            }),
        }
    }

    common_accessors!();

    /// Increases the value by one.
    ///
    /// Only the maximum can change, the minimum is left alone.
    pub fn increase(&self) {
        self.mutate(
            |data, now| {
                data.apply(now, |tally, now| {
                    tally.increase_by(1);
                    tally.update_max(now);
                });
            },
            |callback, counter, sample| callback.on_counter_increase(counter, 1, sample),
        );
    }

    /// Increases the value by `delta`, which may be negative.
    pub fn increase_by(&self, delta: i64) {
        self.mutate(
            |data, now| {
                data.apply(now, |tally, now| {
                    tally.increase_by(delta);
                    tally.update_extremes(now);
                });
            },
            |callback, counter, sample| callback.on_counter_increase(counter, delta, sample),
        );
    }

    /// Decreases the value by one.
    ///
    /// Only the minimum can change, the maximum is left alone.
    pub fn decrease(&self) {
        self.mutate(
            |data, now| {
                data.apply(now, |tally, now| {
                    tally.decrease_by(1);
                    tally.update_min(now);
                });
            },
            |callback, counter, sample| callback.on_counter_decrease(counter, 1, sample),
        );
    }

    /// Decreases the value by `delta`, which may be negative.
    pub fn decrease_by(&self, delta: i64) {
        self.mutate(
            |data, now| {
                data.apply(now, |tally, now| {
                    tally.decrease_by(delta);
                    tally.update_extremes(now);
                });
            },
            |callback, counter, sample| callback.on_counter_decrease(counter, delta, sample),
        );
    }

    /// Sets the value. The increment and decrement sums are not affected.
    pub fn set(&self, value: i64) {
        self.mutate(
            |data, now| data.set(value, now),
            |callback, counter, sample| callback.on_counter_set(counter, value, sample),
        );
    }

    fn mutate(
        &self,
        change: impl FnOnce(&mut CounterData, i64),
        notify: impl Fn(&dyn Callback, &Self, &CounterSample),
    ) {
        let common = &self.inner.common;

        if !common.is_enabled() {
            return;
        }

        let now = common.millis();
        let notify_sample = {
            let mut data = self.inner.data.lock();
            change(&mut *data, now);

            (!common.callbacks().is_empty()).then(|| data.sample(common))
        };

        if let Some(sample) = notify_sample {
            common
                .callbacks()
                .dispatch(|callback| notify(callback, self, &sample));
        }
    }

    /// Clears the value, the extremes and the sums. Usage timestamps are kept.
    pub fn reset(&self) {
        let now = self.inner.common.millis();
        self.inner.data.lock().reset(now);
    }

    /// Consistent snapshot of all fields.
    #[must_use]
    pub fn sample(&self) -> CounterSample {
        self.inner.data.lock().sample(&self.inner.common)
    }

    /// Takes a snapshot and resets the counter under one lock.
    #[must_use]
    pub fn sample_and_reset(&self) -> CounterSample {
        let now = self.inner.common.millis();
        let mut data = self.inner.data.lock();

        let sample = data.sample(&self.inner.common);
        data.reset(now);

        sample
    }

    /// What changed since the previous call with the same `key`.
    ///
    /// The first call for a key returns the full cumulative sample and becomes the baseline.
    /// Later calls describe only the updates since the previous call: the value is the net
    /// change, the sums and usage timestamps cover those updates and the extremes are those
    /// reached by the net change. Without updates in between, the result is an empty sample.
    /// Resetting the counter does not affect the increments.
    ///
    /// Each key is remembered until [`stop_sampling()`][Self::stop_sampling] is called or a
    /// [`Purger`][crate::Purger] evicts it after a period without calls.
    #[must_use]
    pub fn sample_increment(&self, key: &str) -> CounterSample {
        let now = self.inner.common.millis();
        let mut data = self.inner.data.lock();
        let last_reset = data.last_reset;

        match data.sampler.take_window(key, CounterTally::new(), now) {
            Some(window) => window.sample(&self.inner.common, last_reset),
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

    /// Current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.inner.data.lock().tally.value
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

    /// Whether both handles refer to the same underlying counter.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sample = self.sample();

        write!(
            f,
            "Counter '{}' [{}]: value={}, {}, inc={}, dec={}",
            self.inner.common.name().unwrap_or("<anonymous>"),
            self.inner.common.state(),
            sample.value,
            present_min_max(sample.min, sample.max),
            sample.increment_sum,
            sample.decrement_sum
        )
    }
}
