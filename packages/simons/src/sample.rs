use std::fmt::{self, Display};

use crate::{OnlineStats, SimonKind, present_min_max, present_nanos};

/// Immutable snapshot of a [`Counter`][crate::Counter].
///
/// All fields are copied under one lock, so they are consistent with each other.
#[derive(Clone, Debug, PartialEq)]
pub struct CounterSample {
    pub(crate) name: Option<String>,
    pub(crate) note: Option<String>,
    pub(crate) first_usage: i64,
    pub(crate) last_usage: i64,
    pub(crate) last_reset: i64,
    pub(crate) value: i64,
    pub(crate) min: i64,
    pub(crate) min_timestamp: i64,
    pub(crate) max: i64,
    pub(crate) max_timestamp: i64,
    pub(crate) increment_sum: i64,
    pub(crate) decrement_sum: i64,
}

impl CounterSample {
    /// Name of the sampled counter, `None` for an anonymous counter.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Note attached to the counter when the sample was taken.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Wall-clock millis of the first recorded usage, `0` if never used.
    #[must_use]
    pub fn first_usage(&self) -> i64 {
        self.first_usage
    }

    /// Wall-clock millis of the most recent usage, `0` if never used.
    #[must_use]
    pub fn last_usage(&self) -> i64 {
        self.last_usage
    }

    /// Wall-clock millis of the most recent reset, `0` if never reset.
    #[must_use]
    pub fn last_reset(&self) -> i64 {
        self.last_reset
    }

    /// Current value of the counter.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Lowest value seen, `i64::MAX` if the counter has never been decreased or set.
    #[must_use]
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Wall-clock millis at which [`min()`][Self::min] was last reached.
    #[must_use]
    pub fn min_timestamp(&self) -> i64 {
        self.min_timestamp
    }

    /// Highest value seen, `i64::MIN` if the counter has never been increased or set.
    #[must_use]
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Wall-clock millis at which [`max()`][Self::max] was last reached.
    #[must_use]
    pub fn max_timestamp(&self) -> i64 {
        self.max_timestamp
    }

    /// Sum of all increments.
    #[must_use]
    pub fn increment_sum(&self) -> i64 {
        self.increment_sum
    }

    /// Sum of all decrements.
    #[must_use]
    pub fn decrement_sum(&self) -> i64 {
        self.decrement_sum
    }
}

impl Display for CounterSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Counter sample '{}': value={}, {}, inc={}, dec={}",
            self.name.as_deref().unwrap_or("<anonymous>"),
            self.value,
            present_min_max(self.min, self.max),
            self.increment_sum,
            self.decrement_sum
        )
    }
}

/// Immutable snapshot of a [`Stopwatch`][crate::Stopwatch].
///
/// All time values are in nanoseconds, all timestamps in wall-clock millis.
#[derive(Clone, Debug, PartialEq)]
pub struct StopwatchSample {
    pub(crate) name: Option<String>,
    pub(crate) note: Option<String>,
    pub(crate) first_usage: i64,
    pub(crate) last_usage: i64,
    pub(crate) last_reset: i64,
    pub(crate) total: i64,
    pub(crate) counter: i64,
    pub(crate) min: i64,
    pub(crate) min_timestamp: i64,
    pub(crate) max: i64,
    pub(crate) max_timestamp: i64,
    pub(crate) active: i64,
    pub(crate) max_active: i64,
    pub(crate) max_active_timestamp: i64,
    pub(crate) last: i64,
    pub(crate) stats: Option<OnlineStats>,
}

impl StopwatchSample {
    /// Name of the sampled stopwatch, `None` for an anonymous stopwatch.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Note attached to the stopwatch when the sample was taken.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Wall-clock millis of the first recorded usage, `0` if never used.
    #[must_use]
    pub fn first_usage(&self) -> i64 {
        self.first_usage
    }

    /// Wall-clock millis of the most recent usage, `0` if never used.
    #[must_use]
    pub fn last_usage(&self) -> i64 {
        self.last_usage
    }

    /// Wall-clock millis of the most recent reset, `0` if never reset.
    #[must_use]
    pub fn last_reset(&self) -> i64 {
        self.last_reset
    }

    /// Sum of all splits.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Number of splits.
    #[must_use]
    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Shortest split, `i64::MAX` if there were none.
    #[must_use]
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Wall-clock millis at which the shortest split was recorded.
    #[must_use]
    pub fn min_timestamp(&self) -> i64 {
        self.min_timestamp
    }

    /// Longest split, `0` if there were none.
    #[must_use]
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Wall-clock millis at which the longest split was recorded.
    #[must_use]
    pub fn max_timestamp(&self) -> i64 {
        self.max_timestamp
    }

    /// Splits that were running when the sample was taken.
    #[must_use]
    pub fn active(&self) -> i64 {
        self.active
    }

    /// Peak number of concurrently running splits.
    #[must_use]
    pub fn max_active(&self) -> i64 {
        self.max_active
    }

    /// Wall-clock millis at which [`max_active()`][Self::max_active] was last reached.
    #[must_use]
    pub fn max_active_timestamp(&self) -> i64 {
        self.max_active_timestamp
    }

    /// Most recent split.
    #[must_use]
    pub fn last(&self) -> i64 {
        self.last
    }

    /// Streaming statistics of the splits, if the stopwatch collects them.
    #[must_use]
    pub fn stats(&self) -> Option<&OnlineStats> {
        self.stats.as_ref()
    }

    /// Mean split duration, `0.0` without online statistics or splits.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.stats.map_or(0.0, |stats| stats.mean())
    }

    /// Sample variance of split durations, `0.0` without online statistics.
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.stats.map_or(0.0, |stats| stats.variance())
    }

    /// Standard deviation of split durations, `0.0` without online statistics.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.stats.map_or(0.0, |stats| stats.std_dev())
    }
}

impl Display for StopwatchSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stopwatch sample '{}': total {}, counter {}, min {}, max {}, active {} (max {})",
            self.name.as_deref().unwrap_or("<anonymous>"),
            present_nanos(self.total),
            self.counter,
            present_nanos(self.min),
            present_nanos(self.max),
            self.active,
            self.max_active
        )
    }
}

/// Snapshot of a placeholder Simon, which only carries the common attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct UnknownSample {
    pub(crate) name: String,
    pub(crate) note: Option<String>,
    pub(crate) first_usage: i64,
    pub(crate) last_usage: i64,
    pub(crate) last_reset: i64,
}

impl UnknownSample {
    /// Name of the sampled placeholder (the root has the empty name).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Note attached to the placeholder.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Wall-clock millis of the first recorded usage, `0` if never used.
    #[must_use]
    pub fn first_usage(&self) -> i64 {
        self.first_usage
    }

    /// Wall-clock millis of the most recent usage, `0` if never used.
    #[must_use]
    pub fn last_usage(&self) -> i64 {
        self.last_usage
    }

    /// Wall-clock millis of the most recent reset, `0` if never reset.
    #[must_use]
    pub fn last_reset(&self) -> i64 {
        self.last_reset
    }
}

/// Snapshot of any kind of Simon, as returned by [`SimonHandle::sample()`][crate::SimonHandle::sample].
#[derive(Clone, Debug, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "one variant per SimonKind, which is itself exhaustive"
)]
pub enum Sample {
    /// Snapshot of a counter.
    Counter(CounterSample),

    /// Snapshot of a stopwatch.
    Stopwatch(StopwatchSample),

    /// Snapshot of a placeholder.
    Unknown(UnknownSample),
}

impl Sample {
    /// Kind of the Simon the sample was taken from.
    #[must_use]
    pub fn kind(&self) -> SimonKind {
        match self {
            Self::Counter(_) => SimonKind::Counter,
            Self::Stopwatch(_) => SimonKind::Stopwatch,
            Self::Unknown(_) => SimonKind::Unknown,
        }
    }

    /// The counter sample, if this is one.
    #[must_use]
    pub fn as_counter(&self) -> Option<&CounterSample> {
        match self {
            Self::Counter(sample) => Some(sample),
            _ => None,
        }
    }

    /// The stopwatch sample, if this is one.
    #[must_use]
    pub fn as_stopwatch(&self) -> Option<&StopwatchSample> {
        match self {
            Self::Stopwatch(sample) => Some(sample),
            _ => None,
        }
    }
}

impl Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter(sample) => sample.fmt(f),
            Self::Stopwatch(sample) => sample.fmt(f),
            Self::Unknown(sample) => write!(f, "Unknown sample '{}'", sample.name),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(CounterSample: Send, Sync, Clone);
    assert_impl_all!(StopwatchSample: Send, Sync, Clone);
    assert_impl_all!(Sample: Send, Sync, Clone);

    fn stopwatch_sample(total: i64, counter: i64) -> StopwatchSample {
        StopwatchSample {
            name: Some("sw".to_string()),
            note: None,
            first_usage: 1,
            last_usage: 2,
            last_reset: 0,
            total,
            counter,
            min: 10,
            min_timestamp: 1,
            max: 30,
            max_timestamp: 2,
            active: 1,
            max_active: 2,
            max_active_timestamp: 1,
            last: 30,
            stats: None,
        }
    }

    #[test]
    fn sample_enum_exposes_kind() {
        let sample = Sample::Stopwatch(stopwatch_sample(1, 1));

        assert_eq!(sample.kind(), SimonKind::Stopwatch);
        assert!(sample.as_counter().is_none());
        assert_eq!(sample.as_stopwatch().map(StopwatchSample::total), Some(1));
    }

    #[test]
    fn display_mentions_name() {
        let sample = stopwatch_sample(1_500, 1);

        let text = sample.to_string();

        assert!(text.contains("'sw'"));
        assert!(text.contains("1.50 us"));
    }
}
