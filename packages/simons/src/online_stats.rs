/// Streaming mean and variance of stopwatch splits.
///
/// Observations are folded in one at a time with Welford's algorithm, which stays numerically
/// stable even over very long runs. Only three numbers are kept, so attaching this to a
/// stopwatch costs a few floating point operations per split.
///
/// With fewer observations than a statistic needs, that statistic is `0.0` rather than `NaN`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OnlineStats {
    count: i64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Folds one observation into the accumulator.
    #[expect(
        clippy::cast_precision_loss,
        reason = "split durations far below 2^53 ns are exact, larger ones only lose sub-ns precision"
    )]
    pub fn process(&mut self, value: i64) {
        self.count = self.count.saturating_add(1);

        let value = value as f64;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Number of processed observations.
    #[must_use]
    pub const fn count(&self) -> i64 {
        self.count
    }

    /// Arithmetic mean of the processed observations, `0.0` if there are none.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (divides by `n - 1`), `0.0` with fewer than two observations.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "observation counts never approach 2^53"
    )]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }

        self.m2 / (self.count.wrapping_sub(1)) as f64
    }

    /// Population variance (divides by `n`), `0.0` with no observations.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "observation counts never approach 2^53"
    )]
    pub fn population_variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }

        self.m2 / self.count as f64
    }

    /// Standard deviation, the square root of the population variance.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.population_variance().sqrt()
    }
}
