//! Human-readable rendering of measured values.

const UNDEF: &str = "undef";

const NANOS_PER_MICRO: f64 = 1_000.0;
const NANOS_PER_MILLI: f64 = 1_000_000.0;
const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Renders a nanosecond duration with a unit and three significant digits.
///
/// The sentinels `i64::MAX` and `i64::MIN`, which stand for "no value yet", render as `undef`.
///
/// # Example
///
/// ```
/// use simons::present_nanos;
///
/// assert_eq!(present_nanos(999), "999 ns");
/// assert_eq!(present_nanos(1_500), "1.50 us");
/// assert_eq!(present_nanos(25_300_000), "25.3 ms");
/// assert_eq!(present_nanos(i64::MAX), "undef");
/// ```
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "presentation only keeps three significant digits"
)]
pub fn present_nanos(nanos: i64) -> String {
    if nanos == i64::MAX || nanos == i64::MIN {
        return UNDEF.to_string();
    }

    let magnitude = nanos.unsigned_abs();
    let value = nanos as f64;

    if magnitude < 1_000 {
        format!("{nanos} ns")
    } else if magnitude < 1_000_000 {
        format!("{} us", three_digits(value / NANOS_PER_MICRO))
    } else if magnitude < 1_000_000_000 {
        format!("{} ms", three_digits(value / NANOS_PER_MILLI))
    } else {
        format!("{} s", three_digits(value / NANOS_PER_SECOND))
    }
}

/// Renders a counter's extremes, showing `undef` for an extreme that was never reached.
///
/// ```
/// use simons::present_min_max;
///
/// assert_eq!(present_min_max(-3, 12), "min=-3, max=12");
/// assert_eq!(present_min_max(i64::MAX, i64::MIN), "min=undef, max=undef");
/// ```
#[must_use]
pub fn present_min_max(min: i64, max: i64) -> String {
    format!("min={}, max={}", present_count(min), present_count(max))
}

fn present_count(value: i64) -> String {
    if value == i64::MAX || value == i64::MIN {
        UNDEF.to_string()
    } else {
        value.to_string()
    }
}

fn three_digits(value: f64) -> String {
    let magnitude = value.abs();

    if magnitude < 10.0 {
        format!("{value:.2}")
    } else if magnitude < 100.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.0}")
    }
}
