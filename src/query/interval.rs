//! Sampling interval calculation.
//!
//! Given a time range and a desired resolution, [`calculate_interval`] picks
//! the interval a datasource should be asked to sample at: the raw range /
//! resolution quotient snapped to a "nice" value, floored at an optional
//! lower limit such as a datasource's native collection interval.
use thiserror::Error;

use crate::query::TimeRange;

/// An error which can occur when parsing an interval string.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntervalError {
    /// The interval string could not be parsed.
    #[error("invalid interval string: {0:?}")]
    InvalidInterval(String),
}

/// A computed sampling interval, in both string and millisecond form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalValues {
    /// The interval as a duration string, e.g. `30s`.
    pub interval: String,
    /// The interval in milliseconds.
    pub interval_ms: u64,
}

// (upper bound, snapped value): an interval below the bound rounds to the
// paired value. Bounds sit roughly halfway between neighbouring nice values.
const INTERVAL_LADDER_MS: &[(u64, u64)] = &[
    (15, 10),
    (35, 20),
    (75, 50),
    (150, 100),
    (350, 200),
    (750, 500),
    (1_500, 1_000),
    (3_500, 2_000),
    (7_500, 5_000),
    (12_500, 10_000),
    (17_500, 15_000),
    (25_000, 20_000),
    (45_000, 30_000),
    (90_000, 60_000),
    (210_000, 120_000),
    (450_000, 300_000),
    (750_000, 600_000),
    (1_050_000, 900_000),
    (1_500_000, 1_200_000),
    (2_700_000, 1_800_000),
    (5_400_000, 3_600_000),
    (9_000_000, 7_200_000),
    (16_200_000, 10_800_000),
    (32_400_000, 21_600_000),
    (86_400_000, 43_200_000),
    (604_800_000, 86_400_000),
    (1_814_400_000, 604_800_000),
    (3_628_800_000, 2_592_000_000),
];

const YEAR_MS: u64 = 31_536_000_000;

// Units admissible in interval strings, largest first.
const INTERVAL_UNITS: &[(u64, &str)] = &[
    (YEAR_MS, "y"),
    (2_592_000_000, "M"),
    (604_800_000, "w"),
    (86_400_000, "d"),
    (3_600_000, "h"),
    (60_000, "m"),
    (1_000, "s"),
    (1, "ms"),
];

/// Snap an interval to the nearest "nice" value.
///
/// # Example
///
/// ```rust
/// use panel_query_runner::query::interval::round_interval;
///
/// assert_eq!(round_interval(216_000), 300_000); // ~3.6m rounds to 5m
/// assert_eq!(round_interval(14), 10);
/// assert_eq!(round_interval(15), 20);
/// ```
pub fn round_interval(interval_ms: u64) -> u64 {
    INTERVAL_LADDER_MS
        .iter()
        .find(|(bound, _)| interval_ms < *bound)
        .map(|(_, rounded)| *rounded)
        .unwrap_or(YEAR_MS)
}

/// Parse an interval string such as `30s` or `1.5m` into milliseconds.
///
/// Recognized units are `ms`, `s`, `m`, `h`, `d`, `w`, `M` and `y`; a bare
/// number is interpreted as seconds.
///
/// # Errors
///
/// Returns an [`IntervalError::InvalidInterval`] if the string is empty, has
/// an unrecognized unit, or has no parseable numeric part.
pub fn interval_to_ms(interval: &str) -> Result<u64, IntervalError> {
    let interval = interval.trim();
    let split = interval
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(interval.len());
    let (number, unit) = interval.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| IntervalError::InvalidInterval(interval.to_string()))?;
    let unit_ms = match unit {
        "" => 1_000,
        _ => INTERVAL_UNITS
            .iter()
            .find(|(_, suffix)| *suffix == unit)
            .map(|(ms, _)| *ms)
            .ok_or_else(|| IntervalError::InvalidInterval(interval.to_string()))?,
    };
    Ok((number * unit_ms as f64).round() as u64)
}

/// Render an interval in milliseconds as a duration string.
///
/// The largest unit that divides the interval evenly is used, e.g. `30s`,
/// `2h`, `1d`.
pub fn format_interval(interval_ms: u64) -> String {
    INTERVAL_UNITS
        .iter()
        .find(|(ms, _)| interval_ms >= *ms && interval_ms % ms == 0)
        .map(|(ms, suffix)| format!("{}{}", interval_ms / ms, suffix))
        .unwrap_or_else(|| format!("{}ms", interval_ms))
}

/// Compute the sampling interval for a time range at the given resolution.
///
/// The candidate interval (range span divided by resolution) is snapped via
/// [`round_interval`] and floored at `lower_limit`, which is typically either
/// an interpolated minimum-interval override or a datasource's declared
/// native interval.
///
/// # Errors
///
/// Returns an error if `lower_limit` is present but unparseable.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use panel_query_runner::query::{interval::calculate_interval, TimeRange};
///
/// let range = TimeRange::new(
///     Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap(),
///     Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).single().unwrap(),
/// );
/// let values = calculate_interval(&range, 100, None).unwrap();
/// assert_eq!(values.interval, "5m");
/// assert_eq!(values.interval_ms, 300_000);
/// ```
pub fn calculate_interval(
    range: &TimeRange,
    resolution: u64,
    lower_limit: Option<&str>,
) -> Result<IntervalValues, IntervalError> {
    let lower_limit_ms = lower_limit.map(interval_to_ms).transpose()?.unwrap_or(1);
    let mut interval_ms = round_interval(range.span_ms() / resolution.max(1));
    if lower_limit_ms > interval_ms {
        interval_ms = lower_limit_ms;
    }
    Ok(IntervalValues {
        interval: format_interval(interval_ms),
        interval_ms,
    })
}
