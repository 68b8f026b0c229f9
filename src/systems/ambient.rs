//! Ambient (outdoor) temperature over simulated time.
//!
//! An [`AmbientSeries`] holds one sample per hour and answers
//! `temperature_at(t)` for continuous `t` in hours by linear interpolation
//! between the surrounding samples. Series come from an external hourly
//! table ([`HourlyDataset`]) or are synthesised from a short list of
//! constant-temperature segments.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LookupError, Result, ThermoError};

/// Hour-resolution key into an hourly table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
}

impl Timestamp {
    pub const fn new(year: i32, month: u8, day: u8, hour: u8) -> Self {
        Self { year, month, day, hour }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02} {:02}:00", self.year, self.month, self.day, self.hour)
    }
}

/// External hourly outdoor-temperature table.
pub trait HourlyDataset {
    /// Row index of `at`, if the table has it.
    fn index_of(&self, at: &Timestamp) -> Option<usize>;

    /// Temperatures of the rows in `rows`, chronologically ordered; `None`
    /// when the table cannot supply every row.
    fn temperatures(&self, rows: RangeInclusive<usize>) -> Option<Vec<f64>>;
}

/// In-memory [`HourlyDataset`], kept sorted by timestamp.
#[derive(Clone, Debug, Default)]
pub struct HourlyTable {
    rows: Vec<(Timestamp, f64)>,
}

impl HourlyTable {
    pub fn new(mut rows: Vec<(Timestamp, f64)>) -> Self {
        rows.sort_by_key(|(ts, _)| *ts);
        rows.dedup_by_key(|(ts, _)| *ts);
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl HourlyDataset for HourlyTable {
    fn index_of(&self, at: &Timestamp) -> Option<usize> {
        self.rows.binary_search_by_key(at, |(ts, _)| *ts).ok()
    }

    fn temperatures(&self, rows: RangeInclusive<usize>) -> Option<Vec<f64>> {
        self.rows.get(rows).map(|r| r.iter().map(|(_, t)| *t).collect())
    }
}

/// Resolve `[start, end]` to row indices, failing on absent or reversed keys.
pub fn resolve_range(
    dataset: &dyn HourlyDataset,
    start: &Timestamp,
    end: &Timestamp,
) -> std::result::Result<RangeInclusive<usize>, LookupError> {
    let s = dataset.index_of(start).ok_or(LookupError::MissingTimestamp(*start))?;
    let e = dataset.index_of(end).ok_or(LookupError::MissingTimestamp(*end))?;
    if e < s {
        return Err(LookupError::ReversedRange { start: *start, end: *end });
    }
    Ok(s..=e)
}

/// Hourly ambient samples, immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct AmbientSeries {
    samples: Vec<f64>,
}

impl AmbientSeries {
    pub fn from_samples(samples: Vec<f64>) -> Result<Self> {
        if samples.is_empty() {
            return Err(ConfigError::invalid("ambient.samples", "[]", "needs at least one sample").into());
        }
        if let Some(bad) = samples.iter().find(|t| !t.is_finite()) {
            return Err(ConfigError::invalid("ambient.samples", bad, "must be finite").into());
        }
        Ok(Self { samples })
    }

    /// Historical series covering `[start, end]` inclusive.
    pub fn from_dataset(dataset: &dyn HourlyDataset, start: &Timestamp, end: &Timestamp) -> Result<Self> {
        let rows = resolve_range(dataset, start, end)?;
        let (first, last) = (*rows.start(), *rows.end());
        let temps = dataset
            .temperatures(rows)
            .filter(|t| t.len() == last - first + 1)
            .ok_or(LookupError::RowsUnavailable { start: *start, end: *end })?;
        Self::from_samples(temps)
    }

    /// Piecewise-constant series of `sample_count` hours.
    ///
    /// The hours are split into `temps.len()` blocks of `sample_count / len`
    /// samples; block `i` holds `temps[i]`. Hours left over by the integer
    /// division, and always the final hour, hold the last listed value.
    pub fn synthetic(temps: &[f64], sample_count: usize) -> Result<Self> {
        if temps.is_empty() {
            return Err(ConfigError::invalid("ambient.temperatures", "[]", "needs at least one value").into());
        }
        if sample_count == 0 {
            return Err(ConfigError::invalid("ambient.hours", 0, "must be at least 1").into());
        }
        let m = temps.len();
        let block = sample_count / m;
        let last = temps[m - 1];
        let mut samples: Vec<f64> = (0..sample_count)
            .map(|i| {
                let seg = if block > 0 { i / block } else { i * m / sample_count };
                temps.get(seg).copied().unwrap_or(last)
            })
            .collect();
        if let Some(tail) = samples.last_mut() {
            *tail = last;
        }
        Self::from_samples(samples)
    }

    /// Synthetic series spanning the same hours as `[start, end]` in `dataset`.
    pub fn synthetic_between(
        dataset: &dyn HourlyDataset,
        temps: &[f64],
        start: &Timestamp,
        end: &Timestamp,
    ) -> Result<Self> {
        let rows = resolve_range(dataset, start, end)?;
        Self::synthetic(temps, rows.end() - rows.start() + 1)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Last valid query time, in hours.
    pub fn duration_hours(&self) -> f64 {
        (self.samples.len() - 1) as f64
    }

    /// Linear interpolation between the floor and ceil hourly samples.
    pub fn temperature_at(&self, t: f64) -> Result<f64> {
        let duration = self.duration_hours();
        if !(0.0..=duration).contains(&t) {
            return Err(ThermoError::OutOfRange { t, duration });
        }
        let lo = t.floor() as usize;
        let hi = t.ceil() as usize;
        let a = self.samples[lo];
        let b = self.samples[hi];
        Ok(a + (t - lo as f64) * (b - a))
    }
}
