//! Continuous scales for the scatter plot.
//!
//! The X scale is linear in calendar time (a year is placed at its January 1st
//! instant), the Y scale is linear in elapsed seconds. Both domains are niced
//! outward to a tick interval picked from the data span.

use chrono::{NaiveDate, NaiveTime};

use crate::{ChartError, Dataset, Layout};

/// Year intervals considered when nicing the X domain.
const YEAR_INTERVALS: &[u32] = &[1, 2, 5, 10, 20, 50, 100];
/// Duration intervals (seconds) considered when nicing the Y domain.
const SECOND_INTERVALS: &[u32] = &[1, 5, 15, 30, 60, 300, 900, 1800, 3600];
/// Approximate number of ticks the nice interval aims for.
const NICE_TICK_COUNT: f64 = 10.0;

/// Minimum and maximum of an iterator, `None` when empty.
pub fn extent<T, I>(values: I) -> Option<(T, T)>
where
    T: PartialOrd + Copy,
    I: IntoIterator<Item = T>,
{
    let mut iter = values.into_iter();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| {
        (
            if v < lo { v } else { lo },
            if v > hi { v } else { hi },
        )
    }))
}

/// Pick the candidate interval closest (by ratio) to `target`.
pub fn tick_interval(target: f64, candidates: &[u32]) -> u32 {
    let Some(&first) = candidates.first() else {
        return 1;
    };
    if !target.is_finite() || target <= first as f64 {
        return first;
    }
    for pair in candidates.windows(2) {
        let (lo, hi) = (pair[0] as f64, pair[1] as f64);
        if target <= hi {
            return if target / lo < hi / target {
                pair[0]
            } else {
                pair[1]
            };
        }
    }
    candidates[candidates.len() - 1]
}

fn floor_to(value: i64, step: i64) -> i64 {
    value.div_euclid(step) * step
}

fn ceil_to(value: i64, step: i64) -> i64 {
    let floored = floor_to(value, step);
    if floored == value {
        value
    } else {
        floored + step
    }
}

/// Plain linear mapping `domain -> range`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        if span.abs() < f64::EPSILON {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / span * (r1 - r0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = r1 - r0;
        if span.abs() < f64::EPSILON {
            return (d0 + d1) / 2.0;
        }
        d0 + (pixel - r0) / span * (d1 - d0)
    }
}

/// Milliseconds since the epoch of January 1st, 00:00 UTC of `year`.
pub fn year_instant_ms(year: i32) -> Option<f64> {
    let date = NaiveDate::from_ymd_opt(year, 1, 1)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis() as f64)
}

/// Year -> horizontal pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YearScale {
    years: (i32, i32),
    linear: LinearScale,
}

impl YearScale {
    /// Build a niced scale over `[min_year, max_year]`.
    pub fn new(min_year: i32, max_year: i32, range: (f64, f64)) -> Result<Self, ChartError> {
        let span = (max_year as i64 - min_year as i64) as f64;
        let step = tick_interval(span / NICE_TICK_COUNT, YEAR_INTERVALS) as i64;
        let lo = i32::try_from(floor_to(min_year as i64, step))
            .map_err(|_| ChartError::InvalidRecord(format!("year {min_year} out of range")))?;
        let hi = i32::try_from(ceil_to(max_year as i64, step))
            .map_err(|_| ChartError::InvalidRecord(format!("year {max_year} out of range")))?;
        let d0 = year_instant_ms(lo)
            .ok_or_else(|| ChartError::InvalidRecord(format!("year {lo} out of range")))?;
        let d1 = year_instant_ms(hi)
            .ok_or_else(|| ChartError::InvalidRecord(format!("year {hi} out of range")))?;
        Ok(Self {
            years: (lo, hi),
            linear: LinearScale::new((d0, d1), range),
        })
    }

    pub fn domain(&self) -> (i32, i32) {
        self.years
    }

    pub fn range(&self) -> (f64, f64) {
        self.linear.range
    }

    pub fn apply(&self, year: i32) -> f64 {
        match year_instant_ms(year) {
            Some(ms) => self.linear.apply(ms),
            None => f64::NAN,
        }
    }

    /// Fractional year at a pixel column.
    pub fn invert(&self, pixel: f64) -> f64 {
        let ms = self.linear.invert(pixel);
        let (lo, hi) = self.years;
        let (Some(lo_ms), Some(hi_ms)) = (year_instant_ms(lo), year_instant_ms(hi)) else {
            return lo as f64;
        };
        if hi == lo {
            return lo as f64;
        }
        lo as f64 + (ms - lo_ms) / (hi_ms - lo_ms) * (hi - lo) as f64
    }

    /// Years inside the domain that fall on a multiple of `every`.
    pub fn ticks(&self, every: u32) -> Vec<i32> {
        let every = every.max(1) as i64;
        let (lo, hi) = self.years;
        let start = ceil_to(lo as i64, every);
        (start..=hi as i64)
            .step_by(every as usize)
            .map(|y| y as i32)
            .collect()
    }
}

/// Elapsed seconds -> vertical pixel. Range order follows domain order, so
/// smaller (faster) times land nearer the top.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DurationScale {
    seconds: (u32, u32),
    linear: LinearScale,
}

impl DurationScale {
    /// Build a niced scale over `[min_seconds, max_seconds]`. Fails when the
    /// niced upper bound no longer fits in `u32`.
    pub fn new(min_seconds: u32, max_seconds: u32, range: (f64, f64)) -> Result<Self, ChartError> {
        let span = max_seconds.saturating_sub(min_seconds) as f64;
        let step = tick_interval(span / NICE_TICK_COUNT, SECOND_INTERVALS) as i64;
        let lo = floor_to(min_seconds as i64, step) as u32;
        let hi = u32::try_from(ceil_to(max_seconds as i64, step)).map_err(|_| {
            ChartError::InvalidRecord(format!("{max_seconds} seconds out of range"))
        })?;
        Ok(Self {
            seconds: (lo, hi),
            linear: LinearScale::new((lo as f64, hi as f64), range),
        })
    }

    pub fn domain(&self) -> (u32, u32) {
        self.seconds
    }

    pub fn range(&self) -> (f64, f64) {
        self.linear.range
    }

    pub fn apply(&self, seconds: u32) -> f64 {
        self.linear.apply(seconds as f64)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        self.linear.invert(pixel)
    }

    /// Multiples of `every` seconds inside the domain.
    pub fn ticks(&self, every: u32) -> Vec<u32> {
        let every = every.max(1);
        let (lo, hi) = self.seconds;
        let start = ceil_to(lo as i64, every as i64) as u32;
        (start..=hi).step_by(every as usize).collect()
    }
}

/// Both scales, built once per dataset and handed to every renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartScales {
    pub x: YearScale,
    pub y: DurationScale,
}

impl ChartScales {
    pub fn from_dataset(dataset: &Dataset, layout: &Layout) -> Result<Self, ChartError> {
        let (min_year, max_year) = dataset.year_extent();
        let (min_seconds, max_seconds) = dataset.seconds_extent();
        let x = YearScale::new(
            min_year,
            max_year,
            (layout.margin, layout.width - layout.margin),
        )?;
        let y = DurationScale::new(
            min_seconds,
            max_seconds,
            (layout.margin, layout.height - layout.margin),
        )?;
        Ok(Self { x, y })
    }
}

/// `%Y` label for an X tick.
pub fn format_year(year: i32) -> String {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .map(|d| d.format("%Y").to_string())
        .unwrap_or_else(|| year.to_string())
}

/// `%M:%S` label for a Y tick (minutes wrap at the hour like a clock face).
pub fn format_mm_ss(seconds: u32) -> String {
    NaiveTime::from_num_seconds_from_midnight_opt(seconds % 86_400, 0)
        .map(|t| t.format("%M:%S").to_string())
        .unwrap_or_else(|| format!("{:02}:{:02}", (seconds / 60) % 60, seconds % 60))
}
