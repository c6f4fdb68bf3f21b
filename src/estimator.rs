//! Read-time extrapolation: converts today's buckets, the authoritative
//! daily total, and the day progress into "ridership so far" and an
//! instantaneous riders-per-hour rate.
//!
//! All arithmetic runs in floating point; the only integer truncation is
//! the final floor of each `estimated_so_far`. The rate stays a float so
//! clients can animate between refreshes.

use std::cmp::Reverse;
use std::str::FromStr;

use crate::aggregator::types::{DailyTotal, DayAggregate, StationDay, HOURS_PER_DAY};
use crate::error::TickerError;
use crate::progress::DayProgress;

pub const MIN_TOP: usize = 1;
pub const MAX_TOP: usize = 10;

/// Correction factor between the hourly-feed-derived daily total and the
/// independently sourced authoritative total. The hourly feed is a
/// systematic undercount, so this usually lands above 1.
pub fn ridership_ratio(authoritative: u64, hourly_derived: u64) -> f64 {
    if hourly_derived == 0 {
        0.0
    } else {
        authoritative as f64 / hourly_derived as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverallEstimate {
    pub estimated_so_far: u64,
    pub riders_per_hour: f64,
}

/// System-wide estimate for the moment described by `progress`.
pub fn estimate_overall(
    day: &DayAggregate,
    total: &DailyTotal,
    progress: DayProgress,
) -> OverallEstimate {
    let ratio = ridership_ratio(total.subway_ridership, day.daily_ridership);
    let n = progress.num_hours_passed();
    let pct = progress.percent_of_hour_passed();

    // Stored records should hold all 24 buckets, but a short one must not
    // bring down the read path; missing hours count as zero.
    let full_hours: u64 = day
        .hourly_ridership
        .iter()
        .take(n)
        .map(|h| h.ridership)
        .sum();
    let current_hour = day
        .hourly_ridership
        .get(n)
        .map_or(0.0, |h| h.ridership as f64);

    OverallEstimate {
        estimated_so_far: ((full_hours as f64 + pct * current_hour) * ratio).floor() as u64,
        riders_per_hour: current_hour * ratio,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationEstimate {
    pub station_id: String,
    pub estimated_so_far: u64,
    pub riders_per_hour: f64,
}

/// Per-station estimates, using each record's precomputed running sum so a
/// station costs O(1) regardless of the hour. Records without a full day
/// of buckets are skipped, not treated as zero.
pub fn estimate_stations(
    station_days: &[StationDay],
    ratio: f64,
    progress: DayProgress,
) -> Vec<StationEstimate> {
    let n = progress.num_hours_passed();
    let pct = progress.percent_of_hour_passed();

    station_days
        .iter()
        .filter(|sd| sd.hourly_ridership.len() == HOURS_PER_DAY)
        .map(|sd| {
            let so_far_prev = if n == 0 {
                0
            } else {
                sd.hourly_ridership[n - 1].ridership_so_far
            };
            let current_hour = sd.hourly_ridership[n].ridership as f64;
            StationEstimate {
                station_id: sd.station_id.clone(),
                estimated_so_far: ((so_far_prev as f64 + pct * current_hour) * ratio).floor()
                    as u64,
                riders_per_hour: current_hour * ratio,
            }
        })
        .collect()
}

/// Ranking key for the top-stations list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Total,
    Rate,
}

impl FromStr for SortBy {
    type Err = TickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total" => Ok(SortBy::Total),
            "rate" => Ok(SortBy::Rate),
            other => Err(TickerError::Validation(format!(
                "'sortBy' must be 'total' or 'rate', got '{other}'"
            ))),
        }
    }
}

/// Validates the `top` query parameter: an integer in `[1, 10]`. Values
/// outside the range are rejected, never clamped.
pub fn parse_top(raw: Option<&str>) -> Result<usize, TickerError> {
    let raw = raw.ok_or_else(|| TickerError::Validation("'top' is required".into()))?;
    let top: usize = raw.parse().map_err(|_| {
        TickerError::Validation(format!("'top' must be an integer, got '{raw}'"))
    })?;
    if !(MIN_TOP..=MAX_TOP).contains(&top) {
        return Err(TickerError::Validation(format!(
            "'top' must be between {MIN_TOP} and {MAX_TOP}, got {top}"
        )));
    }
    Ok(top)
}

/// Sorts descending by the chosen key and keeps the first `top` entries.
/// The sort is stable, so ties keep their original station order.
pub fn rank(mut estimates: Vec<StationEstimate>, top: usize, sort_by: SortBy) -> Vec<StationEstimate> {
    match sort_by {
        SortBy::Total => estimates.sort_by_key(|e| Reverse(e.estimated_so_far)),
        SortBy::Rate => estimates.sort_by(|a, b| {
            b.riders_per_hour
                .partial_cmp(&a.riders_per_hour)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
    estimates.truncate(top);
    estimates
}
