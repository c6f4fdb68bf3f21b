//! Bucket types produced by the windowed aggregation and read back by the
//! extrapolation engine. All of these are immutable snapshots: every sync
//! run rebuilds them from scratch and overwrites the store by key.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const HOURS_PER_DAY: usize = 24;

/// Day-of-week key, serialized as the three-letter form used as the store's
/// partition key ("Sun" .. "Sat").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sun,
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
    ];

    /// Sunday-first index in `[0, 6]`.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Sun => "Sun",
            DayOfWeek::Mon => "Mon",
            DayOfWeek::Tue => "Tue",
            DayOfWeek::Wed => "Wed",
            DayOfWeek::Thu => "Thu",
            DayOfWeek::Fri => "Fri",
            DayOfWeek::Sat => "Sat",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(w: chrono::Weekday) -> Self {
        match w {
            chrono::Weekday::Sun => DayOfWeek::Sun,
            chrono::Weekday::Mon => DayOfWeek::Mon,
            chrono::Weekday::Tue => DayOfWeek::Tue,
            chrono::Weekday::Wed => DayOfWeek::Wed,
            chrono::Weekday::Thu => DayOfWeek::Thu,
            chrono::Weekday::Fri => DayOfWeek::Fri,
            chrono::Weekday::Sat => DayOfWeek::Sat,
        }
    }
}

/// Aggregated ridership for one (day_of_week, hour) slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourBucket {
    pub ridership: u64,
    pub percent_of_daily: f64,
}

/// One day-of-week's 24 hourly buckets plus the derived daily total.
///
/// `hours` always holds exactly [`HOURS_PER_DAY`] entries, index = hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAggregate {
    pub day_of_week: DayOfWeek,
    pub hourly_ridership: Vec<HourBucket>,
    pub daily_ridership: u64,
}

impl DayAggregate {
    /// Builds a day aggregate from dense hourly counts, deriving the daily
    /// total and each hour's share of it. A day with zero ridership gets
    /// all-zero percentages rather than NaN.
    pub fn from_hour_counts(day_of_week: DayOfWeek, counts: &[u64; HOURS_PER_DAY]) -> Self {
        let daily_ridership: u64 = counts.iter().sum();
        let hourly_ridership = counts
            .iter()
            .map(|&ridership| HourBucket {
                ridership,
                percent_of_daily: percent_of(ridership, daily_ridership),
            })
            .collect();
        Self {
            day_of_week,
            hourly_ridership,
            daily_ridership,
        }
    }
}

/// As [`HourBucket`], scoped to one station, carrying the running sum of
/// that station's ridership over hours `[0, hour]` of the same day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationHourBucket {
    pub ridership: u64,
    pub percent_of_daily: f64,
    pub ridership_so_far: u64,
}

/// One station's 24 hourly buckets for one day-of-week. Stored under the
/// composite key `{station_id}-{day_of_week}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDay {
    pub station_id: String,
    pub day_of_week: DayOfWeek,
    pub hourly_ridership: Vec<StationHourBucket>,
}

impl StationDay {
    /// Builds a station/day record from dense hourly counts, filling in the
    /// prefix sums the read path uses for O(1) "ridership so far" lookups.
    pub fn from_hour_counts(
        station_id: String,
        day_of_week: DayOfWeek,
        counts: &[u64; HOURS_PER_DAY],
    ) -> Self {
        let daily: u64 = counts.iter().sum();
        let mut so_far = 0u64;
        let hourly_ridership = counts
            .iter()
            .map(|&ridership| {
                so_far += ridership;
                StationHourBucket {
                    ridership,
                    percent_of_daily: percent_of(ridership, daily),
                    ridership_so_far: so_far,
                }
            })
            .collect();
        Self {
            station_id,
            day_of_week,
            hourly_ridership,
        }
    }

    pub fn key(&self) -> String {
        format!("{}-{}", self.station_id, self.day_of_week)
    }
}

/// Ground-truth daily ridership, sourced independently of the hourly feed
/// and treated as more accurate than the sum of the hourly buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub day_of_week: DayOfWeek,
    pub subway_ridership: u64,
}

/// Station directory entry. Populated by an external sync job; the
/// estimator only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borough: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub routes: Vec<String>,
}

fn percent_of(ridership: u64, daily: u64) -> f64 {
    if daily == 0 {
        0.0
    } else {
        ridership as f64 / daily as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_of_week_serializes_as_store_key() {
        let json = serde_json::to_string(&DayOfWeek::Wed).unwrap();
        assert_eq!(json, "\"Wed\"");
        let back: DayOfWeek = serde_json::from_str("\"Sat\"").unwrap();
        assert_eq!(back, DayOfWeek::Sat);
    }

    #[test]
    fn day_aggregate_percentages_sum_to_one() {
        let mut counts = [0u64; HOURS_PER_DAY];
        counts[8] = 300;
        counts[9] = 500;
        counts[17] = 200;
        let day = DayAggregate::from_hour_counts(DayOfWeek::Mon, &counts);

        assert_eq!(day.hourly_ridership.len(), HOURS_PER_DAY);
        assert_eq!(day.daily_ridership, 1000);
        let percent_sum: f64 = day
            .hourly_ridership
            .iter()
            .map(|h| h.percent_of_daily)
            .sum();
        assert!((percent_sum - 1.0).abs() < 1e-9);
        assert!((day.hourly_ridership[9].percent_of_daily - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_day_has_zero_percentages_not_nan() {
        let counts = [0u64; HOURS_PER_DAY];
        let day = DayAggregate::from_hour_counts(DayOfWeek::Sun, &counts);
        assert_eq!(day.daily_ridership, 0);
        assert!(day
            .hourly_ridership
            .iter()
            .all(|h| h.percent_of_daily == 0.0));
    }

    #[test]
    fn station_day_prefix_sums_are_exact_and_non_decreasing() {
        let mut counts = [0u64; HOURS_PER_DAY];
        counts[0] = 5;
        counts[3] = 10;
        counts[23] = 7;
        let station = StationDay::from_hour_counts("611".into(), DayOfWeek::Fri, &counts);

        let mut expected = 0u64;
        let mut prev = 0u64;
        for (hour, bucket) in station.hourly_ridership.iter().enumerate() {
            expected += counts[hour];
            assert_eq!(bucket.ridership_so_far, expected);
            assert!(bucket.ridership_so_far >= prev);
            prev = bucket.ridership_so_far;
        }
        assert_eq!(expected, 22);
    }

    #[test]
    fn station_day_key_combines_station_and_day() {
        let station = StationDay::from_hour_counts("611".into(), DayOfWeek::Fri, &[0; 24]);
        assert_eq!(station.key(), "611-Fri");
    }
}
