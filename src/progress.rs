//! Day-progress estimation in a fixed reference timezone.
//!
//! The ridership feed covers a single transit system, so "how far through
//! today" must be measured where that system operates, never in the
//! timezone of whatever host happens to run the process. The reference
//! timezone is an explicit configuration value.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::aggregator::types::{DayOfWeek, HOURS_PER_DAY};

const SECONDS_PER_DAY: f64 = 86_400.0;
// Keeps the fraction strictly below 1.0 even across a DST-lengthened day.
const MAX_DAY_FRACTION: f64 = 1.0 - 1e-9;

/// Fraction of the current calendar day elapsed in a reference timezone,
/// always in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayProgress(f64);

impl DayProgress {
    /// Progress through the calendar day containing `now`, measured in `tz`.
    pub fn at(tz: Tz, now: DateTime<Utc>) -> Self {
        let local = now.with_timezone(&tz);
        let midnight = local.date_naive().and_time(NaiveTime::MIN);
        let Some(midnight) = tz.from_local_datetime(&midnight).earliest() else {
            // Midnight was skipped by a DST transition; the day has in
            // effect just started.
            return Self(0.0);
        };
        let elapsed = (now - midnight.with_timezone(&Utc)).num_milliseconds() as f64 / 1000.0;
        Self((elapsed / SECONDS_PER_DAY).clamp(0.0, MAX_DAY_FRACTION))
    }

    /// Progress as of the current wall-clock instant.
    pub fn now(tz: Tz) -> Self {
        Self::at(tz, Utc::now())
    }

    pub fn fraction(self) -> f64 {
        self.0
    }

    /// Whole hours elapsed, clamped to `[0, 23]`.
    pub fn num_hours_passed(self) -> usize {
        ((self.0 * HOURS_PER_DAY as f64) as usize).min(HOURS_PER_DAY - 1)
    }

    /// Fraction of the current hour elapsed, in `[0, 1)`.
    pub fn percent_of_hour_passed(self) -> f64 {
        let hours = self.0 * HOURS_PER_DAY as f64;
        hours - hours.floor()
    }

    #[cfg(test)]
    pub(crate) fn from_fraction(fraction: f64) -> Self {
        Self(fraction)
    }
}

/// Today's day of week in the reference timezone.
pub fn day_of_week_at(tz: Tz, now: DateTime<Utc>) -> DayOfWeek {
    use chrono::Datelike;
    DayOfWeek::from(now.with_timezone(&tz).weekday())
}

pub fn day_of_week(tz: Tz) -> DayOfWeek {
    day_of_week_at(tz, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::Tokyo;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn noon_in_new_york_is_half_a_day() {
        // 2024-10-09 is EDT (UTC-4), so 16:00Z is noon local.
        let p = DayProgress::at(New_York, utc("2024-10-09T16:00:00Z"));
        assert!((p.fraction() - 0.5).abs() < 1e-9);
        assert_eq!(p.num_hours_passed(), 12);
        assert!(p.percent_of_hour_passed().abs() < 1e-9);
    }

    #[test]
    fn independent_of_any_other_timezone() {
        // The same instant viewed from Tokyo's calendar differs, but the
        // New York fraction never depends on where the process runs.
        let instant = utc("2024-10-09T16:30:00Z");
        let ny = DayProgress::at(New_York, instant);
        let tokyo = DayProgress::at(Tokyo, instant);
        assert!((ny.fraction() - 0.520833).abs() < 1e-5);
        assert!((tokyo.fraction() - ny.fraction()).abs() > 0.1);
    }

    #[test]
    fn monotonically_increasing_within_a_day() {
        let mut prev = -1.0;
        for minutes in (0..24 * 60).step_by(17) {
            let instant = utc("2024-10-09T04:00:00Z") + chrono::Duration::minutes(minutes);
            let p = DayProgress::at(New_York, instant).fraction();
            assert!(p > prev, "progress regressed at +{minutes}m");
            prev = p;
        }
    }

    #[test]
    fn wraps_to_zero_at_reference_midnight() {
        // 04:00Z on Oct 10 is midnight EDT on Oct 10.
        let before = DayProgress::at(New_York, utc("2024-10-10T03:59:59Z"));
        let after = DayProgress::at(New_York, utc("2024-10-10T04:00:01Z"));
        assert!(before.fraction() > 0.99);
        assert!(after.fraction() < 0.001);
    }

    #[test]
    fn fraction_stays_below_one() {
        // Nov 3 2024 has 25 local hours in New York (fall-back).
        let p = DayProgress::at(New_York, utc("2024-11-04T04:59:59Z"));
        assert!(p.fraction() < 1.0);
        assert_eq!(p.num_hours_passed(), 23);
    }

    #[test]
    fn hours_passed_and_hour_fraction_derive_from_progress() {
        let p = DayProgress::from_fraction(10.5 / 24.0);
        assert_eq!(p.num_hours_passed(), 10);
        assert!((p.percent_of_hour_passed() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn day_of_week_follows_reference_timezone() {
        // 03:00Z on Thu Oct 10 is still Wed evening in New York.
        let instant = utc("2024-10-10T03:00:00Z");
        assert_eq!(day_of_week_at(New_York, instant), DayOfWeek::Wed);
        assert_eq!(day_of_week_at(Tokyo, instant), DayOfWeek::Thu);
    }
}
