//! Windowed aggregation: pages the raw feed backward in time and folds
//! events into day-of-week × hour buckets, overall and per station.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use tracing::{debug, info};

use crate::aggregator::types::{DayAggregate, DayOfWeek, StationDay, HOURS_PER_DAY};
use crate::error::TickerError;
use crate::feed::RidershipFeed;

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

type DayHourCounts = [[u64; HOURS_PER_DAY]; 7];

/// Everything one sync run produces. Held entirely in memory until the
/// writer is invoked, so a failed fetch commits nothing.
#[derive(Debug)]
pub struct AggregateOutput {
    /// Exactly one aggregate per day of week, Sunday first.
    pub days: Vec<DayAggregate>,
    /// One record per (station, day) pair with observed ridership.
    pub stations: Vec<StationDay>,
}

/// Pages through `feed` newest-first and aggregates the trailing
/// `window_days` of events.
///
/// The cutoff is fixed from the first event seen: `first_timestamp -
/// window_days`. Paging stops once a page comes back shorter than
/// `page_size` (feed exhausted) or its oldest event falls before the
/// cutoff, which bounds the fetched volume to one window plus at most one
/// partial page.
pub async fn aggregate<F: RidershipFeed + ?Sized>(
    feed: &F,
    page_size: usize,
    window_days: i64,
) -> Result<AggregateOutput, TickerError> {
    let mut overall: DayHourCounts = [[0; HOURS_PER_DAY]; 7];
    let mut per_station: HashMap<String, DayHourCounts> = HashMap::new();

    let mut offset = 0usize;
    let mut cutoff: Option<NaiveDateTime> = None;
    let mut pages = 0usize;

    loop {
        let page = feed.fetch_page(offset, page_size).await?;
        pages += 1;
        if page.is_empty() {
            break;
        }

        let cutoff = *cutoff.get_or_insert_with(|| {
            let first = page[0].timestamp;
            let c = first - Duration::days(window_days);
            info!(first = %first, cutoff = %c, window_days, "Fixed aggregation window");
            c
        });

        for event in &page {
            if event.timestamp < cutoff {
                continue;
            }
            let day = DayOfWeek::from(event.timestamp.weekday()).index();
            let hour = event.timestamp.hour() as usize;
            overall[day][hour] += event.ridership;
            if let Some(id) = &event.station_id {
                per_station
                    .entry(id.clone())
                    .or_insert_with(|| [[0; HOURS_PER_DAY]; 7])[day][hour] += event.ridership;
            }
        }

        let oldest = page[page.len() - 1].timestamp;
        let fetched = page.len();
        offset += fetched;
        debug!(offset, fetched, oldest = %oldest, "Folded feed page");

        if fetched < page_size || oldest < cutoff {
            break;
        }
    }

    let days = DayOfWeek::ALL
        .iter()
        .map(|&day| DayAggregate::from_hour_counts(day, &overall[day.index()]))
        .collect();

    let mut stations: Vec<StationDay> = Vec::new();
    let mut station_ids: Vec<&String> = per_station.keys().collect();
    station_ids.sort();
    for id in station_ids {
        let counts = &per_station[id];
        for day in DayOfWeek::ALL {
            let day_counts = &counts[day.index()];
            if day_counts.iter().any(|&c| c > 0) {
                stations.push(StationDay::from_hour_counts(id.clone(), day, day_counts));
            }
        }
    }

    info!(
        pages,
        events_through = offset,
        station_days = stations.len(),
        "Aggregation complete"
    );

    Ok(AggregateOutput {
        days,
        stations,
    })
}
