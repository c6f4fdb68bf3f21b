//! Read-path operations. These are the request/response contracts the HTTP
//! layer (an external collaborator) exposes as `GET today` and
//! `GET today/stations`; everything here is stateless and side-effect-free.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::aggregator::types::{DailyTotal, DayAggregate, DayOfWeek, HOURS_PER_DAY};
use crate::error::TickerError;
use crate::estimator::{
    self, estimate_overall, estimate_stations, parse_top, ridership_ratio, SortBy,
};
use crate::progress::{day_of_week_at, DayProgress};
use crate::stations::display_names;
use crate::store::RidershipStore;

#[derive(Debug, Serialize, PartialEq)]
pub struct TodayResponse {
    pub day: DayOfWeek,
    pub estimated_ridership_today: u64,
    pub estimated_ridership_so_far: u64,
    pub riders_per_hour: f64,
}

/// Raw query parameters for `GET today/stations`, unvalidated.
#[derive(Debug, Default, Clone)]
pub struct TopStationsQuery {
    pub top: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TopStationEntry {
    pub id: String,
    pub name: String,
    pub estimated_ridership_so_far: u64,
    pub riders_per_hour: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TopStationsResponse {
    pub day: DayOfWeek,
    pub top_stations: Vec<TopStationEntry>,
}

/// Serialized response envelope with an HTTP-style status code.
#[derive(Debug, PartialEq)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

/// System-wide estimate for the current moment.
pub async fn today<S: RidershipStore + ?Sized>(
    store: &S,
    tz: Tz,
) -> Result<TodayResponse, TickerError> {
    today_at(store, tz, Utc::now()).await
}

pub async fn today_at<S: RidershipStore + ?Sized>(
    store: &S,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<TodayResponse, TickerError> {
    let day = day_of_week_at(tz, now);
    let (total, day_agg) = load_today(store, day).await?;

    let progress = DayProgress::at(tz, now);
    let est = estimate_overall(&day_agg, &total, progress);
    debug!(
        day = %day,
        fraction = progress.fraction(),
        estimated_so_far = est.estimated_so_far,
        "Computed overall estimate"
    );

    Ok(TodayResponse {
        day,
        estimated_ridership_today: total.subway_ridership,
        estimated_ridership_so_far: est.estimated_so_far,
        riders_per_hour: est.riders_per_hour,
    })
}

/// Top-N stations by estimated ridership so far or by current rate.
pub async fn top_stations<S: RidershipStore + ?Sized>(
    store: &S,
    tz: Tz,
    query: &TopStationsQuery,
) -> Result<TopStationsResponse, TickerError> {
    top_stations_at(store, tz, query, Utc::now()).await
}

pub async fn top_stations_at<S: RidershipStore + ?Sized>(
    store: &S,
    tz: Tz,
    query: &TopStationsQuery,
    now: DateTime<Utc>,
) -> Result<TopStationsResponse, TickerError> {
    // Validation failures surface before any store call.
    let top = parse_top(query.top.as_deref())?;
    let sort_by = match query.sort_by.as_deref() {
        Some(raw) => raw.parse::<SortBy>()?,
        None => SortBy::Total,
    };

    let day = day_of_week_at(tz, now);
    let (total, day_agg) = load_today(store, day).await?;
    let ratio = ridership_ratio(total.subway_ridership, day_agg.daily_ridership);
    let progress = DayProgress::at(tz, now);

    let stations = store.list_stations().await?;
    let ids: Vec<String> = stations.iter().map(|s| s.id.clone()).collect();
    let mut station_days = store.station_days(&ids, day).await?;

    // Restore directory order so ranking ties break deterministically.
    let order: std::collections::HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    station_days.sort_by_key(|sd| order.get(sd.station_id.as_str()).copied());

    let estimates = estimate_stations(&station_days, ratio, progress);
    let ranked = estimator::rank(estimates, top, sort_by);

    let names = display_names(&stations);
    let top_stations = ranked
        .into_iter()
        .map(|est| TopStationEntry {
            name: names
                .get(&est.station_id)
                .cloned()
                .unwrap_or_else(|| est.station_id.clone()),
            id: est.station_id,
            estimated_ridership_so_far: est.estimated_so_far,
            riders_per_hour: est.riders_per_hour,
        })
        .collect();

    Ok(TopStationsResponse { day, top_stations })
}

async fn load_today<S: RidershipStore + ?Sized>(
    store: &S,
    day: DayOfWeek,
) -> Result<(DailyTotal, DayAggregate), TickerError> {
    let total = store
        .daily_total(day)
        .await?
        .ok_or_else(|| TickerError::NotFound(day.to_string()))?;
    let day_agg = store
        .day_aggregate(day)
        .await?
        .ok_or_else(|| TickerError::NotFound(day.to_string()))?;
    if day_agg.hourly_ridership.len() != HOURS_PER_DAY {
        return Err(TickerError::Store(format!(
            "day record for {day} holds {} hour buckets instead of {HOURS_PER_DAY}",
            day_agg.hourly_ridership.len()
        )));
    }
    Ok((total, day_agg))
}

/// Wraps a handler result in the HTTP-style envelope the routing layer
/// returns verbatim.
pub fn respond<T: Serialize>(result: Result<T, TickerError>) -> HandlerResponse {
    match result {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(body) => HandlerResponse {
                status_code: 200,
                body,
            },
            Err(e) => HandlerResponse {
                status_code: 500,
                body: format!("{{\"error\":\"serialization failed: {e}\"}}"),
            },
        },
        Err(err) => {
            let key = if matches!(err, TickerError::NotFound(_)) {
                "message"
            } else {
                "error"
            };
            let mut body = serde_json::Map::new();
            body.insert(key.to_string(), serde_json::Value::String(err.to_string()));
            HandlerResponse {
                status_code: err.status_code(),
                body: serde_json::Value::Object(body).to_string(),
            }
        }
    }
}
