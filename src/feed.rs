//! Client for the raw hourly ridership feed (a Socrata dataset on
//! data.ny.gov), paginated newest-first with server-side filtering to the
//! subway transit mode.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::TickerError;
use crate::fetch::{fetch_json, HttpClient};

/// Hourly ridership dataset used by the sync job.
pub const MTA_HOURLY_RIDERSHIP_URL: &str = "https://data.ny.gov/resource/wujg-7c2s.json";

/// One raw feed row, already parsed out of the Socrata JSON envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    /// Feed-local timestamp; no timezone conversion is applied beyond what
    /// the feed itself encodes.
    pub timestamp: NaiveDateTime,
    pub ridership: u64,
    /// Absent for the aggregate-only feed variant.
    pub station_id: Option<String>,
}

/// Paginated, newest-first view of the raw ridership feed. The aggregator
/// depends only on this trait so tests can drive it from a canned feed.
#[async_trait]
pub trait RidershipFeed: Send + Sync {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<FeedEvent>, TickerError>;
}

#[derive(Debug, Deserialize)]
struct SocrataRow {
    transit_timestamp: String,
    ridership: String,
    #[serde(default)]
    station_complex_id: Option<String>,
}

pub struct SocrataFeed<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> SocrataFeed<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> RidershipFeed for SocrataFeed<C> {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<FeedEvent>, TickerError> {
        let select = "$select=transit_timestamp,ridership,station_complex_id";
        let filter = "$where=transit_mode='subway'";
        let order = "$order=transit_timestamp DESC";
        let url = format!(
            "{}?{select}&{filter}&{order}&$limit={limit}&$offset={offset}",
            self.base_url
        );
        // Socrata rejects raw spaces in SoQL clauses
        let url = url.replace(' ', "%20");

        debug!(offset, limit, "Fetching feed page");
        let rows: Vec<SocrataRow> = fetch_json(&self.client, &url).await?;

        rows.into_iter().map(parse_row).collect()
    }
}

fn parse_row(row: SocrataRow) -> Result<FeedEvent, TickerError> {
    // Socrata floating timestamps look like "2024-10-05T13:00:00.000"
    let timestamp = NaiveDateTime::parse_from_str(&row.transit_timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| {
            TickerError::UpstreamFetch(format!(
                "unparseable transit_timestamp {:?}: {e}",
                row.transit_timestamp
            ))
        })?;

    // Counts arrive as decimal strings; a malformed count folds in as 0
    // rather than dropping the whole run.
    let ridership = match row.ridership.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => n as u64,
        _ => {
            warn!(value = %row.ridership, "Non-numeric ridership count, counting as 0");
            0
        }
    };

    Ok(FeedEvent {
        timestamp,
        ridership,
        station_id: row.station_complex_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts: &str, ridership: &str, station: Option<&str>) -> SocrataRow {
        SocrataRow {
            transit_timestamp: ts.to_string(),
            ridership: ridership.to_string(),
            station_complex_id: station.map(str::to_string),
        }
    }

    #[test]
    fn parses_socrata_floating_timestamp() {
        let event = parse_row(row("2024-10-05T13:00:00.000", "412", Some("611"))).unwrap();
        assert_eq!(event.ridership, 412);
        assert_eq!(event.station_id.as_deref(), Some("611"));
        assert_eq!(event.timestamp.format("%Y-%m-%d %H").to_string(), "2024-10-05 13");
    }

    #[test]
    fn parses_timestamp_without_fractional_seconds() {
        let event = parse_row(row("2024-10-05T13:00:00", "1", None)).unwrap();
        assert_eq!(event.timestamp.format("%H").to_string(), "13");
    }

    #[test]
    fn malformed_count_folds_in_as_zero() {
        let event = parse_row(row("2024-10-05T13:00:00.000", "n/a", Some("611"))).unwrap();
        assert_eq!(event.ridership, 0);
    }

    #[test]
    fn malformed_timestamp_is_an_upstream_error() {
        let err = parse_row(row("yesterday", "5", None)).unwrap_err();
        assert!(matches!(err, TickerError::UpstreamFetch(_)));
    }
}
