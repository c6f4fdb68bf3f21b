//! DynamoDB-backed store. The sync job's own records are stored as a JSON
//! document attribute beside the partition key; the daily-total and station
//! tables are owned by external sync jobs and only parsed here.

use std::collections::HashMap;
use std::fmt::Display;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use tracing::{debug, warn};

use crate::aggregator::types::{DailyTotal, DayAggregate, DayOfWeek, Station, StationDay};
use crate::error::TickerError;

use super::{RidershipStore, StoreRecord};

// DynamoDB hard limits.
const MAX_BATCH_WRITE_ITEMS: usize = 25;
const MAX_BATCH_GET_KEYS: usize = 100;

const DOC_ATTR: &str = "doc";

#[derive(Debug, Clone)]
pub struct TableNames {
    pub hourly: String,
    pub hourly_per_station: String,
    pub daily: String,
    pub stations: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            hourly: "MTA_Subway_Hourly_Ridership".into(),
            hourly_per_station: "MTA_Subway_Hourly_Ridership_Per_Station".into(),
            daily: "MTA_Subway_Daily_Ridership".into(),
            stations: "MTA_Subway_Stations".into(),
        }
    }
}

impl TableNames {
    /// Default table names with `TABLE_*` environment overrides applied.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hourly: std::env::var("TABLE_HOURLY").unwrap_or(defaults.hourly),
            hourly_per_station: std::env::var("TABLE_HOURLY_PER_STATION")
                .unwrap_or(defaults.hourly_per_station),
            daily: std::env::var("TABLE_DAILY").unwrap_or(defaults.daily),
            stations: std::env::var("TABLE_STATIONS").unwrap_or(defaults.stations),
        }
    }
}

pub struct DynamoStore {
    client: Client,
    tables: TableNames,
}

impl DynamoStore {
    pub fn new(client: Client, tables: TableNames) -> Self {
        Self { client, tables }
    }

    /// Builds a store from the ambient AWS credentials chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config), TableNames::from_env())
    }
}

fn store_err(e: impl Display) -> TickerError {
    TickerError::Store(e.to_string())
}

fn day_key(day: DayOfWeek) -> AttributeValue {
    AttributeValue::S(day.to_string())
}

fn doc_of(item: &HashMap<String, AttributeValue>) -> Result<&str, TickerError> {
    item.get(DOC_ATTR)
        .and_then(|v| v.as_s().ok())
        .map(String::as_str)
        .ok_or_else(|| TickerError::Store(format!("record is missing the {DOC_ATTR} attribute")))
}

fn put_request(item: HashMap<String, AttributeValue>) -> Result<WriteRequest, TickerError> {
    let put = PutRequest::builder()
        .set_item(Some(item))
        .build()
        .map_err(store_err)?;
    Ok(WriteRequest::builder().put_request(put).build())
}

impl DynamoStore {
    fn record_to_write(&self, record: &StoreRecord) -> Result<(String, WriteRequest), TickerError> {
        match record {
            StoreRecord::Day(day) => {
                let mut item = HashMap::new();
                item.insert("day_of_week".to_string(), day_key(day.day_of_week));
                item.insert(
                    "daily_ridership".to_string(),
                    AttributeValue::N(day.daily_ridership.to_string()),
                );
                item.insert(
                    DOC_ATTR.to_string(),
                    AttributeValue::S(serde_json::to_string(day)?),
                );
                Ok((self.tables.hourly.clone(), put_request(item)?))
            }
            StoreRecord::StationDay(sd) => {
                let mut item = HashMap::new();
                item.insert("complex_id".to_string(), AttributeValue::S(sd.key()));
                item.insert("station_id".to_string(), AttributeValue::S(sd.station_id.clone()));
                item.insert("day_of_week".to_string(), day_key(sd.day_of_week));
                item.insert(
                    DOC_ATTR.to_string(),
                    AttributeValue::S(serde_json::to_string(sd)?),
                );
                Ok((self.tables.hourly_per_station.clone(), put_request(item)?))
            }
        }
    }
}

#[async_trait]
impl RidershipStore for DynamoStore {
    async fn day_aggregate(&self, day: DayOfWeek) -> Result<Option<DayAggregate>, TickerError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.tables.hourly)
            .key("day_of_week", day_key(day))
            .send()
            .await
            .map_err(store_err)?;

        match out.item() {
            Some(item) => Ok(Some(serde_json::from_str(doc_of(item)?)?)),
            None => Ok(None),
        }
    }

    async fn daily_total(&self, day: DayOfWeek) -> Result<Option<DailyTotal>, TickerError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.tables.daily)
            .key("day_of_week", day_key(day))
            .send()
            .await
            .map_err(store_err)?;

        let Some(item) = out.item() else {
            return Ok(None);
        };
        let ridership = item
            .get("subway_ridership")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| {
                TickerError::Store("daily record has no numeric subway_ridership".into())
            })?;
        Ok(Some(DailyTotal {
            day_of_week: day,
            subway_ridership: ridership,
        }))
    }

    async fn station_days(
        &self,
        station_ids: &[String],
        day: DayOfWeek,
    ) -> Result<Vec<StationDay>, TickerError> {
        let mut results = Vec::new();

        for chunk in station_ids.chunks(MAX_BATCH_GET_KEYS) {
            let keys: Vec<HashMap<String, AttributeValue>> = chunk
                .iter()
                .map(|id| {
                    HashMap::from([(
                        "complex_id".to_string(),
                        AttributeValue::S(format!("{id}-{day}")),
                    )])
                })
                .collect();
            let request = KeysAndAttributes::builder()
                .set_keys(Some(keys))
                .build()
                .map_err(store_err)?;

            let out = self
                .client
                .batch_get_item()
                .request_items(&self.tables.hourly_per_station, request)
                .send()
                .await
                .map_err(store_err)?;

            // Throttled leftovers would silently drop stations from the
            // result, so they fail the read the same way unprocessed
            // writes fail `put_batch`.
            if keys_left_unprocessed(out.unprocessed_keys()) {
                return Err(TickerError::Store(
                    "batch get left unprocessed station keys".into(),
                ));
            }

            if let Some(items) = out
                .responses()
                .and_then(|r| r.get(&self.tables.hourly_per_station))
            {
                for item in items {
                    results.push(serde_json::from_str::<StationDay>(doc_of(item)?)?);
                }
            }
        }

        debug!(
            requested = station_ids.len(),
            found = results.len(),
            day = %day,
            "Batch get of station records complete"
        );
        Ok(results)
    }

    async fn list_stations(&self) -> Result<Vec<Station>, TickerError> {
        let mut stations = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let out = self
                .client
                .scan()
                .table_name(&self.tables.stations)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(store_err)?;

            for item in out.items() {
                match parse_station(item) {
                    Some(station) => stations.push(station),
                    None => warn!(?item, "Skipping station directory item missing id or name"),
                }
            }

            match out.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(stations)
    }

    async fn put_batch(&self, records: &[StoreRecord]) -> Result<(), TickerError> {
        // Callers choose their own batch size; DynamoDB's 25-item ceiling
        // is enforced here regardless.
        for chunk in records.chunks(MAX_BATCH_WRITE_ITEMS) {
            let mut by_table: HashMap<String, Vec<WriteRequest>> = HashMap::new();
            for record in chunk {
                let (table, write) = self.record_to_write(record)?;
                by_table.entry(table).or_default().push(write);
            }

            let mut call = self.client.batch_write_item();
            for (table, writes) in by_table {
                call = call.request_items(table, writes);
            }
            let out = call.send().await.map_err(store_err)?;

            // Unprocessed leftovers count as a failure so the writer's
            // retry policy re-puts the whole (idempotent) chunk.
            if out
                .unprocessed_items()
                .is_some_and(|u| u.values().any(|v| !v.is_empty()))
            {
                return Err(TickerError::Store(
                    "batch write left unprocessed items".into(),
                ));
            }
        }
        Ok(())
    }
}

/// True when a batch get came back with any keys still unprocessed.
fn keys_left_unprocessed(unprocessed: Option<&HashMap<String, KeysAndAttributes>>) -> bool {
    unprocessed.is_some_and(|u| u.values().any(|k| !k.keys().is_empty()))
}

/// Parses a station directory item. The directory table is written by an
/// external sync that has stored names either flat or nested under a `data`
/// list across versions; both shapes are accepted.
fn parse_station(item: &HashMap<String, AttributeValue>) -> Option<Station> {
    let id = attr_s(item, "id").or_else(|| attr_s(item, "complex_id"))?;

    let nested = item
        .get("data")
        .and_then(|v| v.as_l().ok())
        .and_then(|l| l.first())
        .and_then(|v| v.as_m().ok());

    let name = attr_s(item, "name")
        .or_else(|| nested.and_then(|m| attr_s(m, "name")))?;
    let borough = attr_s(item, "borough").or_else(|| nested.and_then(|m| attr_s(m, "borough")));
    let latitude = attr_f(item, "latitude").or_else(|| nested.and_then(|m| attr_f(m, "latitude")));
    let longitude =
        attr_f(item, "longitude").or_else(|| nested.and_then(|m| attr_f(m, "longitude")));

    let routes = item
        .get("routes")
        .and_then(|v| v.as_l().ok())
        .map(|l| l.iter().filter_map(|v| v.as_s().ok().cloned()).collect())
        .or_else(|| {
            attr_s(item, "daytime_routes")
                .map(|s| s.split_whitespace().map(str::to_string).collect())
        })
        .unwrap_or_default();

    Some(Station {
        id,
        name,
        borough,
        latitude,
        longitude,
        routes,
    })
}

fn attr_s(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

fn attr_f(item: &HashMap<String, AttributeValue>, key: &str) -> Option<f64> {
    match item.get(key)? {
        AttributeValue::N(n) => n.parse().ok(),
        AttributeValue::S(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_station_flat_shape() {
        let item = HashMap::from([
            ("complex_id".to_string(), AttributeValue::S("611".into())),
            ("name".to_string(), AttributeValue::S("Times Sq-42 St".into())),
            ("borough".to_string(), AttributeValue::S("M".into())),
            ("latitude".to_string(), AttributeValue::S("40.754672".into())),
            (
                "routes".to_string(),
                AttributeValue::L(vec![
                    AttributeValue::S("N".into()),
                    AttributeValue::S("Q".into()),
                ]),
            ),
        ]);
        let station = parse_station(&item).unwrap();
        assert_eq!(station.id, "611");
        assert_eq!(station.name, "Times Sq-42 St");
        assert_eq!(station.borough.as_deref(), Some("M"));
        assert_eq!(station.latitude, Some(40.754672));
        assert_eq!(station.routes, vec!["N", "Q"]);
    }

    #[test]
    fn parse_station_nested_shape() {
        let nested = HashMap::from([
            ("name".to_string(), AttributeValue::S("Canal St".into())),
            ("borough".to_string(), AttributeValue::S("M".into())),
        ]);
        let item = HashMap::from([
            ("id".to_string(), AttributeValue::S("169".into())),
            (
                "data".to_string(),
                AttributeValue::L(vec![AttributeValue::M(nested)]),
            ),
        ]);
        let station = parse_station(&item).unwrap();
        assert_eq!(station.id, "169");
        assert_eq!(station.name, "Canal St");
        assert!(station.routes.is_empty());
    }

    #[test]
    fn parse_station_without_name_is_skipped() {
        let item = HashMap::from([("id".to_string(), AttributeValue::S("169".into()))]);
        assert!(parse_station(&item).is_none());
    }

    #[test]
    fn unprocessed_batch_get_keys_are_detected() {
        assert!(!keys_left_unprocessed(None));

        let empty = HashMap::new();
        assert!(!keys_left_unprocessed(Some(&empty)));

        let leftover = KeysAndAttributes::builder()
            .keys(HashMap::from([(
                "complex_id".to_string(),
                AttributeValue::S("611-Wed".into()),
            )]))
            .build()
            .unwrap();
        let unprocessed = HashMap::from([("table".to_string(), leftover)]);
        assert!(keys_left_unprocessed(Some(&unprocessed)));
    }
}
