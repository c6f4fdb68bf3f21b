//! Key-value store contracts. All mutation is whole-record overwrite by
//! key, which makes every sync run idempotent and safe to repeat.

mod dynamo;
mod memory;

pub use dynamo::{DynamoStore, TableNames};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::aggregator::types::{DailyTotal, DayAggregate, DayOfWeek, Station, StationDay};
use crate::error::TickerError;

/// A record the sync job persists. Daily totals and the station directory
/// are written by separate external jobs and only read here.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRecord {
    Day(DayAggregate),
    StationDay(StationDay),
}

impl StoreRecord {
    pub fn key(&self) -> String {
        match self {
            StoreRecord::Day(day) => day.day_of_week.to_string(),
            StoreRecord::StationDay(sd) => sd.key(),
        }
    }
}

/// Store operations the engine depends on: point gets for the day records,
/// a batch get for station/day records, a scan of the station directory,
/// and the bounded batch put used by the writer.
#[async_trait]
pub trait RidershipStore: Send + Sync {
    async fn day_aggregate(&self, day: DayOfWeek) -> Result<Option<DayAggregate>, TickerError>;

    async fn daily_total(&self, day: DayOfWeek) -> Result<Option<DailyTotal>, TickerError>;

    /// Fetches the records for `day` of every listed station. Stations with
    /// no record are simply absent from the result, never zero-filled.
    async fn station_days(
        &self,
        station_ids: &[String],
        day: DayOfWeek,
    ) -> Result<Vec<StationDay>, TickerError>;

    async fn list_stations(&self) -> Result<Vec<Station>, TickerError>;

    /// Overwrites every record in the batch by key.
    async fn put_batch(&self, records: &[StoreRecord]) -> Result<(), TickerError>;
}
