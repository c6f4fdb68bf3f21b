use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::aggregator::types::{DailyTotal, DayAggregate, DayOfWeek, Station, StationDay};
use crate::error::TickerError;

use super::{RidershipStore, StoreRecord};

/// In-process store used by tests and local dry runs. Same overwrite-by-key
/// semantics as the DynamoDB implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    days: HashMap<DayOfWeek, DayAggregate>,
    station_days: HashMap<String, StationDay>,
    daily_totals: HashMap<DayOfWeek, DailyTotal>,
    stations: Vec<Station>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an authoritative daily total, standing in for the external
    /// daily sync job.
    pub async fn seed_daily_total(&self, total: DailyTotal) {
        self.inner
            .write()
            .await
            .daily_totals
            .insert(total.day_of_week, total);
    }

    /// Seeds the station directory, standing in for the external station
    /// sync job.
    pub async fn seed_stations(&self, stations: Vec<Station>) {
        self.inner.write().await.stations = stations;
    }

    pub async fn record_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.days.len() + inner.station_days.len()
    }
}

#[async_trait]
impl RidershipStore for MemoryStore {
    async fn day_aggregate(&self, day: DayOfWeek) -> Result<Option<DayAggregate>, TickerError> {
        Ok(self.inner.read().await.days.get(&day).cloned())
    }

    async fn daily_total(&self, day: DayOfWeek) -> Result<Option<DailyTotal>, TickerError> {
        Ok(self.inner.read().await.daily_totals.get(&day).cloned())
    }

    async fn station_days(
        &self,
        station_ids: &[String],
        day: DayOfWeek,
    ) -> Result<Vec<StationDay>, TickerError> {
        let inner = self.inner.read().await;
        Ok(station_ids
            .iter()
            .filter_map(|id| inner.station_days.get(&format!("{id}-{day}")).cloned())
            .collect())
    }

    async fn list_stations(&self) -> Result<Vec<Station>, TickerError> {
        Ok(self.inner.read().await.stations.clone())
    }

    async fn put_batch(&self, records: &[StoreRecord]) -> Result<(), TickerError> {
        let mut inner = self.inner.write().await;
        for record in records {
            match record {
                StoreRecord::Day(day) => {
                    inner.days.insert(day.day_of_week, day.clone());
                }
                StoreRecord::StationDay(sd) => {
                    inner.station_days.insert(sd.key(), sd.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::types::HOURS_PER_DAY;

    fn day_record(day: DayOfWeek, total_per_hour: u64) -> DayAggregate {
        DayAggregate::from_hour_counts(day, &[total_per_hour; HOURS_PER_DAY])
    }

    #[tokio::test]
    async fn put_batch_overwrites_by_key() {
        let store = MemoryStore::new();
        store
            .put_batch(&[StoreRecord::Day(day_record(DayOfWeek::Mon, 1))])
            .await
            .unwrap();
        store
            .put_batch(&[StoreRecord::Day(day_record(DayOfWeek::Mon, 2))])
            .await
            .unwrap();

        let fetched = store.day_aggregate(DayOfWeek::Mon).await.unwrap().unwrap();
        assert_eq!(fetched.daily_ridership, 2 * HOURS_PER_DAY as u64);
        assert_eq!(store.record_count().await, 1);
    }

    #[tokio::test]
    async fn station_days_skips_missing_stations() {
        let store = MemoryStore::new();
        let sd = StationDay::from_hour_counts("611".into(), DayOfWeek::Mon, &[1; HOURS_PER_DAY]);
        store
            .put_batch(&[StoreRecord::StationDay(sd)])
            .await
            .unwrap();

        let got = store
            .station_days(&["611".into(), "167".into()], DayOfWeek::Mon)
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].station_id, "611");

        // Same station, different day: also absent
        let got = store
            .station_days(&["611".into()], DayOfWeek::Tue)
            .await
            .unwrap();
        assert!(got.is_empty());
    }
}
