//! In-memory store implementations, the default backing when the service
//! runs without a database.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use parking_lot::RwLock;

use super::{ConsumptionStore, ForecastStore};
use crate::domain::{ConsumptionRecord, ForecastPoint, ModelName};

#[derive(Default)]
pub struct MemoryConsumptionStore {
    records: RwLock<BTreeMap<DateTime<FixedOffset>, f64>>,
}

#[async_trait]
impl ConsumptionStore for MemoryConsumptionStore {
    async fn upsert(&self, datetime: DateTime<FixedOffset>, consumption_mwh: f64) -> Result<()> {
        self.records.write().insert(datetime, consumption_mwh);
        Ok(())
    }

    async fn get_exact(&self, datetime: DateTime<FixedOffset>) -> Result<Option<f64>> {
        Ok(self.records.read().get(&datetime).copied())
    }

    async fn latest(&self, limit: usize) -> Result<Vec<ConsumptionRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .take(limit)
            .map(|(&datetime, &consumption_mwh)| ConsumptionRecord {
                datetime,
                consumption_mwh,
            })
            .collect())
    }

    async fn by_range(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<ConsumptionRecord>> {
        Ok(self
            .records
            .read()
            .range(start..=end)
            .map(|(&datetime, &consumption_mwh)| ConsumptionRecord {
                datetime,
                consumption_mwh,
            })
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().len() as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<FixedOffset>) -> Result<u64> {
        let mut records = self.records.write();
        let keep = records.split_off(&cutoff);
        let removed = records.len() as u64;
        *records = keep;
        Ok(removed)
    }
}

#[derive(Default)]
pub struct MemoryForecastStore {
    points: RwLock<BTreeMap<(DateTime<FixedOffset>, ModelName), ForecastPoint>>,
}

#[async_trait]
impl ForecastStore for MemoryForecastStore {
    async fn upsert(&self, point: &ForecastPoint) -> Result<()> {
        self.points
            .write()
            .insert((point.target_datetime, point.model), point.clone());
        Ok(())
    }

    async fn by_range(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        model: Option<ModelName>,
    ) -> Result<Vec<ForecastPoint>> {
        Ok(self
            .points
            .read()
            .values()
            .filter(|p| p.target_datetime >= start && p.target_datetime <= end)
            .filter(|p| model.map_or(true, |m| p.model == m))
            .cloned()
            .collect())
    }

    async fn upcoming(
        &self,
        now: DateTime<FixedOffset>,
        hours: u32,
        model: Option<ModelName>,
    ) -> Result<Vec<ForecastPoint>> {
        let end = now + Duration::hours(i64::from(hours));
        Ok(self
            .points
            .read()
            .values()
            .filter(|p| p.target_datetime >= now && p.target_datetime < end)
            .filter(|p| model.map_or(true, |m| p.model == m))
            .cloned()
            .collect())
    }

    async fn get_one(
        &self,
        target_datetime: DateTime<FixedOffset>,
        model: ModelName,
    ) -> Result<Option<ForecastPoint>> {
        Ok(self.points.read().get(&(target_datetime, model)).cloned())
    }

    async fn delete_older_than(&self, cutoff: DateTime<FixedOffset>) -> Result<u64> {
        let mut points = self.points.write();
        let before = points.len();
        points.retain(|(datetime, _), _| *datetime >= cutoff);
        Ok((before - points.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherSnapshot;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        s.parse().unwrap()
    }

    fn point(at: &str, model: ModelName, value: f64) -> ForecastPoint {
        ForecastPoint {
            target_datetime: ts(at),
            model,
            predicted_mwh: value,
            weather: WeatherSnapshot {
                temperature_2m: 10.0,
                apparent_temperature: 9.0,
                relative_humidity_2m: 70.0,
                precipitation: 0.0,
                wind_speed_10m: 2.0,
                shortwave_radiation: 0.0,
                weather_code: 3,
            },
        }
    }

    #[tokio::test]
    async fn consumption_latest_is_descending() {
        let store = MemoryConsumptionStore::default();
        for (at, value) in [
            ("2025-01-15T10:00:00+03:00", 35100.0),
            ("2025-01-15T12:00:00+03:00", 35300.0),
            ("2025-01-15T11:00:00+03:00", 35200.0),
        ] {
            store.upsert(ts(at), value).await.unwrap();
        }

        let latest = store.latest(2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].consumption_mwh, 35300.0);
        assert_eq!(latest[1].consumption_mwh, 35200.0);
    }

    #[tokio::test]
    async fn consumption_upsert_overwrites_same_hour() {
        let store = MemoryConsumptionStore::default();
        let at = ts("2025-01-15T10:00:00+03:00");
        store.upsert(at, 35000.0).await.unwrap();
        store.upsert(at, 35555.0).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get_exact(at).await.unwrap(), Some(35555.0));
    }

    #[tokio::test]
    async fn forecast_upsert_is_keyed_by_datetime_and_model() {
        let store = MemoryForecastStore::default();
        let at = "2025-01-15T10:00:00+03:00";
        store.upsert(&point(at, ModelName::Catboost, 35000.0)).await.unwrap();
        store.upsert(&point(at, ModelName::Lightgbm, 34000.0)).await.unwrap();
        store.upsert(&point(at, ModelName::Catboost, 36000.0)).await.unwrap();

        let all = store
            .by_range(ts(at), ts(at), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let cat = store.get_one(ts(at), ModelName::Catboost).await.unwrap().unwrap();
        assert_eq!(cat.predicted_mwh, 36000.0);
    }

    #[tokio::test]
    async fn upcoming_is_bounded_and_filtered_by_model() {
        let store = MemoryForecastStore::default();
        store
            .upsert(&point("2025-01-15T10:00:00+03:00", ModelName::Catboost, 1.0))
            .await
            .unwrap();
        store
            .upsert(&point("2025-01-15T12:00:00+03:00", ModelName::Catboost, 2.0))
            .await
            .unwrap();
        store
            .upsert(&point("2025-01-15T12:00:00+03:00", ModelName::Xgboost, 3.0))
            .await
            .unwrap();

        let upcoming = store
            .upcoming(ts("2025-01-15T11:00:00+03:00"), 2, Some(ModelName::Catboost))
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].predicted_mwh, 2.0);
    }

    #[tokio::test]
    async fn delete_older_than_drops_only_past_rows() {
        let store = MemoryConsumptionStore::default();
        store.upsert(ts("2025-01-10T00:00:00+03:00"), 1.0).await.unwrap();
        store.upsert(ts("2025-01-20T00:00:00+03:00"), 2.0).await.unwrap();

        let removed = store
            .delete_older_than(ts("2025-01-15T00:00:00+03:00"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
