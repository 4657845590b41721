use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::config::Config;
use crate::domain::{ConsumptionRecord, ForecastPoint, ModelName};

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

pub use memory::{MemoryConsumptionStore, MemoryForecastStore};

/// Historical actual-consumption data, written by ingestion and read by the
/// lag resolver.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsumptionStore: Send + Sync {
    async fn upsert(&self, datetime: DateTime<FixedOffset>, consumption_mwh: f64) -> Result<()>;

    async fn get_exact(&self, datetime: DateTime<FixedOffset>) -> Result<Option<f64>>;

    /// Most recent records first.
    async fn latest(&self, limit: usize) -> Result<Vec<ConsumptionRecord>>;

    async fn by_range(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<ConsumptionRecord>>;

    async fn count(&self) -> Result<u64>;

    /// Retention helper; nothing in the service schedules this.
    async fn delete_older_than(&self, cutoff: DateTime<FixedOffset>) -> Result<u64>;
}

/// Generated forecasts, keyed by (target_datetime, model). Upserts are
/// idempotent per key so re-running a horizon never creates duplicates.
#[async_trait]
pub trait ForecastStore: Send + Sync {
    async fn upsert(&self, point: &ForecastPoint) -> Result<()>;

    async fn by_range(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        model: Option<ModelName>,
    ) -> Result<Vec<ForecastPoint>>;

    /// Forecasts covering `[now, now + hours)`, ascending.
    async fn upcoming(
        &self,
        now: DateTime<FixedOffset>,
        hours: u32,
        model: Option<ModelName>,
    ) -> Result<Vec<ForecastPoint>>;

    async fn get_one(
        &self,
        target_datetime: DateTime<FixedOffset>,
        model: ModelName,
    ) -> Result<Option<ForecastPoint>>;

    /// Retention helper; nothing in the service schedules this.
    async fn delete_older_than(&self, cutoff: DateTime<FixedOffset>) -> Result<u64>;
}

pub struct Stores {
    pub consumption: Arc<dyn ConsumptionStore>,
    pub forecasts: Arc<dyn ForecastStore>,
}

impl Stores {
    pub async fn new(cfg: &Config) -> Result<Self> {
        #[cfg(feature = "db")]
        {
            let repo = pg::PgRepo::connect(&cfg.db.url).await?;
            return Ok(Self {
                consumption: Arc::new(repo.consumption()),
                forecasts: Arc::new(repo.forecasts()),
            });
        }

        #[cfg(not(feature = "db"))]
        {
            let _ = cfg;
            return Ok(Self {
                consumption: Arc::new(MemoryConsumptionStore::default()),
                forecasts: Arc::new(MemoryForecastStore::default()),
            });
        }
    }
}
