//! Upstream consumption ingestion.

pub mod epias;

pub use epias::{EpiasClient, EpiasCredentials, TicketCache};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use tracing::info;

use crate::domain::{ConsumptionRecord, ConsumptionStats};
use crate::repo::ConsumptionStore;

/// Source of hourly actual-consumption records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsumptionSource: Send + Sync {
    async fn fetch_range(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<ConsumptionRecord>>;
}

/// Pulls recent actuals from the source and upserts them hour by hour.
///
/// Upstream publishes with roughly a two-hour delay, so every sync re-reads
/// a trailing window wide enough to catch records that were still missing
/// on the previous pass.
pub struct ConsumptionSyncer {
    source: Arc<dyn ConsumptionSource>,
    store: Arc<dyn ConsumptionStore>,
    window_hours: u32,
}

impl ConsumptionSyncer {
    pub fn new(
        source: Arc<dyn ConsumptionSource>,
        store: Arc<dyn ConsumptionStore>,
        window_hours: u32,
    ) -> Self {
        Self {
            source,
            store,
            window_hours,
        }
    }

    pub async fn sync_recent(&self, now: DateTime<FixedOffset>) -> Result<usize> {
        let start = now - Duration::hours(i64::from(self.window_hours));
        let records = self.source.fetch_range(start, now).await?;

        let mut synced = 0;
        for record in records {
            self.store
                .upsert(record.datetime, record.consumption_mwh)
                .await?;
            synced += 1;
        }

        info!(synced, window_hours = self.window_hours, "consumption sync complete");
        Ok(synced)
    }

    pub async fn stats(&self) -> Result<ConsumptionStats> {
        let latest = self.store.latest(1).await?;
        let total_records = self.store.count().await?;

        Ok(ConsumptionStats {
            last_synced_at: latest.first().map(|r| r.datetime),
            total_records,
            latest_mwh: latest.first().map(|r| r.consumption_mwh),
        })
    }
}
