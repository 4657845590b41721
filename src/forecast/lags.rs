use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset};

use crate::domain::LagSet;
use crate::repo::ConsumptionStore;

/// Hourly national baseline (MWh) used when no consumption history exists
/// at all. A degeneracy guard, not a statistically derived figure.
pub const DEFAULT_BASELINE_MWH: f64 = 35_000.0;

/// Resolves consumption lags for a target hour from historical actuals.
///
/// Missing data is never an error here: misses forward-fill from the single
/// most recent known record, and an empty dataset falls back to
/// [`DEFAULT_BASELINE_MWH`]. Only infrastructure failures from the store
/// propagate.
pub struct LagResolver {
    store: Arc<dyn ConsumptionStore>,
}

impl LagResolver {
    pub fn new(store: Arc<dyn ConsumptionStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, target: DateTime<FixedOffset>) -> Result<LagSet> {
        let (hour, day, week) = futures::try_join!(
            self.store.get_exact(target - Duration::hours(1)),
            self.store.get_exact(target - Duration::hours(24)),
            self.store.get_exact(target - Duration::hours(168)),
        )?;

        // One forward-fill value shared by every miss in this call; the
        // "latest known" record is fetched at most once.
        let fallback = if hour.is_none() || day.is_none() || week.is_none() {
            self.store
                .latest(1)
                .await?
                .first()
                .map(|r| r.consumption_mwh)
        } else {
            None
        };

        Ok(LagSet {
            lag_1h: hour.or(fallback).unwrap_or(DEFAULT_BASELINE_MWH),
            lag_24h: day.or(fallback).unwrap_or(DEFAULT_BASELINE_MWH),
            lag_168h: week.or(fallback).unwrap_or(DEFAULT_BASELINE_MWH),
        })
    }
}
